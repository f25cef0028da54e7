//! Product editor - create/update/delete orchestration
//!
//! One editor holds one edit session: the form fields and the staged images.
//! A submit validates locally, uploads new images one by one in staged order,
//! then sends the full product record. Any failure leaves the form and the
//! staged images untouched so the user can retry.

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use shared::models::{Product, ProductPayload};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::audit_log;
use crate::catalog::CatalogStore;
use crate::error::{
    BusinessError, ClientError, DeleteError, FieldError, StagingError, SubmitError, UploadError,
    ValidationError,
};
use crate::remote::RemoteClient;
use crate::staging::{ImageStagingBuffer, RawFile, StagedEntry, UploadPlan, decode_files};

// =============================================================================
// Form input
// =============================================================================

/// Raw form fields as typed by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFormInput {
    /// `Some` when editing an existing product
    pub id: Option<String>,
    pub name: String,
    pub category: String,
    /// Unparsed so validation can report bad input
    pub price: String,
    /// Optional external listing, blank for none
    pub shopee_url: String,
}

impl ProductFormInput {
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: (!product.is_new()).then(|| product.id.clone()),
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price.to_string(),
            shopee_url: product.shopee_url.clone().unwrap_or_default(),
        }
    }

    /// Check every field and build the record to send (without images)
    pub fn validate(&self) -> Result<ProductPayload, ValidationError> {
        let mut fields = Vec::new();

        let name = self.name.trim();
        if name.is_empty() {
            fields.push(FieldError::new("name", "required"));
        }
        let category = self.category.trim();
        if category.is_empty() {
            fields.push(FieldError::new("category", "required"));
        }

        let price = match parse_price(&self.price) {
            Some(price) if price.is_sign_negative() && !price.is_zero() => {
                fields.push(FieldError::new("price", "must not be negative"));
                Decimal::ZERO
            }
            Some(price) => price,
            None => {
                fields.push(FieldError::new("price", "must be a number"));
                Decimal::ZERO
            }
        };

        let shopee_url = self.shopee_url.trim();
        if !shopee_url.is_empty() && !is_http_url(shopee_url) {
            fields.push(FieldError::new("shopee_url", "must be an http(s) URL"));
        }

        if !fields.is_empty() {
            return Err(ValidationError { fields });
        }

        Ok(ProductPayload {
            id: self
                .id
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            name: name.to_string(),
            category: category.to_string(),
            price,
            shopee_url: shopee_url.to_string(),
            image_urls: Vec::new(),
        })
    }
}

/// Accepts thousands separators ("1,299.50")
fn parse_price(input: &str) -> Option<Decimal> {
    let cleaned: String = input.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

fn is_http_url(input: &str) -> bool {
    reqwest::Url::parse(input)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

// =============================================================================
// Confirmation
// =============================================================================

/// Yes/no decision point in front of destructive actions
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Plain closures work as confirmers
#[async_trait]
impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    async fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

// =============================================================================
// Editor
// =============================================================================

#[derive(Debug, Clone)]
struct EditSession {
    form: ProductFormInput,
    images: ImageStagingBuffer,
    /// Bumped on every change to the form or the images
    revision: u64,
}

impl EditSession {
    fn reset(&mut self) {
        self.form = ProductFormInput::default();
        self.images.clear();
        self.revision += 1;
    }
}

/// Clears the in-flight flag however submit returns
struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Create/update/delete orchestrator for one edit form
pub struct ProductEditor {
    remote: RemoteClient,
    session: Mutex<EditSession>,
    submitting: AtomicBool,
}

impl std::fmt::Debug for ProductEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.session.lock();
        f.debug_struct("ProductEditor")
            .field("editing", &session.form.id)
            .field("images", &session.images.len())
            .field("submitting", &self.is_submitting())
            .finish()
    }
}

impl ProductEditor {
    pub fn new(remote: RemoteClient, max_image_bytes: usize) -> Self {
        Self {
            remote,
            session: Mutex::new(EditSession {
                form: ProductFormInput::default(),
                images: ImageStagingBuffer::new(max_image_bytes),
                revision: 0,
            }),
            submitting: AtomicBool::new(false),
        }
    }

    // ========== Edit session ==========

    /// Start a blank create form
    pub fn begin_create(&self) {
        self.clear();
    }

    /// Load an existing product into the form and its images into the buffer
    pub fn begin_edit(&self, product: &Product) {
        let mut session = self.session.lock();
        session.form = ProductFormInput::from_product(product);
        session.images.load_existing(product.image_urls.iter().cloned());
        session.revision += 1;
    }

    pub fn form(&self) -> ProductFormInput {
        self.session.lock().form.clone()
    }

    pub fn set_form(&self, form: ProductFormInput) {
        let mut session = self.session.lock();
        session.form = form;
        session.revision += 1;
    }

    /// Run `f` against the staged images (reorder, remove, inspect)
    pub fn with_images<R>(&self, f: impl FnOnce(&mut ImageStagingBuffer) -> R) -> R {
        let mut session = self.session.lock();
        session.revision += 1;
        f(&mut session.images)
    }

    pub fn images(&self) -> Vec<StagedEntry> {
        self.session.lock().images.entries().to_vec()
    }

    pub fn upload_plan(&self) -> UploadPlan {
        self.session.lock().images.to_upload_plan()
    }

    /// Decode files outside the lock, then append them in original order
    pub async fn add_files(&self, files: Vec<RawFile>) -> Vec<StagingError> {
        let max_bytes = self.session.lock().images.max_image_bytes();
        let decoded = decode_files(files, max_bytes).await;
        let mut session = self.session.lock();
        session.revision += 1;
        session.images.append_decoded(decoded)
    }

    /// Reset form and staged images
    pub fn clear(&self) {
        self.session.lock().reset();
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    // ========== Submit ==========

    /// Validate, upload pending images, then create or update the product.
    ///
    /// On success the catalog is reloaded and the edit session cleared,
    /// unless the form or images changed while the save was in flight.
    pub async fn submit(&self, catalog: &CatalogStore) -> Result<Product, SubmitError> {
        if self
            .submitting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SubmitError::InProgress);
        }
        let _guard = SubmitGuard(&self.submitting);

        let (form, plan, revision) = {
            let session = self.session.lock();
            (
                session.form.clone(),
                session.images.to_upload_plan(),
                session.revision,
            )
        };
        let mut payload = form.validate()?;

        let uploaded = self.upload_pending(&plan).await?;
        payload.image_urls = plan.assemble(&uploaded).ok_or_else(|| {
            ClientError::InvalidResponse("upload count does not match staged images".into())
        })?;

        let is_update = payload.is_update();
        let resp = if is_update {
            self.remote.update_product(&payload).await?
        } else {
            self.remote.add_product(&payload).await?
        };
        if resp.reauth {
            return Err(SubmitError::ReauthRequired);
        }
        if !resp.success {
            tracing::info!(product = %payload.name, "Product save rejected");
            return Err(BusinessError::from_response(&resp, "Failed to save product").into());
        }

        let id = if is_update {
            payload.id.clone()
        } else {
            resp.field("id").map(value_to_id).unwrap_or_default()
        };
        let actor = self.actor();
        let resource = format!("product:{}", id);
        let action = if is_update { "update" } else { "create" };
        audit_log!(actor.as_str(), action, resource.as_str(), payload.name.as_str());
        let product = payload.into_product(id);

        {
            let mut session = self.session.lock();
            if session.revision == revision {
                session.reset();
            } else {
                tracing::debug!("Edit session changed during submit, keeping it");
            }
        }
        if let Err(e) = catalog.load_all(&self.remote).await {
            tracing::warn!("Product saved but catalog reload failed: {}", e);
        }
        Ok(product)
    }

    /// Upload new images sequentially; the first failure aborts the rest
    async fn upload_pending(&self, plan: &UploadPlan) -> Result<Vec<String>, SubmitError> {
        let total = plan.pending_uploads.len();
        let mut urls = Vec::with_capacity(total);

        for (index, image) in plan.pending_uploads.iter().enumerate() {
            let Some(request) = image.upload_request() else {
                continue;
            };
            let position = index + 1;
            let fail = |reason: String| UploadError {
                position,
                file_name: request.file_name.clone(),
                reason,
            };

            tracing::info!(file = %request.file_name, position, total, "Uploading image");
            let resp = self
                .remote
                .upload_image(&request)
                .await
                .map_err(|e| fail(e.to_string()))?;
            if resp.reauth {
                return Err(SubmitError::ReauthRequired);
            }
            if !resp.success {
                return Err(fail(resp.message_or("Upload failed")).into());
            }
            let url = resp
                .url
                .clone()
                .or_else(|| resp.field("url").and_then(|v| v.as_str()).map(String::from))
                .filter(|u| !u.trim().is_empty())
                .ok_or_else(|| fail("response has no image URL".into()))?;
            urls.push(url);
        }
        Ok(urls)
    }

    // ========== Delete ==========

    /// Delete a product after the user confirms
    pub async fn delete(
        &self,
        id: &str,
        confirmer: &dyn Confirm,
        catalog: &CatalogStore,
    ) -> Result<(), DeleteError> {
        let label = catalog
            .find(id)
            .map(|p| p.name)
            .unwrap_or_else(|| id.to_string());
        if !confirmer
            .confirm(&format!("Delete \"{}\"? This cannot be undone.", label))
            .await
        {
            tracing::debug!(product_id = %id, "Delete cancelled");
            return Err(DeleteError::Cancelled);
        }

        let resp = self.remote.delete_product(id).await?;
        if resp.reauth {
            return Err(DeleteError::ReauthRequired);
        }
        if !resp.success {
            return Err(BusinessError::from_response(&resp, "Failed to delete product").into());
        }

        let actor = self.actor();
        let resource = format!("product:{}", id);
        audit_log!(actor.as_str(), "delete", resource.as_str(), label.as_str());
        if let Err(e) = catalog.load_all(&self.remote).await {
            tracing::warn!("Product deleted but catalog reload failed: {}", e);
        }
        Ok(())
    }

    fn actor(&self) -> String {
        self.remote
            .session()
            .user()
            .map(|u| u.username)
            .unwrap_or_else(|| "anonymous".to_string())
    }
}

/// Backend ids may arrive as text or numbers
fn value_to_id(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
