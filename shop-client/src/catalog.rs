//! Catalog Store - product snapshot and the filtered view derived from it
//!
//! The backend is the only source of truth. The store keeps the last
//! successfully loaded snapshot; a failed load never touches it.

use parking_lot::RwLock;
use shared::models::Product;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::CategoryMatch;
use crate::debounce::Debouncer;
use crate::error::{BusinessError, CatalogError, ClientError};
use crate::remote::RemoteClient;

/// Category selector value meaning "no category filter"
pub const ALL_CATEGORIES: &str = "ทั้งหมด";

/// True for the "no filter" sentinels: `ทั้งหมด`, `All` (any case) or blank
pub fn is_all_categories(category: &str) -> bool {
    let category = category.trim();
    category.is_empty() || category == ALL_CATEGORIES || category.eq_ignore_ascii_case("all")
}

#[derive(Debug, Default)]
struct Snapshot {
    generation: u64,
    products: Vec<Product>,
}

/// In-memory product catalog
#[derive(Clone)]
pub struct CatalogStore {
    /// Products in backend order
    products: Arc<RwLock<Snapshot>>,
    /// Bumped when a load starts; only the newest load may publish
    generation: Arc<AtomicU64>,
    /// Category list from `getCategories`, `None` until loaded
    categories: Arc<RwLock<Option<Vec<String>>>>,
    category_match: CategoryMatch,
}

impl std::fmt::Debug for CatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogStore")
            .field("products_count", &self.products.read().products.len())
            .field("category_match", &self.category_match)
            .finish()
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new(CategoryMatch::default())
    }
}

impl CatalogStore {
    pub fn new(category_match: CategoryMatch) -> Self {
        Self {
            products: Arc::new(RwLock::new(Snapshot::default())),
            generation: Arc::new(AtomicU64::new(0)),
            categories: Arc::new(RwLock::new(None)),
            category_match,
        }
    }

    pub fn category_match(&self) -> CategoryMatch {
        self.category_match
    }

    // ========== Loading ==========

    /// Fetch every product and replace the snapshot.
    ///
    /// When loads overlap, a load started earlier never overwrites the result
    /// of one started later; it returns the newer snapshot instead.
    pub async fn load_all(&self, remote: &RemoteClient) -> Result<Vec<Product>, CatalogError> {
        let generation = self.next_generation();
        let resp = remote.get_products().await?;
        if !resp.success {
            return Err(BusinessError::from_response(&resp, "Failed to load products").into());
        }

        let rows = match resp.data {
            Some(serde_json::Value::Array(rows)) => rows,
            Some(serde_json::Value::Null) | None => Vec::new(),
            Some(_) => {
                return Err(ClientError::InvalidResponse("getProducts data is not a list".into()).into());
            }
        };

        let mut products = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            match serde_json::from_value::<Product>(row) {
                Ok(product) => products.push(product),
                Err(e) => tracing::warn!(row = index, "Skipping unreadable product row: {}", e),
            }
        }

        let mut snapshot = self.products.write();
        if snapshot.generation > generation {
            tracing::debug!(generation, "Discarding stale catalog load");
            return Ok(snapshot.products.clone());
        }
        tracing::info!(count = products.len(), "Catalog loaded");
        *snapshot = Snapshot {
            generation,
            products: products.clone(),
        };
        Ok(products)
    }

    /// Fetch the backend's category list (duplicates removed, order kept)
    pub async fn load_categories(&self, remote: &RemoteClient) -> Result<Vec<String>, CatalogError> {
        let resp = remote.get_categories().await?;
        if !resp.success {
            return Err(BusinessError::from_response(&resp, "Failed to load categories").into());
        }

        let raw = match resp.categories.clone() {
            Some(list) => list,
            None => resp
                .data_as::<Vec<serde_json::Value>>()
                .map_err(ClientError::from)?
                .unwrap_or_default()
                .into_iter()
                .map(|cell| match cell {
                    serde_json::Value::String(text) => text,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect(),
        };
        let categories = dedupe(raw.iter().map(String::as_str));

        tracing::debug!(count = categories.len(), "Categories loaded");
        *self.categories.write() = Some(categories.clone());
        Ok(categories)
    }

    /// Products and categories at once; the two requests run concurrently
    pub async fn load_initial(
        &self,
        remote: &RemoteClient,
    ) -> (
        Result<Vec<Product>, CatalogError>,
        Result<Vec<String>, CatalogError>,
    ) {
        tokio::join!(self.load_all(remote), self.load_categories(remote))
    }

    // ========== Queries ==========

    /// Snapshot of every loaded product
    pub fn products(&self) -> Vec<Product> {
        self.products.read().products.clone()
    }

    pub fn len(&self) -> usize {
        self.products.read().products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.read().products.is_empty()
    }

    /// Replace the snapshot directly (e.g. from a cache the View kept)
    pub fn replace_products(&self, products: Vec<Product>) {
        let generation = self.next_generation();
        *self.products.write() = Snapshot {
            generation,
            products,
        };
    }

    pub fn find(&self, id: &str) -> Option<Product> {
        self.products
            .read()
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    /// Backend category list when loaded, otherwise distinct product categories
    pub fn list_categories(&self) -> Vec<String> {
        if let Some(categories) = self.categories.read().as_ref() {
            return categories.clone();
        }
        let snapshot = self.products.read();
        dedupe(snapshot.products.iter().map(|p| p.category.as_str()))
    }

    /// Products matching both the search term and the category
    pub fn filter(&self, search: &str, category: &str) -> Vec<Product> {
        let needle = search.trim().to_lowercase();
        self.products
            .read()
            .products
            .iter()
            .filter(|p| self.matches_category(p, category) && matches_search(p, &needle))
            .cloned()
            .collect()
    }

    /// Like [`filter`](Self::filter), applied only once the input has gone quiet
    pub async fn filter_debounced(
        &self,
        debouncer: &Debouncer,
        search: &str,
        category: &str,
    ) -> Option<Vec<Product>> {
        let search = debouncer.settle(search.to_string()).await?;
        Some(self.filter(&search, category))
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn matches_category(&self, product: &Product, category: &str) -> bool {
        if is_all_categories(category) {
            return true;
        }
        let category = category.trim();
        match self.category_match {
            CategoryMatch::Exact => product.category == category,
            CategoryMatch::Substring => product
                .category
                .to_lowercase()
                .contains(&category.to_lowercase()),
        }
    }
}

/// `needle` is already lower-cased
fn matches_search(product: &Product, needle: &str) -> bool {
    needle.is_empty()
        || product.name.to_lowercase().contains(needle)
        || product.id.to_lowercase().contains(needle)
        || product.category.to_lowercase().contains(needle)
}

fn dedupe<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}
