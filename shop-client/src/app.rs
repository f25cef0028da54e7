//! Application context
//!
//! Wires one instance of every store together. Nothing here is global: two
//! `ShopApp`s built from different configs share no state.

use shared::UserInfo;
use shared::models::Product;
use std::sync::Arc;

use crate::catalog::CatalogStore;
use crate::config::ClientConfig;
use crate::debounce::Debouncer;
use crate::editor::ProductEditor;
use crate::error::{AuthError, CatalogError, ClientResult};
use crate::remote::{HttpTransport, RemoteClient, Transport};
use crate::session::{SessionStatus, SessionStore};

/// Everything a View needs to drive the storefront
#[derive(Debug, Clone)]
pub struct ShopApp {
    config: ClientConfig,
    session: SessionStore,
    remote: RemoteClient,
    catalog: CatalogStore,
    editor: Arc<ProductEditor>,
    search: Debouncer,
}

impl ShopApp {
    /// HTTP-backed app; a persisted session is restored if present
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let transport = HttpTransport::from_config(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// App over any transport (tests, alternative backends)
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let session = SessionStore::from_config(&config);
        if session.restore() == SessionStatus::Authenticated {
            tracing::info!("Resuming previous admin session");
        }
        let remote = RemoteClient::new(transport, session.clone());
        let catalog = CatalogStore::new(config.category_match);
        let editor = Arc::new(ProductEditor::new(remote.clone(), config.max_image_bytes));
        let search = Debouncer::new(config.search_debounce);

        tracing::debug!(endpoint = %config.endpoint_url, "Shop app ready");
        Self {
            config,
            session,
            remote,
            catalog,
            editor,
            search,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn remote(&self) -> &RemoteClient {
        &self.remote
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub fn editor(&self) -> &ProductEditor {
        &self.editor
    }

    /// Initial page load: products and categories fetched concurrently
    pub async fn start(&self) -> Result<(), CatalogError> {
        let (products, categories) = self.catalog.load_initial(&self.remote).await;
        if let Err(e) = &categories {
            // product categories still work as a fallback
            tracing::warn!("Category list unavailable: {}", e);
        }
        products.map(|_| ())
    }

    /// Debounced search; `None` when a newer keystroke superseded this one
    pub async fn search(&self, term: &str, category: &str) -> Option<Vec<Product>> {
        self.catalog
            .filter_debounced(&self.search, term, category)
            .await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserInfo, AuthError> {
        self.session.login(&self.remote, username, password).await
    }

    pub fn logout(&self) {
        self.editor.clear();
        self.session.logout();
    }
}
