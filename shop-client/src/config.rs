//! Client configuration

use std::path::PathBuf;
use std::time::Duration;

use shared::models::DEFAULT_MAX_IMAGE_BYTES;

/// How the category selector matches product categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryMatch {
    /// Exact string equality
    #[default]
    Exact,
    /// Case-insensitive substring
    Substring,
}

impl std::str::FromStr for CategoryMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(CategoryMatch::Exact),
            "substring" => Ok(CategoryMatch::Substring),
            other => Err(format!("unknown category match mode '{other}'")),
        }
    }
}

/// Client configuration for talking to the storefront backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend endpoint URL (single URL for every action)
    pub endpoint_url: String,

    /// Request timeout
    pub timeout: Duration,

    /// Where the session is persisted; `None` keeps it in memory only
    pub session_file: Option<PathBuf>,

    /// Quiet period before a search term is applied
    pub search_debounce: Duration,

    /// Category filter rule
    pub category_match: CategoryMatch,

    /// Largest image accepted into the staging buffer
    pub max_image_bytes: usize,

    /// Default log level when RUST_LOG is unset
    pub log_level: String,
}

impl ClientConfig {
    /// Create a configuration for the given endpoint with defaults
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            timeout: Duration::from_secs(30),
            session_file: Some(default_session_file()),
            search_debounce: Duration::from_millis(300),
            category_match: CategoryMatch::Exact,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            log_level: "info".to_string(),
        }
    }

    /// Read configuration from `SHOP_*` environment variables.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Self {
        let mut config = Self::new(
            std::env::var("SHOP_BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:8080/exec".into()),
        );

        if let Some(secs) = std::env::var("SHOP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        if let Ok(path) = std::env::var("SHOP_SESSION_FILE") {
            config.session_file = (!path.trim().is_empty()).then(|| PathBuf::from(path));
        }
        if let Some(ms) = std::env::var("SHOP_SEARCH_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.search_debounce = Duration::from_millis(ms);
        }
        if let Ok(mode) = std::env::var("SHOP_CATEGORY_MATCH") {
            match mode.parse() {
                Ok(mode) => config.category_match = mode,
                Err(e) => tracing::warn!("Ignoring SHOP_CATEGORY_MATCH: {}", e),
            }
        }
        if let Some(max) = std::env::var("SHOP_MAX_IMAGE_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.max_image_bytes = max;
        }
        if let Ok(level) = std::env::var("SHOP_LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Persist the session at `path`
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    /// Keep the session in memory only
    pub fn without_session_file(mut self) -> Self {
        self.session_file = None;
        self
    }

    pub fn with_search_debounce(mut self, quiet: Duration) -> Self {
        self.search_debounce = quiet;
        self
    }

    pub fn with_category_match(mut self, mode: CategoryMatch) -> Self {
        self.category_match = mode;
        self
    }

    pub fn with_max_image_bytes(mut self, max: usize) -> Self {
        self.max_image_bytes = max;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080/exec")
    }
}

/// Session file under the OS temp dir: survives a client restart, not a reboot
fn default_session_file() -> PathBuf {
    std::env::temp_dir().join("shop-client").join("session.json")
}
