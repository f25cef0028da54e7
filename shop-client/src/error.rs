//! Client error types
//!
//! One enum per failure domain. Every variant is recoverable at the View
//! boundary: a failed operation leaves prior state intact and the user
//! retries by hand.

use shared::BackendResponse;
use thiserror::Error;

/// Transport-level failure (network, HTTP status, malformed JSON, config)
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-2xx status
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Request payload is not a JSON object
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for transport operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Backend returned `success: false` for a well-formed request.
///
/// The message is the backend's own text, never reworded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BusinessError {
    pub message: String,
}

impl BusinessError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Backend message of a failed response, `fallback` when it sent none
    pub fn from_response(response: &BackendResponse, fallback: &str) -> Self {
        Self::new(response.message_or(fallback))
    }
}

/// Login and session failures
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password left blank
    #[error("Username and password are required")]
    MissingCredentials,

    /// Backend rejected the credentials (verbatim backend message)
    #[error("{0}")]
    Rejected(String),

    /// Token expired or invalid; the session has been cleared
    #[error("Session expired, please log in again")]
    ReauthRequired,

    /// Operation needs a logged-in user
    #[error("Not logged in")]
    NotAuthenticated,

    /// Password change input failed local checks
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Network(#[from] ClientError),
}

/// A single invalid form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Client-side input validation failure; never reaches the network
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid input: {}", format_fields(.fields))]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.field == field)
    }
}

fn format_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Image staging failures (per file or per index)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StagingError {
    #[error("Failed to read '{file_name}': {reason}")]
    Decode { file_name: String, reason: String },

    #[error("'{0}' is already staged")]
    DuplicateFile(String),

    #[error("Unsupported image format for '{file_name}'")]
    UnsupportedFormat { file_name: String },

    #[error("'{file_name}' is too large ({size} bytes, max {max})")]
    TooLarge {
        file_name: String,
        size: usize,
        max: usize,
    },

    #[error("No staged image at index {index} (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No staged image with id {0}")]
    UnknownId(String),
}

/// One staged image failed to upload during a submit
#[derive(Debug, Error)]
#[error("Upload of image #{position} '{file_name}' failed: {reason}")]
pub struct UploadError {
    /// 1-based position among the pending uploads
    pub position: usize,
    pub file_name: String,
    pub reason: String,
}

/// Product create/update failures
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Business(#[from] BusinessError),

    #[error(transparent)]
    Network(#[from] ClientError),

    /// Another submit is still running
    #[error("A submit is already in progress")]
    InProgress,

    /// Token rejected by the backend; the session has been cleared
    #[error("Session expired, please log in again")]
    ReauthRequired,
}

/// Product delete failures
#[derive(Debug, Error)]
pub enum DeleteError {
    /// The user declined the confirmation prompt
    #[error("Delete cancelled")]
    Cancelled,

    #[error(transparent)]
    Business(#[from] BusinessError),

    #[error(transparent)]
    Network(#[from] ClientError),

    #[error("Session expired, please log in again")]
    ReauthRequired,
}

/// Catalog load failures
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Business(#[from] BusinessError),

    #[error(transparent)]
    Network(#[from] ClientError),
}
