//! Shop Client - storefront catalog and admin core
//!
//! Talks to the spreadsheet-backed storefront backend and keeps the client
//! state a View renders: session, product catalog, and the product edit form
//! with its staged images.

pub mod app;
pub mod catalog;
pub mod config;
pub mod debounce;
pub mod editor;
pub mod error;
pub mod logger;
pub mod remote;
pub mod session;
pub mod staging;

pub use app::ShopApp;
pub use catalog::{ALL_CATEGORIES, CatalogStore};
pub use config::{CategoryMatch, ClientConfig};
pub use debounce::Debouncer;
pub use editor::{Confirm, ProductEditor, ProductFormInput};
pub use error::{
    AuthError, BusinessError, CatalogError, ClientError, ClientResult, DeleteError, FieldError,
    StagingError, SubmitError, UploadError, ValidationError,
};
pub use remote::{HttpTransport, RemoteClient, Transport};
pub use session::{SessionEvent, SessionStatus, SessionStore};
pub use staging::{
    ImageStagingBuffer, PlanSlot, RawFile, StagedEntry, StagedImage, StagedImageId, UploadPlan,
};

// Re-export shared types for convenience
pub use shared::models::{Product, ProductPayload};
pub use shared::{BackendResponse, Method, UserInfo};
