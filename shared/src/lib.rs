//! Shared types for the storefront client
//!
//! Wire-level records and envelopes exchanged with the spreadsheet backend.
//! Nothing here performs I/O.

pub mod client;
pub mod models;
pub mod request;
pub mod response;

// Re-exports
pub use client::{ChangePasswordRequest, LoginRequest, LoginResponse, UserInfo};
pub use models::{Product, ProductPayload, UploadImageRequest};
pub use request::{Action, BackendRequest, Method, PostEnvelope};
pub use response::{BackendResponse, has_reauth_signal};
pub use serde::{Deserialize, Serialize};
