//! Data models
//!
//! Records exchanged with the spreadsheet backend.

pub mod image;
pub mod product;

// Re-exports
pub use image::*;
pub use product::{Product, ProductDelete, ProductPayload};
