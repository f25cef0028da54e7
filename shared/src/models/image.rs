//! Image upload DTOs

use serde::{Deserialize, Serialize};

/// Payload of `secureUploadImage`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadImageRequest {
    /// Base64 body without the `data:` URL prefix
    pub image_data: String,
    pub file_name: String,
    pub mime_type: String,
}

/// Formats the storefront accepts for product images
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// Maximum decoded image size (5MB)
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Lower-cased extension of a file name, if it has one
pub fn file_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_IMAGE_EXTENSIONS.contains(&ext)
}
