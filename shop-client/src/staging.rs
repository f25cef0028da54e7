//! Image staging buffer for the product edit form
//!
//! Holds the ordered images of one edit session: URLs already stored by the
//! backend plus local files waiting for upload. Entry 0 is always the cover,
//! i.e. what `Product::image_urls[0]` becomes on the next submit.
//!
//! Every entry carries a synthetic [`StagedImageId`] so a View can address
//! entries without relying on positions that shift while it re-renders.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use shared::models::{
    DEFAULT_MAX_IMAGE_BYTES, UploadImageRequest, file_extension, is_supported_extension,
};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::StagingError;

/// Stable identifier of one staged entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StagedImageId(Uuid);

impl StagedImageId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for StagedImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One image in authoring order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedImage {
    /// Already stored by the backend
    Existing { url: String },
    /// Selected locally, uploaded on submit
    New {
        file_name: String,
        mime_type: String,
        /// Base64 body, no `data:` prefix
        base64_payload: String,
    },
}

impl StagedImage {
    pub fn is_new(&self) -> bool {
        matches!(self, StagedImage::New { .. })
    }

    /// File name of a new image; `None` for existing URLs
    pub fn file_name(&self) -> Option<&str> {
        match self {
            StagedImage::New { file_name, .. } => Some(file_name),
            StagedImage::Existing { .. } => None,
        }
    }

    /// Payload for `secureUploadImage`; `None` for existing URLs
    pub fn upload_request(&self) -> Option<UploadImageRequest> {
        match self {
            StagedImage::New {
                file_name,
                mime_type,
                base64_payload,
            } => Some(UploadImageRequest {
                image_data: base64_payload.clone(),
                file_name: file_name.clone(),
                mime_type: mime_type.clone(),
            }),
            StagedImage::Existing { .. } => None,
        }
    }

    /// Something an `<img src>` can show: the URL, or a data URL for new files
    pub fn preview_src(&self) -> String {
        match self {
            StagedImage::Existing { url } => url.clone(),
            StagedImage::New {
                mime_type,
                base64_payload,
                ..
            } => format!("data:{};base64,{}", mime_type, base64_payload),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEntry {
    pub id: StagedImageId,
    pub image: StagedImage,
}

// =============================================================================
// Raw files and decoding
// =============================================================================

/// Where the bytes of a selected file come from
#[derive(Debug, Clone)]
pub enum FileSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
    /// `data:<mime>;base64,<payload>` as produced by a browser file reader
    DataUrl(String),
}

/// A file the user picked, not yet decoded
#[derive(Debug, Clone)]
pub struct RawFile {
    pub file_name: String,
    pub source: FileSource,
}

impl RawFile {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            file_name,
            source: FileSource::Path(path.to_path_buf()),
        }
    }

    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            source: FileSource::Bytes(bytes),
        }
    }

    pub fn from_data_url(file_name: impl Into<String>, data_url: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            source: FileSource::DataUrl(data_url.into()),
        }
    }
}

/// Read, check and base64-encode one file
pub async fn decode_file(file: RawFile, max_bytes: usize) -> Result<StagedImage, StagingError> {
    let file_name = file.file_name.trim().to_string();
    let ext = file_extension(&file_name)
        .filter(|ext| is_supported_extension(ext))
        .ok_or_else(|| StagingError::UnsupportedFormat {
            file_name: file_name.clone(),
        })?;

    let decode_err = |reason: String| StagingError::Decode {
        file_name: file_name.clone(),
        reason,
    };

    let bytes = match file.source {
        FileSource::Path(path) => tokio::fs::read(&path)
            .await
            .map_err(|e| decode_err(e.to_string()))?,
        FileSource::Bytes(bytes) => bytes,
        FileSource::DataUrl(data_url) => {
            let payload = data_url
                .split_once(";base64,")
                .map(|(_, payload)| payload)
                .ok_or_else(|| decode_err("not a base64 data URL".into()))?;
            BASE64
                .decode(payload.trim())
                .map_err(|e| decode_err(e.to_string()))?
        }
    };

    if bytes.is_empty() {
        return Err(decode_err("file is empty".into()));
    }
    if bytes.len() > max_bytes {
        return Err(StagingError::TooLarge {
            file_name,
            size: bytes.len(),
            max: max_bytes,
        });
    }

    let mime_type = mime_guess::from_ext(&ext)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    Ok(StagedImage::New {
        file_name,
        mime_type,
        base64_payload: BASE64.encode(&bytes),
    })
}

/// Decode files concurrently; results come back in input order
pub async fn decode_files(
    files: Vec<RawFile>,
    max_bytes: usize,
) -> Vec<Result<StagedImage, StagingError>> {
    futures::future::join_all(files.into_iter().map(|f| decode_file(f, max_bytes))).await
}

// =============================================================================
// Upload plan
// =============================================================================

/// Position of an image in the final URL list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanSlot {
    Existing(String),
    /// Index into `pending_uploads`
    Pending(usize),
}

/// Staged state split for submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadPlan {
    /// Existing URLs in staged order
    pub existing_urls: Vec<String>,
    /// New images in staged order; upload them in this order
    pub pending_uploads: Vec<StagedImage>,
    /// Unified order, so a new image promoted to cover stays first
    pub slots: Vec<PlanSlot>,
}

impl UploadPlan {
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Final URL list once every pending image has a URL.
    ///
    /// `uploaded[i]` is the URL of `pending_uploads[i]`. Returns `None` when
    /// the counts differ. Equals `existing_urls ++ uploaded` unless a new
    /// image was moved ahead of an existing one.
    pub fn assemble(&self, uploaded: &[String]) -> Option<Vec<String>> {
        if uploaded.len() != self.pending_uploads.len() {
            return None;
        }
        self.slots
            .iter()
            .map(|slot| match slot {
                PlanSlot::Existing(url) => Some(url.clone()),
                PlanSlot::Pending(i) => uploaded.get(*i).cloned(),
            })
            .collect()
    }
}

// =============================================================================
// Buffer
// =============================================================================

/// Ordered images of one edit session
#[derive(Debug, Clone)]
pub struct ImageStagingBuffer {
    entries: Vec<StagedEntry>,
    max_image_bytes: usize,
}

impl Default for ImageStagingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IMAGE_BYTES)
    }
}

impl ImageStagingBuffer {
    pub fn new(max_image_bytes: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_image_bytes,
        }
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    /// Reset to `urls` as existing images, dropping every new one
    pub fn load_existing<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries = urls
            .into_iter()
            .map(Into::<String>::into)
            .filter(|url| !url.trim().is_empty())
            .map(|url| StagedEntry {
                id: StagedImageId::new(),
                image: StagedImage::Existing { url },
            })
            .collect();
    }

    /// Decode and append files.
    ///
    /// Files are decoded concurrently but appended in their original order.
    /// Returns the errors of files that were not added; their siblings are
    /// added regardless.
    pub async fn add_files(&mut self, files: Vec<RawFile>) -> Vec<StagingError> {
        let decoded = decode_files(files, self.max_image_bytes).await;
        self.append_decoded(decoded)
    }

    /// Append already decoded images, rejecting duplicate file names
    pub fn append_decoded(
        &mut self,
        decoded: Vec<Result<StagedImage, StagingError>>,
    ) -> Vec<StagingError> {
        let mut errors = Vec::new();
        for result in decoded {
            let image = match result {
                Ok(image) => image,
                Err(e) => {
                    tracing::warn!("Image not staged: {}", e);
                    errors.push(e);
                    continue;
                }
            };
            if let Some(name) = image.file_name()
                && self.contains_file(name)
            {
                tracing::warn!(file = %name, "Duplicate image rejected");
                errors.push(StagingError::DuplicateFile(name.to_string()));
                continue;
            }
            self.entries.push(StagedEntry {
                id: StagedImageId::new(),
                image,
            });
        }
        errors
    }

    fn contains_file(&self, file_name: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.image.file_name() == Some(file_name))
    }

    fn check_index(&self, index: usize) -> Result<(), StagingError> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(StagingError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            })
        }
    }

    pub fn position(&self, id: StagedImageId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    fn position_or_err(&self, id: StagedImageId) -> Result<usize, StagingError> {
        self.position(id)
            .ok_or_else(|| StagingError::UnknownId(id.to_string()))
    }

    pub fn remove_at(&mut self, index: usize) -> Result<StagedEntry, StagingError> {
        self.check_index(index)?;
        Ok(self.entries.remove(index))
    }

    pub fn remove(&mut self, id: StagedImageId) -> Result<StagedEntry, StagingError> {
        let index = self.position_or_err(id)?;
        Ok(self.entries.remove(index))
    }

    /// Move the entry at `index` to the front, keeping the others in order
    pub fn set_cover(&mut self, index: usize) -> Result<(), StagingError> {
        self.check_index(index)?;
        self.entries[..=index].rotate_right(1);
        Ok(())
    }

    pub fn set_cover_by_id(&mut self, id: StagedImageId) -> Result<(), StagingError> {
        let index = self.position_or_err(id)?;
        self.set_cover(index)
    }

    pub fn to_upload_plan(&self) -> UploadPlan {
        let mut plan = UploadPlan::default();
        for entry in &self.entries {
            match &entry.image {
                StagedImage::Existing { url } => {
                    plan.existing_urls.push(url.clone());
                    plan.slots.push(PlanSlot::Existing(url.clone()));
                }
                image @ StagedImage::New { .. } => {
                    plan.slots.push(PlanSlot::Pending(plan.pending_uploads.len()));
                    plan.pending_uploads.push(image.clone());
                }
            }
        }
        plan
    }

    pub fn entries(&self) -> &[StagedEntry] {
        &self.entries
    }

    pub fn cover(&self) -> Option<&StagedEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> RawFile {
        RawFile::from_bytes(name, vec![0x89, b'P', b'N', b'G'])
    }

    fn names(buffer: &ImageStagingBuffer) -> Vec<String> {
        buffer
            .entries()
            .iter()
            .map(|e| match &e.image {
                StagedImage::Existing { url } => url.clone(),
                StagedImage::New { file_name, .. } => file_name.clone(),
            })
            .collect()
    }

    #[test]
    fn test_set_cover_scenario() {
        let mut buffer = ImageStagingBuffer::default();
        buffer.load_existing(["a.jpg", "b.jpg"]);
        buffer.set_cover(1).unwrap();
        assert_eq!(buffer.to_upload_plan().existing_urls, vec!["b.jpg", "a.jpg"]);
    }

    #[test]
    fn test_set_cover_keeps_relative_order() {
        let mut buffer = ImageStagingBuffer::default();
        buffer.load_existing(["a", "b", "c", "d"]);
        buffer.set_cover(2).unwrap();
        assert_eq!(names(&buffer), vec!["c", "a", "b", "d"]);
        buffer.set_cover(0).unwrap();
        assert_eq!(names(&buffer), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_out_of_range_is_error_not_panic() {
        let mut buffer = ImageStagingBuffer::default();
        buffer.load_existing(["a"]);
        assert_eq!(
            buffer.remove_at(3),
            Err(StagingError::IndexOutOfRange { index: 3, len: 1 })
        );
        assert!(buffer.set_cover(1).is_err());
        assert_eq!(buffer.len(), 1);
    }

    #[tokio::test]
    async fn test_cover_invariant_across_mutations() {
        let mut buffer = ImageStagingBuffer::default();
        buffer.load_existing(["a.jpg", "b.jpg"]);
        let original = buffer.cover().unwrap().id;

        // adding never displaces the cover
        assert!(buffer.add_files(vec![png("c.png"), png("d.png")]).await.is_empty());
        assert_eq!(buffer.cover().unwrap().id, original);

        // removing a non-cover entry keeps it
        buffer.remove_at(1).unwrap();
        assert_eq!(buffer.cover().unwrap().id, original);

        // promote a new image, then mutate around it
        let promoted = buffer.entries()[2].id;
        buffer.set_cover_by_id(promoted).unwrap();
        assert_eq!(buffer.cover().unwrap().id, promoted);
        assert!(buffer.add_files(vec![png("e.png")]).await.is_empty());
        buffer.remove_at(2).unwrap();
        assert_eq!(buffer.cover().unwrap().id, promoted);
        assert_eq!(names(&buffer), vec!["d.png", "a.jpg", "e.png"]);

        let plan = buffer.to_upload_plan();
        assert_eq!(plan.existing_urls, vec!["a.jpg"]);
        assert_eq!(plan.slots[0], PlanSlot::Pending(0));
        assert_eq!(plan.pending_uploads[0].file_name(), Some("d.png"));
        let urls = plan.assemble(&["u-d".into(), "u-e".into()]).unwrap();
        assert_eq!(urls, vec!["u-d", "a.jpg", "u-e"]);
    }

    #[test]
    fn test_plan_without_promotion_is_existing_then_uploaded() {
        let mut buffer = ImageStagingBuffer::default();
        buffer.load_existing(["a.jpg"]);
        buffer.append_decoded(vec![Ok(StagedImage::New {
            file_name: "n.png".into(),
            mime_type: "image/png".into(),
            base64_payload: "AAAA".into(),
        })]);

        let plan = buffer.to_upload_plan();
        assert_eq!(plan.assemble(&["u-n".into()]).unwrap(), vec!["a.jpg", "u-n"]);
        assert_eq!(plan.assemble(&[]), None);
    }

    #[tokio::test]
    async fn test_decode_failure_does_not_block_siblings() {
        let mut buffer = ImageStagingBuffer::default();
        let errors = buffer
            .add_files(vec![
                png("one.png"),
                RawFile::from_path("/definitely/missing/two.jpg"),
                RawFile::from_bytes("notes.txt", b"hello".to_vec()),
                png("four.PNG"),
            ])
            .await;

        assert_eq!(errors.len(), 2);
        assert!(matches!(&errors[0], StagingError::Decode { file_name, .. } if file_name == "two.jpg"));
        assert!(matches!(&errors[1], StagingError::UnsupportedFormat { .. }));
        assert_eq!(names(&buffer), vec!["one.png", "four.PNG"]);
    }

    #[tokio::test]
    async fn test_duplicate_new_file_rejected() {
        let mut buffer = ImageStagingBuffer::default();
        assert!(buffer.add_files(vec![png("x.png")]).await.is_empty());

        let errors = buffer.add_files(vec![png("x.png"), png("y.png")]).await;

        assert_eq!(errors, vec![StagingError::DuplicateFile("x.png".into())]);
        assert_eq!(names(&buffer), vec!["x.png", "y.png"]);
    }

    #[tokio::test]
    async fn test_decode_sets_mime_and_base64() {
        let image = decode_file(png("Cover.JPG"), 1024).await.unwrap();
        match &image {
            StagedImage::New {
                mime_type,
                base64_payload,
                ..
            } => {
                assert_eq!(mime_type, "image/jpeg");
                assert_eq!(base64_payload, &BASE64.encode([0x89, b'P', b'N', b'G']));
            }
            other => panic!("unexpected {other:?}"),
        }
        let request = image.upload_request().unwrap();
        assert_eq!(request.file_name, "Cover.JPG");
        assert!(image.preview_src().starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_size_limit_and_data_url() {
        let err = decode_file(RawFile::from_bytes("big.png", vec![1; 11]), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, StagingError::TooLarge { size: 11, max: 10, .. }));

        let data_url = format!("data:image/webp;base64,{}", BASE64.encode(b"webp"));
        let image = decode_file(RawFile::from_data_url("w.webp", data_url), 10)
            .await
            .unwrap();
        assert_eq!(image.upload_request().unwrap().mime_type, "image/webp");
    }

    #[test]
    fn test_load_existing_drops_new_entries() {
        let mut buffer = ImageStagingBuffer::default();
        buffer.append_decoded(vec![Ok(StagedImage::New {
            file_name: "n.png".into(),
            mime_type: "image/png".into(),
            base64_payload: "AAAA".into(),
        })]);
        buffer.load_existing(vec!["u1".to_string(), "".to_string()]);
        assert_eq!(names(&buffer), vec!["u1"]);
        assert!(buffer.to_upload_plan().pending_uploads.is_empty());
    }
}
