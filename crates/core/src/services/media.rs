//! Post image validation and storage.

use std::sync::Arc;

use bytes::Bytes;
use image::ImageFormat;
use yatube_common::{AppResult, StorageBackend, generate_storage_key};

/// Shown when an upload is not a decodable image.
pub const INVALID_IMAGE_MESSAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Shown when an upload has no content.
pub const EMPTY_FILE_MESSAGE: &str = "The submitted file is empty.";

/// A file as it arrived in a form submission.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Client-side file name.
    pub file_name: String,
    /// File content.
    pub data: Bytes,
}

/// An upload that decoded successfully.
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    file_name: String,
    format: ImageFormat,
    data: Bytes,
}

impl ValidatedImage {
    /// Detected image format.
    #[must_use]
    pub const fn format(&self) -> ImageFormat {
        self.format
    }

    /// MIME type of the detected format.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// File name to derive the storage key from, with an extension matching
    /// the detected format.
    fn storage_name(&self) -> String {
        let lower = self.file_name.to_ascii_lowercase();
        let has_matching_ext = self
            .format
            .extensions_str()
            .iter()
            .any(|ext| lower.ends_with(&format!(".{ext}")));

        if has_matching_ext {
            self.file_name.clone()
        } else {
            let ext = self.format.extensions_str().first().copied().unwrap_or("bin");
            format!("image.{ext}")
        }
    }
}

/// Check that an upload is a complete, decodable image.
///
/// Returns the form error message on rejection.
pub async fn validate_image(upload: ImageUpload) -> Result<ValidatedImage, &'static str> {
    if upload.data.is_empty() {
        return Err(EMPTY_FILE_MESSAGE);
    }

    let format = image::guess_format(&upload.data).map_err(|_| INVALID_IMAGE_MESSAGE)?;

    // Full decode catches truncated files that still carry a valid header.
    let data = upload.data.clone();
    let decoded = tokio::task::spawn_blocking(move || {
        image::load_from_memory_with_format(&data, format).is_ok()
    })
    .await
    .unwrap_or(false);

    if !decoded {
        tracing::debug!(file_name = %upload.file_name, "Rejected undecodable image upload");
        return Err(INVALID_IMAGE_MESSAGE);
    }

    Ok(ValidatedImage {
        file_name: upload.file_name,
        format,
        data: upload.data,
    })
}

/// Stores post images in the media backend.
#[derive(Clone)]
pub struct MediaService {
    storage: Arc<dyn StorageBackend>,
}

impl MediaService {
    /// Create a new media service.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Store a validated image, returning its storage key.
    pub async fn store(&self, image: &ValidatedImage) -> AppResult<String> {
        let key = generate_storage_key(&image.storage_name());
        let file = self
            .storage
            .upload(&key, &image.data, image.content_type())
            .await?;

        tracing::info!(key = %file.key, size = file.size, md5 = %file.md5, "Stored post image");
        Ok(file.key)
    }

    /// Remove a stored image. Missing files are ignored.
    pub async fn remove(&self, key: &str) -> AppResult<()> {
        self.storage.delete(key).await
    }

    /// Public URL of a stored image.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        self.storage.public_url(key)
    }
}
