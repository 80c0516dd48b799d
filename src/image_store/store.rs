/// Image store manager
///
/// Validates uploads and coordinates the storage backend
use crate::{
    error::{AccountError, AccountResult},
    image_store::{disk::DiskImageBackend, is_valid_reference, ImageBackend, ImageKind},
};
use image::ImageFormat;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Result of a successful store
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub reference: String,
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
    pub size: usize,
}

/// Main image store
#[derive(Clone)]
pub struct ImageStore {
    backend: Arc<dyn ImageBackend>,
    max_image_size: usize,
}

impl ImageStore {
    /// Create an image store on the local disk
    pub fn new(location: PathBuf, max_image_size: usize) -> Self {
        Self::with_backend(Arc::new(DiskImageBackend::new(location)), max_image_size)
    }

    pub fn with_backend(backend: Arc<dyn ImageBackend>, max_image_size: usize) -> Self {
        Self {
            backend,
            max_image_size,
        }
    }

    /// Detect the format and fully decode the bytes
    fn decode(data: &[u8]) -> AccountResult<(ImageKind, u32, u32)> {
        let format = image::guess_format(data).map_err(|_| invalid_image())?;

        let kind = match format {
            ImageFormat::Png => ImageKind::Png,
            ImageFormat::Jpeg => ImageKind::Jpeg,
            ImageFormat::Gif => ImageKind::Gif,
            ImageFormat::WebP => ImageKind::WebP,
            other => {
                return Err(AccountError::Validation(format!(
                    "Unsupported image format: {:?}",
                    other
                )))
            }
        };

        let img = image::load_from_memory_with_format(data, format).map_err(|e| {
            tracing::debug!("Image decode failed: {}", e);
            invalid_image()
        })?;

        Ok((kind, img.width(), img.height()))
    }

    /// Validate and store image bytes under a fresh reference
    pub async fn store(&self, data: Vec<u8>) -> AccountResult<StoredImage> {
        if data.is_empty() {
            return Err(AccountError::Validation(
                "The submitted file is empty.".to_string(),
            ));
        }

        if data.len() > self.max_image_size {
            return Err(AccountError::Validation(format!(
                "Image exceeds maximum size of {} bytes",
                self.max_image_size
            )));
        }

        let (data, decoded) = tokio::task::spawn_blocking(move || {
            let decoded = Self::decode(&data);
            (data, decoded)
        })
        .await
        .map_err(|e| AccountError::Internal(format!("Image decode task failed: {}", e)))?;
        let (kind, width, height) = decoded?;

        let reference = format!("{}.{}", Uuid::new_v4().simple(), kind.extension());
        let size = data.len();

        self.backend.put(&reference, data).await?;

        tracing::info!(%reference, width, height, size, "Stored image");

        Ok(StoredImage {
            reference,
            kind,
            width,
            height,
            size,
        })
    }

    /// Get image bytes and MIME type by reference
    pub async fn get(&self, reference: &str) -> AccountResult<Option<(Vec<u8>, &'static str)>> {
        if !is_valid_reference(reference) {
            return Ok(None);
        }

        let kind = reference
            .rsplit_once('.')
            .and_then(|(_, ext)| ImageKind::from_extension(ext));

        match (self.backend.get(reference).await?, kind) {
            (Some(data), Some(kind)) => Ok(Some((data, kind.mime_type()))),
            _ => Ok(None),
        }
    }

    /// Release a stored image
    pub async fn delete(&self, reference: &str) -> AccountResult<()> {
        if !is_valid_reference(reference) {
            tracing::warn!(%reference, "Refusing to delete malformed image reference");
            return Ok(());
        }

        self.backend.delete(reference).await?;
        tracing::debug!(%reference, "Deleted image");

        Ok(())
    }

    pub async fn exists(&self, reference: &str) -> AccountResult<bool> {
        if !is_valid_reference(reference) {
            return Ok(false);
        }
        self.backend.exists(reference).await
    }
}

fn invalid_image() -> AccountError {
    AccountError::Validation(
        "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
            .to_string(),
    )
}

/// Encode a tiny PNG for tests
#[cfg(test)]
pub(crate) fn sample_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 3, image::Rgb([200, 30, 30]));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_store_and_get_png() {
        let dir = tempdir().unwrap();
        let store = ImageStore::new(dir.path().to_path_buf(), 1024 * 1024);

        let png = sample_png();
        let stored = store.store(png.clone()).await.unwrap();

        assert_eq!(stored.kind, ImageKind::Png);
        assert_eq!((stored.width, stored.height), (4, 3));
        assert!(stored.reference.ends_with(".png"));
        assert!(is_valid_reference(&stored.reference));

        let (data, mime) = store.get(&stored.reference).await.unwrap().unwrap();
        assert_eq!(data, png);
        assert_eq!(mime, "image/png");
    }

    #[tokio::test]
    async fn test_rejects_non_image_and_empty() {
        let dir = tempdir().unwrap();
        let store = ImageStore::new(dir.path().to_path_buf(), 1024 * 1024);

        assert!(matches!(
            store.store(b"definitely not an image".to_vec()).await,
            Err(AccountError::Validation(_))
        ));
        assert!(matches!(
            store.store(Vec::new()).await,
            Err(AccountError::Validation(_))
        ));

        // valid PNG signature, truncated body
        let mut truncated = sample_png();
        truncated.truncate(20);
        assert!(matches!(
            store.store(truncated).await,
            Err(AccountError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_stores_get_distinct_references() {
        let dir = tempdir().unwrap();
        let store = ImageStore::new(dir.path().to_path_buf(), 1024 * 1024);

        let (a, b, c) = tokio::join!(
            store.store(sample_png()),
            store.store(sample_png()),
            store.store(b"GIF89a but not really".to_vec()),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.reference, b.reference);
        assert!(store.exists(&a.reference).await.unwrap());
        assert!(store.exists(&b.reference).await.unwrap());
        assert!(matches!(c, Err(AccountError::Validation(_))));
    }

    #[tokio::test]
    async fn test_rejects_oversized() {
        let dir = tempdir().unwrap();
        let store = ImageStore::new(dir.path().to_path_buf(), 16);

        assert!(matches!(
            store.store(sample_png()).await,
            Err(AccountError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_releases_image() {
        let dir = tempdir().unwrap();
        let store = ImageStore::new(dir.path().to_path_buf(), 1024 * 1024);

        let stored = store.store(sample_png()).await.unwrap();
        assert!(store.exists(&stored.reference).await.unwrap());

        store.delete(&stored.reference).await.unwrap();
        assert!(!store.exists(&stored.reference).await.unwrap());
        assert!(store.get(&stored.reference).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_rejects_traversal() {
        let dir = tempdir().unwrap();
        let store = ImageStore::new(dir.path().to_path_buf(), 1024 * 1024);

        assert!(store.get("../account.sqlite").await.unwrap().is_none());
    }
}
