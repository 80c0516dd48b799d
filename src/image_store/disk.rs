/// Disk-based image storage backend
use crate::{
    error::{AccountError, AccountResult},
    image_store::ImageBackend,
};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Disk storage backend
///
/// Stores images on the local filesystem, sharded into subdirectories by
/// the first two characters of the reference.
#[derive(Clone)]
pub struct DiskImageBackend {
    base_path: PathBuf,
}

impl DiskImageBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the file path for a reference: {base}/{first2chars}/{reference}
    fn get_image_path(&self, reference: &str) -> PathBuf {
        if reference.len() >= 2 && reference.is_char_boundary(2) {
            let shard = &reference[0..2];
            self.base_path.join(shard).join(reference)
        } else {
            self.base_path.join("_").join(reference)
        }
    }

    /// Ensure the directory for an image exists
    async fn ensure_image_dir(&self, reference: &str) -> AccountResult<PathBuf> {
        let image_path = self.get_image_path(reference);
        if let Some(parent) = image_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AccountError::ImageStorage(format!("Failed to create image directory: {}", e))
            })?;
        }
        Ok(image_path)
    }
}

#[async_trait]
impl ImageBackend for DiskImageBackend {
    async fn put(&self, reference: &str, data: Vec<u8>) -> AccountResult<()> {
        let image_path = self.ensure_image_dir(reference).await?;

        fs::write(&image_path, data).await.map_err(|e| {
            AccountError::ImageStorage(format!("Failed to write image {}: {}", reference, e))
        })?;

        Ok(())
    }

    async fn get(&self, reference: &str) -> AccountResult<Option<Vec<u8>>> {
        let image_path = self.get_image_path(reference);

        match fs::read(&image_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AccountError::ImageStorage(format!(
                "Failed to read image {}: {}",
                reference, e
            ))),
        }
    }

    async fn delete(&self, reference: &str) -> AccountResult<()> {
        let image_path = self.get_image_path(reference);

        match fs::remove_file(&image_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AccountError::ImageStorage(format!(
                "Failed to delete image {}: {}",
                reference, e
            ))),
        }
    }

    async fn exists(&self, reference: &str) -> AccountResult<bool> {
        Ok(fs::try_exists(self.get_image_path(reference)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = tempdir().unwrap();
        let backend = DiskImageBackend::new(dir.path().to_path_buf());

        let reference = "ab0123456789abcdef0123456789abcd.png";
        let data = b"image bytes".to_vec();

        backend.put(reference, data.clone()).await.unwrap();
        assert!(backend.exists(reference).await.unwrap());
        assert_eq!(backend.get(reference).await.unwrap(), Some(data));

        backend.delete(reference).await.unwrap();
        assert!(!backend.exists(reference).await.unwrap());
        assert_eq!(backend.get(reference).await.unwrap(), None);

        // deleting twice is fine
        backend.delete(reference).await.unwrap();
    }

    #[tokio::test]
    async fn test_directory_sharding() {
        let dir = tempdir().unwrap();
        let backend = DiskImageBackend::new(dir.path().to_path_buf());

        let path = backend.get_image_path("ab0123456789abcdef0123456789abcd.png");
        assert!(path.to_string_lossy().contains("/ab/"));
    }
}
