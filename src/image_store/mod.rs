/// Profile image storage
///
/// Validates uploaded bytes as images and stores them behind a pluggable
/// backend. Stored images are addressed by an opaque reference of the form
/// `<32 hex chars>.<ext>`.

pub mod disk;
mod store;

pub use store::{ImageStore, StoredImage};

#[cfg(test)]
pub(crate) use store::sample_png;

use crate::error::AccountResult;
use async_trait::async_trait;

/// Image storage backend trait
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Store bytes under a reference
    async fn put(&self, reference: &str, data: Vec<u8>) -> AccountResult<()>;

    /// Retrieve bytes by reference
    async fn get(&self, reference: &str) -> AccountResult<Option<Vec<u8>>>;

    /// Delete by reference; deleting a missing reference is not an error
    async fn delete(&self, reference: &str) -> AccountResult<()>;

    /// Check if a reference exists
    async fn exists(&self, reference: &str) -> AccountResult<bool>;
}

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    WebP,
}

impl ImageKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Gif => "gif",
            ImageKind::WebP => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Gif => "image/gif",
            ImageKind::WebP => "image/webp",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "png" => Some(ImageKind::Png),
            "jpg" => Some(ImageKind::Jpeg),
            "gif" => Some(ImageKind::Gif),
            "webp" => Some(ImageKind::WebP),
            _ => None,
        }
    }
}

/// Check that a reference has the shape this store generates
///
/// Guards the disk backend against path traversal on the serving route.
pub fn is_valid_reference(reference: &str) -> bool {
    match reference.split_once('.') {
        Some((stem, ext)) => {
            stem.len() == 32
                && stem.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
                && ImageKind::from_extension(ext).is_some()
        }
        None => false,
    }
}
