//! Storage abstractions for the item image pipeline.

mod resize;
mod s3;

pub use resize::{resize_for_upload, ResizedImage, UPLOAD_TARGET_WIDTH};
pub use s3::{ObjectStoreConfig, S3BlobStore};

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::AttachmentRef;
use crate::Result;

/// Bucket holding item images.
pub const ITEMS_BUCKET: &str = "items";

/// Path prefix for uploaded item images.
pub const IMAGE_PATH_PREFIX: &str = "images";

/// Lifetime of signed preview/thumbnail URLs.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Blob store operations the item lifecycle depends on.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload object bytes, returning the stored reference.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<AttachmentRef>;

    /// Resolve a time-limited URL for an object.
    async fn signed_url(&self, bucket: &str, path: &str, ttl: Duration) -> Result<String>;

    /// Delete an object.
    async fn delete(&self, bucket: &str, path: &str) -> Result<()>;
}

/// Build a collision-free object path for an uploaded file.
///
/// Paths are machine-generated (`{prefix}/{uuid}.{ext}`); only the original
/// file extension is preserved, lower-cased and stripped of anything that is
/// not alphanumeric.
#[must_use]
pub fn build_object_path(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let id = Uuid::now_v7();

    let ext: String = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .flat_map(char::to_lowercase)
        .collect();

    if ext.is_empty() {
        format!("{prefix}/{id}")
    } else {
        format!("{prefix}/{id}.{ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_object_path_preserves_extension() {
        let path = build_object_path("images", "My Photo (1).PNG");
        assert!(path.starts_with("images/"));
        assert!(path.ends_with(".png"));
    }

    #[test]
    fn build_object_path_handles_missing_extension() {
        let path = build_object_path("images/", "photo");
        assert!(path.starts_with("images/"));
        assert!(!path.contains(".."));
        assert!(!path.ends_with('.'));
    }

    #[test]
    fn build_object_path_is_unique_per_call() {
        let a = build_object_path("images", "a.png");
        let b = build_object_path("images", "a.png");
        assert_ne!(a, b);
    }
}
