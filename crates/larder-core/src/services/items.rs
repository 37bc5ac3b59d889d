//! Item lifecycle orchestration: create, edit, mark-consumed, delete.
//!
//! Mutations go through here so that attachment handling and validation stay
//! consistent across clients. After any successful mutation the caller is
//! expected to reset its pagination feed and refetch [`BucketCounts`] for the
//! affected category.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::db::ItemFilter;
use crate::error::{Error, Result};
use crate::expiry::ExpiryBucket;
use crate::models::{AttachmentRef, Category, Item, ItemDraft, ItemId, ItemPatch, ItemStatus};
use crate::storage::{
    build_object_path, resize_for_upload, BlobStore, IMAGE_PATH_PREFIX, ITEMS_BUCKET,
    SIGNED_URL_TTL,
};

use super::DatabaseService;

/// A user-picked image file, not yet resized or uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedImage {
    /// Original file name; only the extension survives into the object path.
    pub file_name: String,
    /// Raw file bytes as picked.
    pub bytes: Vec<u8>,
}

/// Per-category expiration summary used for tab badges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketCounts {
    pub good: u64,
    pub soon: u64,
    pub today: u64,
    pub expired: u64,
}

impl BucketCounts {
    /// Total dated items across all four buckets.
    #[must_use]
    pub const fn total(self) -> u64 {
        self.good + self.soon + self.today + self.expired
    }
}

/// Orchestrates item mutations against the store and the blob pipeline.
#[derive(Clone)]
pub struct ItemService {
    db: DatabaseService,
    blobs: Option<Arc<dyn BlobStore>>,
}

impl ItemService {
    /// Service without image support; picked images are rejected.
    #[must_use]
    pub const fn new(db: DatabaseService) -> Self {
        Self { db, blobs: None }
    }

    /// Service with a blob store for the attachment pipeline.
    #[must_use]
    pub fn with_blob_store(db: DatabaseService, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            db,
            blobs: Some(blobs),
        }
    }

    /// Create an item from form values.
    ///
    /// Validation runs before any store call. When an image was picked, the
    /// resize→upload pipeline must complete before the insert payload is
    /// assembled; a pipeline failure aborts the whole creation and no item
    /// row is written.
    pub async fn create(
        &self,
        category: Category,
        draft: ItemDraft,
        image: Option<PickedImage>,
    ) -> Result<Item> {
        let mut new_item = draft.into_new_item(category)?;

        if let Some(image) = image {
            new_item.attachment = Some(self.upload_image(&image).await?);
        }

        let item = self.db.insert_item(&new_item).await?;
        tracing::debug!(id = %item.id, category = %item.category, "created item");
        Ok(item)
    }

    /// Apply edited form values to an existing item.
    ///
    /// A newly picked image replaces the attachment reference; the previous
    /// blob is then deleted best-effort. Without a new image the stored
    /// attachment is left untouched.
    pub async fn update(
        &self,
        id: ItemId,
        mut patch: ItemPatch,
        image: Option<PickedImage>,
    ) -> Result<Item> {
        let previous = self
            .db
            .get_item(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        if let Some(image) = image {
            patch.attachment = Some(self.upload_image(&image).await?);
        }

        let replaced_attachment = patch.attachment.is_some();
        let item = self.db.update_item(id, &patch).await?;

        if replaced_attachment {
            if let Some(old) = previous.attachment {
                if item.attachment.as_ref() != Some(&old) {
                    self.delete_blob_best_effort(&old.bucket, &old.path).await;
                }
            }
        }

        Ok(item)
    }

    /// Mark a food item as consumed. Idempotent at the data level.
    pub async fn mark_ate(&self, id: ItemId) -> Result<()> {
        let item = self
            .db
            .get_item(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        if item.category != Category::Foods {
            return Err(Error::InvalidInput(
                "Only food items can be marked as eaten".to_string(),
            ));
        }
        if item.is_ate() {
            return Ok(());
        }

        self.db.set_item_status(id, ItemStatus::Ate).await
    }

    /// Delete an item and, best-effort, its attachment blob.
    ///
    /// The caller is responsible for user confirmation. Row deletion is never
    /// blocked by attachment cleanup failure.
    pub async fn delete(&self, id: ItemId) -> Result<()> {
        let item = self
            .db
            .get_item(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        self.db.delete_item(id).await?;
        tracing::debug!(id = %id, "deleted item");

        if let Some(attachment) = item.attachment {
            self.delete_blob_best_effort(&attachment.bucket, &attachment.path)
                .await;
        }

        Ok(())
    }

    /// Resolve an item's attachment to a time-limited preview URL.
    pub async fn attachment_url(&self, item: &Item) -> Result<Option<String>> {
        let Some(attachment) = &item.attachment else {
            return Ok(None);
        };
        let blobs = self.blob_store()?;

        let url = blobs
            .signed_url(&attachment.bucket, &attachment.path, SIGNED_URL_TTL)
            .await?;
        Ok(Some(url))
    }

    /// Count a category's items per bucket under the current keyword.
    pub async fn bucket_counts(
        &self,
        category: Category,
        keyword: &str,
        now: DateTime<Utc>,
    ) -> Result<BucketCounts> {
        let base = ItemFilter::for_category(category, keyword);

        Ok(BucketCounts {
            good: self
                .db
                .count_items(&base.clone().with_bucket(ExpiryBucket::Good), now)
                .await?,
            soon: self
                .db
                .count_items(&base.clone().with_bucket(ExpiryBucket::Soon), now)
                .await?,
            today: self
                .db
                .count_items(&base.clone().with_bucket(ExpiryBucket::Today), now)
                .await?,
            expired: self
                .db
                .count_items(&base.with_bucket(ExpiryBucket::Expired), now)
                .await?,
        })
    }

    fn blob_store(&self) -> Result<&Arc<dyn BlobStore>> {
        self.blobs
            .as_ref()
            .ok_or_else(|| Error::Storage("No blob store configured".to_string()))
    }

    async fn upload_image(&self, image: &PickedImage) -> Result<AttachmentRef> {
        let blobs = self.blob_store()?;

        let resized = resize_for_upload(&image.bytes)?;
        let path = build_object_path(IMAGE_PATH_PREFIX, &image.file_name);

        blobs
            .upload(ITEMS_BUCKET, &path, &resized.bytes, Some(resized.content_type))
            .await
    }

    async fn delete_blob_best_effort(&self, bucket: &str, path: &str) {
        let Ok(blobs) = self.blob_store() else {
            return;
        };
        if let Err(error) = blobs.delete(bucket, path).await {
            tracing::warn!(bucket, path, %error, "failed to delete attachment blob");
        }
    }
}
