//! Shared database service wrapper used across clients.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::db::{Database, ItemFilter, ItemRepository, LibSqlItemRepository};
use crate::models::{Item, ItemId, ItemPatch, ItemStatus, NewItem};
use crate::Result;

/// Thread-safe service for DB and repository operations.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Insert a new item, returning the stored row.
    pub async fn insert_item(&self, new_item: &NewItem) -> Result<Item> {
        let db = self.db.lock().await;
        let repo = LibSqlItemRepository::new(db.connection());
        repo.insert(new_item).await
    }

    /// Fetch an item by id.
    pub async fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        let db = self.db.lock().await;
        let repo = LibSqlItemRepository::new(db.connection());
        repo.get(id).await
    }

    /// Select a filtered page, ascending by expiration with nulls last.
    pub async fn select_items(
        &self,
        filter: &ItemFilter,
        now: DateTime<Utc>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Item>> {
        let db = self.db.lock().await;
        let repo = LibSqlItemRepository::new(db.connection());
        repo.select(filter, now, offset, limit).await
    }

    /// Count items matching a filter.
    pub async fn count_items(&self, filter: &ItemFilter, now: DateTime<Utc>) -> Result<u64> {
        let db = self.db.lock().await;
        let repo = LibSqlItemRepository::new(db.connection());
        repo.count(filter, now).await
    }

    /// Apply a partial update to an item.
    pub async fn update_item(&self, id: ItemId, patch: &ItemPatch) -> Result<Item> {
        let db = self.db.lock().await;
        let repo = LibSqlItemRepository::new(db.connection());
        repo.update(id, patch).await
    }

    /// Set an item's terminal status.
    pub async fn set_item_status(&self, id: ItemId, status: ItemStatus) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlItemRepository::new(db.connection());
        repo.set_status(id, status).await
    }

    /// Delete an item row.
    pub async fn delete_item(&self, id: ItemId) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlItemRepository::new(db.connection());
        repo.delete(id).await
    }
}
