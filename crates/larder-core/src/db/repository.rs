//! Item repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT/OFFSET

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{params, Connection, Value};

use crate::error::{Error, Result};
use crate::expiry::ExpiryBucket;
use crate::models::{
    AttachmentRef, Category, FoodKind, Item, ItemId, ItemPatch, ItemStatus, NewItem,
};
use crate::util::{normalize_keyword, normalize_text_option};

const ITEM_COLUMNS: &str = "id, name, category, location, kind, description, note, \
     bucket, path, expired_at, status, created_at, updated_at";

/// Query filter shared by the select and count operations.
///
/// The keyword is matched case-insensitively as a substring of any of `name`,
/// `description`, or `note`; empty/whitespace keywords match everything. The
/// bucket filter applies the classifier's day-boundary windows as a range
/// predicate, so counts can never disagree with client-side classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    /// Restrict to one category.
    pub category: Option<Category>,
    /// Raw keyword as typed; normalized internally.
    pub keyword: Option<String>,
    /// Restrict to one expiration bucket (excludes items with no date).
    pub bucket: Option<ExpiryBucket>,
}

impl ItemFilter {
    /// Filter for one category with an optional keyword.
    #[must_use]
    pub fn for_category(category: Category, keyword: &str) -> Self {
        Self {
            category: Some(category),
            keyword: Some(keyword.to_string()),
            bucket: None,
        }
    }

    /// The same filter narrowed to one bucket.
    #[must_use]
    pub fn with_bucket(mut self, bucket: ExpiryBucket) -> Self {
        self.bucket = Some(bucket);
        self
    }
}

/// Trait for item storage operations
#[async_trait]
pub trait ItemRepository {
    /// Insert a new item, returning the stored row with its assigned id
    async fn insert(&self, new_item: &NewItem) -> Result<Item>;

    /// Get an item by id
    async fn get(&self, id: ItemId) -> Result<Option<Item>>;

    /// Select a filtered page, ascending by `expired_at` with nulls last
    async fn select(
        &self,
        filter: &ItemFilter,
        now: DateTime<Utc>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Item>>;

    /// Count items matching the filter
    async fn count(&self, filter: &ItemFilter, now: DateTime<Utc>) -> Result<u64>;

    /// Apply a partial update to an item
    async fn update(&self, id: ItemId, patch: &ItemPatch) -> Result<Item>;

    /// Set an item's terminal status
    async fn set_status(&self, id: ItemId, status: ItemStatus) -> Result<()>;

    /// Delete an item row
    async fn delete(&self, id: ItemId) -> Result<()>;
}

/// libSQL implementation of `ItemRepository`
pub struct LibSqlItemRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlItemRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Build the WHERE clause and bind values for a filter.
    fn build_filter(filter: &ItemFilter, now: DateTime<Utc>) -> (String, Vec<Value>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(category) = filter.category {
            clauses.push("category = ?".to_string());
            values.push(text(category.as_str()));
        }

        if let Some(keyword) = filter.keyword.as_deref().and_then(normalize_keyword) {
            let pattern = format!("%{keyword}%");
            clauses.push(
                "(LOWER(name) LIKE ? OR LOWER(IFNULL(description, '')) LIKE ? \
                 OR LOWER(IFNULL(note, '')) LIKE ?)"
                    .to_string(),
            );
            values.push(text(&pattern));
            values.push(text(&pattern));
            values.push(text(&pattern));
        }

        if let Some(bucket) = filter.bucket {
            // Undated items belong to no bucket.
            clauses.push("expired_at IS NOT NULL".to_string());
            let (lower, upper) = bucket.window_ms(now);
            if let Some(lower) = lower {
                clauses.push("expired_at >= ?".to_string());
                values.push(Value::Integer(lower));
            }
            if let Some(upper) = upper {
                clauses.push("expired_at < ?".to_string());
                values.push(Value::Integer(upper));
            }
        }

        if clauses.is_empty() {
            (String::new(), values)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), values)
        }
    }

    /// Parse an item from a database row
    fn parse_item(row: &libsql::Row) -> Result<Item> {
        let id: i64 = row.get(0)?;
        let category: String = row.get(2)?;
        let location: String = row.get(3)?;
        let kind: Option<String> = row.get(4)?;
        let bucket: Option<String> = row.get(7)?;
        let path: Option<String> = row.get(8)?;
        let expired_at_ms: Option<i64> = row.get(9)?;
        let status: Option<String> = row.get(10)?;

        let attachment = match (bucket, path) {
            (Some(bucket), Some(path)) => Some(AttachmentRef { bucket, path }),
            (None, None) => None,
            _ => {
                return Err(Error::Database(format!(
                    "Item {id} has a half-set attachment reference"
                )))
            }
        };

        let expired_at = expired_at_ms
            .map(|ms| {
                DateTime::<Utc>::from_timestamp_millis(ms)
                    .ok_or_else(|| Error::Database(format!("Item {id} has invalid expired_at {ms}")))
            })
            .transpose()?;

        Ok(Item {
            id: ItemId::new(id),
            name: row.get(1)?,
            category: category.parse()?,
            location: location.parse()?,
            kind: kind.as_deref().map(str::parse).transpose()?,
            description: row.get(5)?,
            note: row.get(6)?,
            attachment,
            expired_at,
            status: status.as_deref().map(str::parse).transpose()?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }
}

#[async_trait]
impl ItemRepository for LibSqlItemRepository<'_> {
    async fn insert(&self, new_item: &NewItem) -> Result<Item> {
        let now = Utc::now().timestamp_millis();

        self.conn
            .execute(
                "INSERT INTO items (name, category, location, kind, description, note, \
                 bucket, path, expired_at, status, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)",
                vec![
                    text(&new_item.name),
                    text(new_item.category.as_str()),
                    text(new_item.location.as_str()),
                    opt_text(new_item.kind.map(FoodKind::as_str)),
                    opt_text(new_item.description.as_deref()),
                    opt_text(new_item.note.as_deref()),
                    opt_text(new_item.attachment.as_ref().map(|a| a.bucket.as_str())),
                    opt_text(new_item.attachment.as_ref().map(|a| a.path.as_str())),
                    opt_ms(new_item.expired_at),
                    Value::Integer(now),
                    Value::Integer(now),
                ],
            )
            .await?;

        let id = ItemId::new(self.conn.last_insert_rowid());
        self.get(id).await?.ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn get(&self, id: ItemId) -> Result<Option<Item>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"),
                params![id.as_i64()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_item(&row)?)),
            None => Ok(None),
        }
    }

    async fn select(
        &self,
        filter: &ItemFilter,
        now: DateTime<Utc>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Item>> {
        let (where_sql, mut values) = Self::build_filter(filter, now);
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items{where_sql} \
             ORDER BY expired_at IS NULL, expired_at ASC, id ASC \
             LIMIT ? OFFSET ?"
        );
        values.push(Value::Integer(limit as i64));
        values.push(Value::Integer(offset as i64));

        let mut rows = self.conn.query(&sql, values).await?;
        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(Self::parse_item(&row)?);
        }

        Ok(items)
    }

    async fn count(&self, filter: &ItemFilter, now: DateTime<Utc>) -> Result<u64> {
        let (where_sql, values) = Self::build_filter(filter, now);
        let sql = format!("SELECT COUNT(*) FROM items{where_sql}");

        let mut rows = self.conn.query(&sql, values).await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };

        Ok(count.unsigned_abs())
    }

    async fn update(&self, id: ItemId, patch: &ItemPatch) -> Result<Item> {
        if patch.is_empty() {
            return self.get(id).await?.ok_or_else(|| Error::NotFound(id.to_string()));
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(name) = &patch.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::InvalidInput("Item name cannot be empty".to_string()));
            }
            sets.push("name = ?");
            values.push(text(name));
        }
        if let Some(location) = patch.location {
            sets.push("location = ?");
            values.push(text(location.as_str()));
        }
        if let Some(kind) = patch.kind {
            sets.push("kind = ?");
            values.push(opt_text(kind.map(FoodKind::as_str)));
        }
        if let Some(description) = &patch.description {
            sets.push("description = ?");
            values.push(opt_text(
                normalize_text_option(description.clone()).as_deref(),
            ));
        }
        if let Some(note) = &patch.note {
            sets.push("note = ?");
            values.push(opt_text(normalize_text_option(note.clone()).as_deref()));
        }
        if let Some(expired_at) = patch.expired_at {
            sets.push("expired_at = ?");
            values.push(opt_ms(Some(crate::expiry::end_of_day(expired_at))));
        }
        if let Some(attachment) = &patch.attachment {
            sets.push("bucket = ?");
            values.push(text(&attachment.bucket));
            sets.push("path = ?");
            values.push(text(&attachment.path));
        }

        sets.push("updated_at = ?");
        values.push(Value::Integer(Utc::now().timestamp_millis()));
        values.push(Value::Integer(id.as_i64()));

        let sql = format!("UPDATE items SET {} WHERE id = ?", sets.join(", "));
        let rows = self.conn.execute(&sql, values).await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        self.get(id).await?.ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn set_status(&self, id: ItemId, status: ItemStatus) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE items SET status = ?, updated_at = ? WHERE id = ?",
                params![
                    status.as_str(),
                    Utc::now().timestamp_millis(),
                    id.as_i64()
                ],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn delete(&self, id: ItemId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM items WHERE id = ?", params![id.as_i64()])
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn opt_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |value| Value::Text(value.to_string()))
}

fn opt_ms(value: Option<DateTime<Utc>>) -> Value {
    value.map_or(Value::Null, |at| Value::Integer(at.timestamp_millis()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{ItemDraft, Location};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 14, 30, 0).unwrap()
    }

    fn new_item(name: &str, days_from_now: Option<i64>) -> NewItem {
        let draft = ItemDraft {
            name: name.to_string(),
            location: Location::Refrigerator,
            expired_at: days_from_now.map(|days| now() + Duration::days(days)),
            ..ItemDraft::default()
        };
        let category = if days_from_now.is_some() {
            Category::Foods
        } else {
            Category::Cosmetics
        };
        draft.into_new_item(category).unwrap()
    }

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_and_get() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.connection());

        let item = repo.insert(&new_item("Milk", Some(2))).await.unwrap();
        assert_eq!(item.name, "Milk");
        assert_eq!(item.category, Category::Foods);
        assert_eq!(item.status, None);

        let fetched = repo.get(item.id).await.unwrap().unwrap();
        assert_eq!(fetched, item);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_get_missing_returns_none() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.connection());

        assert!(repo.get(ItemId::new(42)).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_select_orders_by_expiry_nulls_last() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.connection());

        repo.insert(&new_item("Shampoo", None)).await.unwrap();
        repo.insert(&new_item("Milk", Some(5))).await.unwrap();
        repo.insert(&new_item("Yogurt", Some(1))).await.unwrap();

        let items = repo
            .select(&ItemFilter::default(), now(), 0, 10)
            .await
            .unwrap();

        let names: Vec<&str> = items.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["Yogurt", "Milk", "Shampoo"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_keyword_matches_any_text_field() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.connection());

        let mut by_name = new_item("Oat milk", Some(1));
        by_name.description = None;
        repo.insert(&by_name).await.unwrap();

        let mut by_description = new_item("Carton", Some(2));
        by_description.description = Some("milk substitute".to_string());
        repo.insert(&by_description).await.unwrap();

        let mut by_note = new_item("Bottle", Some(3));
        by_note.note = Some("MILK for the cat".to_string());
        repo.insert(&by_note).await.unwrap();

        repo.insert(&new_item("Eggs", Some(4))).await.unwrap();

        let filter = ItemFilter {
            keyword: Some("  Milk ".to_string()),
            ..ItemFilter::default()
        };
        let items = repo.select(&filter, now(), 0, 10).await.unwrap();
        assert_eq!(items.len(), 3);

        let count = repo.count(&filter, now()).await.unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_keyword_matches_everything() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.connection());

        repo.insert(&new_item("Milk", Some(1))).await.unwrap();
        repo.insert(&new_item("Eggs", Some(2))).await.unwrap();

        let filter = ItemFilter {
            keyword: Some("   ".to_string()),
            ..ItemFilter::default()
        };
        assert_eq!(repo.count(&filter, now()).await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bucket_counts_partition_dated_items() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.connection());

        // Dated items spread across all four buckets; end-of-day
        // normalization applies, so day offsets pin the bucket.
        repo.insert(&new_item("Old cheese", Some(-3))).await.unwrap();
        repo.insert(&new_item("Leftovers", Some(0))).await.unwrap();
        repo.insert(&new_item("Yogurt", Some(1))).await.unwrap();
        repo.insert(&new_item("Chicken", Some(2))).await.unwrap();
        repo.insert(&new_item("Milk", Some(10))).await.unwrap();
        // Undated item belongs to no bucket.
        repo.insert(&new_item("Shampoo", None)).await.unwrap();

        let mut bucket_total = 0;
        for bucket in ExpiryBucket::ALL {
            let filter = ItemFilter::default().with_bucket(bucket);
            bucket_total += repo.count(&filter, now()).await.unwrap();
        }

        assert_eq!(bucket_total, 5);

        let expired = ItemFilter::default().with_bucket(ExpiryBucket::Expired);
        assert_eq!(repo.count(&expired, now()).await.unwrap(), 1);
        let today = ItemFilter::default().with_bucket(ExpiryBucket::Today);
        assert_eq!(repo.count(&today, now()).await.unwrap(), 1);
        let soon = ItemFilter::default().with_bucket(ExpiryBucket::Soon);
        assert_eq!(repo.count(&soon, now()).await.unwrap(), 2);
        let good = ItemFilter::default().with_bucket(ExpiryBucket::Good);
        assert_eq!(repo.count(&good, now()).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_category_filter_with_bucket_and_keyword() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.connection());

        repo.insert(&new_item("Milk", Some(1))).await.unwrap();
        repo.insert(&new_item("Milk chocolate", Some(10))).await.unwrap();
        repo.insert(&new_item("Face milk", None)).await.unwrap(); // cosmetics

        let filter = ItemFilter::for_category(Category::Foods, "milk")
            .with_bucket(ExpiryBucket::Soon);
        assert_eq!(repo.count(&filter, now()).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pagination_concatenates_to_full_set() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.connection());

        for day in 1..=7 {
            repo.insert(&new_item(&format!("Item {day}"), Some(day)))
                .await
                .unwrap();
        }

        let full = repo
            .select(&ItemFilter::default(), now(), 0, 100)
            .await
            .unwrap();

        let mut paged = Vec::new();
        let mut offset = 0;
        loop {
            let page = repo
                .select(&ItemFilter::default(), now(), offset, 3)
                .await
                .unwrap();
            if page.is_empty() {
                break;
            }
            paged.extend(page);
            offset += 3;
        }

        assert_eq!(paged, full);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_applies_partial_patch() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.connection());

        let mut seeded = new_item("Milk", Some(2));
        seeded.note = Some("open".to_string());
        let item = repo.insert(&seeded).await.unwrap();

        let patch = ItemPatch {
            name: Some("Oat milk".to_string()),
            note: Some(None),
            ..ItemPatch::default()
        };
        let updated = repo.update(item.id, &patch).await.unwrap();

        assert_eq!(updated.name, "Oat milk");
        assert_eq!(updated.note, None);
        // Untouched fields survive.
        assert_eq!(updated.location, item.location);
        assert_eq!(updated.expired_at, item.expired_at);
        assert!(updated.updated_at >= item.updated_at);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_normalizes_expiry_to_end_of_day() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.connection());

        let item = repo.insert(&new_item("Milk", Some(2))).await.unwrap();

        let picked = Utc.with_ymd_and_hms(2024, 6, 1, 8, 15, 0).unwrap();
        let patch = ItemPatch {
            expired_at: Some(picked),
            ..ItemPatch::default()
        };
        let updated = repo.update(item.id, &patch).await.unwrap();

        assert_eq!(
            updated.expired_at,
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 23, 59, 59).unwrap())
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_missing_item_is_not_found() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.connection());

        let patch = ItemPatch {
            name: Some("Ghost".to_string()),
            ..ItemPatch::default()
        };
        let err = repo.update(ItemId::new(99), &patch).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_status_is_idempotent() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.connection());

        let item = repo.insert(&new_item("Milk", Some(2))).await.unwrap();

        repo.set_status(item.id, ItemStatus::Ate).await.unwrap();
        repo.set_status(item.id, ItemStatus::Ate).await.unwrap();

        let fetched = repo.get(item.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, Some(ItemStatus::Ate));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_removes_row() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.connection());

        let item = repo.insert(&new_item("Milk", Some(2))).await.unwrap();
        repo.delete(item.id).await.unwrap();

        assert!(repo.get(item.id).await.unwrap().is_none());

        let err = repo.delete(item.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_attachment_roundtrip() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.connection());

        let mut seeded = new_item("Milk", Some(2));
        seeded.attachment = Some(AttachmentRef::new("items", "images/abc.png").unwrap());
        let item = repo.insert(&seeded).await.unwrap();

        let fetched = repo.get(item.id).await.unwrap().unwrap();
        let attachment = fetched.attachment.unwrap();
        assert_eq!(attachment.bucket, "items");
        assert_eq!(attachment.path, "images/abc.png");
    }
}
