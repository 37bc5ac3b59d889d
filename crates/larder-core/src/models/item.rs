//! Item model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::expiry;
use crate::util::normalize_text_option;

/// A unique identifier for an item, assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(i64);

impl ItemId {
    /// Wrap a store-assigned row id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw integer value of this id.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Top-level item category. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Foods,
    Cosmetics,
    Others,
}

impl Category {
    /// All categories, in tab order.
    pub const ALL: [Self; 3] = [Self::Foods, Self::Cosmetics, Self::Others];

    /// Stable string form used in the store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Foods => "foods",
            Self::Cosmetics => "cosmetics",
            Self::Others => "others",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "foods" => Ok(Self::Foods),
            "cosmetics" => Ok(Self::Cosmetics),
            "others" => Ok(Self::Others),
            other => Err(Error::InvalidInput(format!("Unknown category: {other}"))),
        }
    }
}

/// Where the item is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Dry,
    Wet,
    Refrigerator,
    Freezer,
}

impl Location {
    /// Stable string form used in the store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dry => "dry",
            Self::Wet => "wet",
            Self::Refrigerator => "refrigerator",
            Self::Freezer => "freezer",
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::Dry
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dry" => Ok(Self::Dry),
            "wet" => Ok(Self::Wet),
            "refrigerator" => Ok(Self::Refrigerator),
            "freezer" => Ok(Self::Freezer),
            other => Err(Error::InvalidInput(format!("Unknown location: {other}"))),
        }
    }
}

/// Category-specific sub-classifier. Only meaningful for `foods`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodKind {
    VegetableFruit,
    FreshMeat,
}

impl FoodKind {
    /// Stable string form used in the store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VegetableFruit => "vegetable_fruit",
            Self::FreshMeat => "fresh_meat",
        }
    }
}

impl fmt::Display for FoodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FoodKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "vegetable_fruit" => Ok(Self::VegetableFruit),
            "fresh_meat" => Ok(Self::FreshMeat),
            other => Err(Error::InvalidInput(format!("Unknown food kind: {other}"))),
        }
    }
}

/// Terminal item status. `None` on the item means active.
///
/// `OutDate` is reserved for store-side expiration marking; no library path
/// sets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Ate,
    OutDate,
}

impl ItemStatus {
    /// Stable string form used in the store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ate => "ate",
            Self::OutDate => "out_date",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ate" => Ok(Self::Ate),
            "out_date" => Ok(Self::OutDate),
            other => Err(Error::InvalidInput(format!("Unknown status: {other}"))),
        }
    }
}

/// Reference to an item's image in the blob store.
///
/// Either fully present (both `bucket` and `path`) or absent on the item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Blob store bucket name.
    pub bucket: String,
    /// Object path within the bucket.
    pub path: String,
}

impl AttachmentRef {
    /// Create an attachment reference, rejecting empty halves.
    pub fn new(bucket: impl Into<String>, path: impl Into<String>) -> Result<Self> {
        let bucket = bucket.into().trim().to_string();
        let path = path.into().trim().to_string();

        if bucket.is_empty() {
            return Err(Error::InvalidInput(
                "Attachment bucket cannot be empty".to_string(),
            ));
        }
        if path.is_empty() {
            return Err(Error::InvalidInput(
                "Attachment path cannot be empty".to_string(),
            ));
        }

        Ok(Self { bucket, path })
    }
}

/// A perishable item in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique store-assigned identifier
    pub id: ItemId,
    /// Display name
    pub name: String,
    /// Category, immutable after creation
    pub category: Category,
    /// Storage location
    pub location: Location,
    /// Optional sub-classifier (foods only)
    pub kind: Option<FoodKind>,
    /// Optional free-text description
    pub description: Option<String>,
    /// Optional free-text note
    pub note: Option<String>,
    /// Optional image reference in the blob store
    pub attachment: Option<AttachmentRef>,
    /// Expiration timestamp, normalized to 23:59:59 of the chosen day
    pub expired_at: Option<DateTime<Utc>>,
    /// Terminal status; `None` means active
    pub status: Option<ItemStatus>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl Item {
    /// One-line list-row description: `DD/MM/YYYY` expiry joined with the
    /// optional note and description fragments.
    #[must_use]
    pub fn description_line(&self) -> String {
        let mut line = self
            .expired_at
            .map(|at| at.format("%d/%m/%Y").to_string())
            .unwrap_or_default();
        if let Some(note) = &self.note {
            line.push_str(" - ");
            line.push_str(note);
        }
        if let Some(description) = &self.description {
            line.push_str(" - ");
            line.push_str(description);
        }
        line
    }

    /// Whether the item has been marked consumed.
    #[must_use]
    pub fn is_ate(&self) -> bool {
        self.status == Some(ItemStatus::Ate)
    }
}

/// Unsaved form values for creating or editing an item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDraft {
    /// Display name (required, non-empty after trim)
    pub name: String,
    /// Storage location
    pub location: Location,
    /// Optional sub-classifier (foods only)
    pub kind: Option<FoodKind>,
    /// Optional free-text description
    pub description: Option<String>,
    /// Optional free-text note
    pub note: Option<String>,
    /// Chosen expiration day; required for `foods`
    pub expired_at: Option<DateTime<Utc>>,
}

impl ItemDraft {
    /// Validate the draft against `category` and produce an insert payload.
    ///
    /// `expired_at`, when present, is normalized to the 23:59:59 boundary of
    /// its calendar day. Fails with `InvalidInput` before any store call when
    /// the name is empty or a `foods` draft has no expiration date.
    pub fn into_new_item(self, category: Category) -> Result<NewItem> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidInput(
                "Item name cannot be empty".to_string(),
            ));
        }

        if category == Category::Foods && self.expired_at.is_none() {
            return Err(Error::InvalidInput(
                "Food items require an expiration date".to_string(),
            ));
        }

        Ok(NewItem {
            name,
            category,
            location: self.location,
            kind: self.kind,
            description: normalize_text_option(self.description),
            note: normalize_text_option(self.note),
            attachment: None,
            expired_at: self.expired_at.map(expiry::end_of_day),
        })
    }
}

/// Validated insert payload for the store.
///
/// Built from an [`ItemDraft`] via [`ItemDraft::into_new_item`]; the lifecycle
/// controller fills in `attachment` after the upload pipeline completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub category: Category,
    pub location: Location,
    pub kind: Option<FoodKind>,
    pub description: Option<String>,
    pub note: Option<String>,
    pub attachment: Option<AttachmentRef>,
    pub expired_at: Option<DateTime<Utc>>,
}

/// Partial update payload for an existing item.
///
/// Outer `None` leaves the field unchanged; for clearable fields the inner
/// `None` clears the stored value. `id` and `category` have no update path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub location: Option<Location>,
    pub kind: Option<Option<FoodKind>>,
    pub description: Option<Option<String>>,
    pub note: Option<Option<String>>,
    /// Normalized to end-of-day when applied.
    pub expired_at: Option<DateTime<Utc>>,
    /// A newly uploaded image reference; `None` keeps the current attachment.
    pub attachment: Option<AttachmentRef>,
}

impl ItemPatch {
    /// Whether the patch carries no changes at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.location.is_none()
            && self.kind.is_none()
            && self.description.is_none()
            && self.note.is_none()
            && self.expired_at.is_none()
            && self.attachment.is_none()
    }
}
