//! Keyword-filtered, offset-paginated item retrieval for infinite scroll.
//!
//! Fetches are not fenced against each other: a slow page response can land
//! after a newer one and there is no request-generation check. Every keyword
//! or category change clears the accumulated list before refetching, which
//! bounds the damage of a stale response to one page.

mod debounce;

pub use debounce::{KeywordDebouncer, KEYWORD_DEBOUNCE};

use chrono::{DateTime, Utc};

use crate::db::ItemFilter;
use crate::models::{Category, Item};
use crate::services::DatabaseService;
use crate::Result;

/// Items fetched per page, matching the list view's scroll chunk.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Accumulating, restartable page reader over one category's items.
///
/// Exhaustion is recognized purely from page length: `has_more` stays true
/// until a fetch returns zero rows, so a final page that exactly fills
/// `page_size` costs one extra empty fetch. That probe is part of the
/// behavioral contract, not an accident.
pub struct ItemFeed {
    db: DatabaseService,
    category: Category,
    keyword: String,
    page_size: usize,
    offset: usize,
    items: Vec<Item>,
    has_more: bool,
}

impl ItemFeed {
    /// Create an empty feed for a category.
    #[must_use]
    pub fn new(db: DatabaseService, category: Category) -> Self {
        Self {
            db,
            category,
            keyword: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            offset: 0,
            items: Vec::new(),
            has_more: true,
        }
    }

    /// Override the page size (at least 1).
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Accumulated items, in fetch order.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Whether another page may exist.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.has_more
    }

    /// Active category.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Active keyword as typed.
    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Drop accumulated state; the next `load_more` starts from offset 0.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.items.clear();
        self.has_more = true;
    }

    /// Change the keyword. Returns true (after resetting) when it differed.
    ///
    /// Call sites should debounce keystrokes through [`KeywordDebouncer`]
    /// so only the last value of a burst arrives here.
    pub fn set_keyword(&mut self, keyword: &str) -> bool {
        if self.keyword == keyword {
            return false;
        }
        self.keyword = keyword.to_string();
        self.reset();
        true
    }

    /// Switch category. Returns true (after resetting) when it differed.
    pub fn set_category(&mut self, category: Category) -> bool {
        if self.category == category {
            return false;
        }
        self.category = category;
        self.reset();
        true
    }

    /// Fetch the next page and append it, returning the appended count.
    ///
    /// The offset advances by `page_size` regardless of how many rows came
    /// back; a zero-length page flips `has_more` off.
    pub async fn load_more(&mut self, now: DateTime<Utc>) -> Result<usize> {
        if !self.has_more {
            return Ok(0);
        }

        let filter = ItemFilter::for_category(self.category, &self.keyword);
        let page = self
            .db
            .select_items(&filter, now, self.offset, self.page_size)
            .await?;

        let appended = page.len();
        self.has_more = appended > 0;
        self.offset += self.page_size;
        self.items.extend(page);

        Ok(appended)
    }
}
