//! Async service wrappers shared across clients.

mod database;
mod items;

pub use database::DatabaseService;
pub use items::{BucketCounts, ItemService, PickedImage};
