//! Data models for Larder

mod item;

pub use item::{
    AttachmentRef, Category, FoodKind, Item, ItemDraft, ItemId, ItemPatch, ItemStatus, Location,
    NewItem,
};
