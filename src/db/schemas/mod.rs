//! Database schemas for Storehouse
//!
//! Defines MongoDB document structures for users, items, and the restock
//! ledger, plus their conversions to the domain records.

mod item;
mod metadata;
mod restock;
mod user;

pub use item::{ItemDoc, ITEM_COLLECTION};
pub use metadata::Metadata;
pub use restock::{RestockDoc, RESTOCK_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};
