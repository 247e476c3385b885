//! Shared types for Storehouse

mod error;
mod models;

pub use error::{Result, StorehouseError};
pub use models::{
    ItemFilter, ItemPatch, NewItem, PublicUser, RestockEntry, StockItem, User,
};
