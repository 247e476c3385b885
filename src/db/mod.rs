//! Persistence layer for Storehouse
//!
//! [`PersistentStore`] is the only shared mutable resource in the service.
//! Two backends implement it:
//! - [`MemoryStore`]: process-local maps, used in dev mode and tests
//! - [`MongoStore`]: MongoDB collections with schema-defined indexes
//!
//! Both enforce email uniqueness themselves and record a restock (ledger
//! entry plus quantity delta) as one atomic write, so callers never need a
//! read-modify-write and a failed restock leaves no trace.

pub mod memory;
pub mod mongo;
pub mod schemas;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{ItemFilter, ItemPatch, RestockEntry, StockItem, User};

pub use memory::MemoryStore;
pub use mongo::{MongoClient, MongoCollection, MongoStore};

/// Errors raised by store backends
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    /// A uniqueness constraint rejected the write
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Applying a restock would push the quantity past `i64::MAX`
    #[error("quantity overflow")]
    QuantityOverflow,

    #[error("backend failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Typed persistence operations over users, items, and the restock ledger.
///
/// The ledger has no update or delete operation.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Short backend name for health output and logs
    fn backend_name(&self) -> &'static str;

    /// Insert a user. Fails with [`StoreError::DuplicateKey`] if the email
    /// is already taken, even under concurrent inserts.
    async fn insert_user(&self, user: User) -> StoreResult<User>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn insert_item(&self, item: StockItem) -> StoreResult<StockItem>;

    async fn get_item(&self, id: Uuid) -> StoreResult<Option<StockItem>>;

    async fn list_items(&self, filter: ItemFilter) -> StoreResult<Vec<StockItem>>;

    async fn update_item(
        &self,
        id: Uuid,
        patch: &ItemPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<StockItem>;

    async fn delete_item(&self, id: Uuid) -> StoreResult<()>;

    /// Count ledger entries for `item_id` with `timestamp > since`
    async fn count_restocks_since(&self, item_id: Uuid, since: DateTime<Utc>)
        -> StoreResult<u64>;

    /// All ledger entries for `item_id`, newest first
    async fn restock_history(&self, item_id: Uuid) -> StoreResult<Vec<RestockEntry>>;

    /// Append `entry` to the ledger and add `entry.amount` to the item's
    /// quantity, stamping `last_restock = entry.timestamp`. Both writes
    /// land or neither does. Returns the updated item.
    ///
    /// Fails with [`StoreError::NotFound`] if the item is gone and
    /// [`StoreError::QuantityOverflow`] if the sum does not fit.
    async fn record_restock(&self, entry: RestockEntry) -> StoreResult<StockItem>;
}
