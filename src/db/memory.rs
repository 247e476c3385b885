//! In-memory store
//!
//! Concurrent maps keyed by id. Email uniqueness rides on the DashMap
//! entry API, which holds the shard lock between the check and the insert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::{PersistentStore, StoreError, StoreResult};
use crate::types::{ItemFilter, ItemPatch, RestockEntry, StockItem, User};

/// Process-local store
pub struct MemoryStore {
    /// Users by normalized email
    users: DashMap<String, User>,
    items: DashMap<Uuid, StockItem>,
    /// Ledger entries per item, in append order
    restocks: DashMap<Uuid, Vec<RestockEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            items: DashMap::new(),
            restocks: DashMap::new(),
        }
    }

    /// Number of registered users
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn insert_user(&self, user: User) -> StoreResult<User> {
        match self.users.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey("email".into())),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.get(email).map(|u| u.value().clone()))
    }

    async fn insert_item(&self, item: StockItem) -> StoreResult<StockItem> {
        self.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get_item(&self, id: Uuid) -> StoreResult<Option<StockItem>> {
        Ok(self.items.get(&id).map(|i| i.value().clone()))
    }

    async fn list_items(&self, filter: ItemFilter) -> StoreResult<Vec<StockItem>> {
        let mut items: Vec<StockItem> = self
            .items
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by_key(|i| i.created_at);
        Ok(items)
    }

    async fn update_item(
        &self,
        id: Uuid,
        patch: &ItemPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<StockItem> {
        let mut item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("item".into()))?;
        patch.apply(&mut item, now);
        Ok(item.clone())
    }

    async fn delete_item(&self, id: Uuid) -> StoreResult<()> {
        self.items
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound("item".into()))
    }

    async fn count_restocks_since(
        &self,
        item_id: Uuid,
        since: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let count = self
            .restocks
            .get(&item_id)
            .map(|entries| entries.iter().filter(|e| e.timestamp > since).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn restock_history(&self, item_id: Uuid) -> StoreResult<Vec<RestockEntry>> {
        let mut history = self
            .restocks
            .get(&item_id)
            .map(|entries| entries.clone())
            .unwrap_or_default();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(history)
    }

    async fn record_restock(&self, entry: RestockEntry) -> StoreResult<StockItem> {
        // The item's shard write lock is held across both writes, so a
        // concurrent delete either sees the restock whole or prevents it.
        let mut item = self
            .items
            .get_mut(&entry.item_id)
            .ok_or_else(|| StoreError::NotFound("item".into()))?;
        let quantity = item
            .quantity
            .checked_add(entry.amount)
            .ok_or(StoreError::QuantityOverflow)?;

        item.quantity = quantity;
        item.last_restock = entry.timestamp;
        item.updated_at = entry.timestamp;
        let updated = item.clone();

        self.restocks.entry(entry.item_id).or_default().push(entry);
        Ok(updated)
    }
}
