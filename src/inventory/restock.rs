//! Restock governance
//!
//! Caps restocks per item over a trailing window and records every accepted
//! restock in an append-only ledger. The ledger is also the rate-limit
//! counter, so there is no separate counter state to keep in sync.
//!
//! Count and record run inside a per-item critical section. Without it,
//! concurrent requests could each observe a count below the cap and all
//! proceed. The ledger entry and the quantity delta are a single store
//! write, so a failed restock never consumes a slot. The lock is
//! process-local: several instances sharing one database can briefly
//! exceed the cap.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{PersistentStore, StoreError};
use crate::types::{RestockEntry, StockItem, StorehouseError};

/// Longest accepted rate-limit window: one year
pub const MAX_RESTOCK_WINDOW_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Restock limits
#[derive(Debug, Clone, Copy)]
pub struct RestockPolicy {
    /// Smallest accepted amount (inclusive)
    pub min_amount: i64,
    /// Largest accepted amount (inclusive)
    pub max_amount: i64,
    /// Trailing window length
    pub window: Duration,
    /// Accepted restocks per item per window
    pub max_per_window: u64,
}

impl Default for RestockPolicy {
    fn default() -> Self {
        Self {
            min_amount: 10,
            max_amount: 1000,
            window: Duration::hours(24),
            max_per_window: 3,
        }
    }
}

impl RestockPolicy {
    /// Check internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.min_amount < 1 {
            return Err("RESTOCK_MIN_AMOUNT must be at least 1".to_string());
        }
        if self.min_amount > self.max_amount {
            return Err("RESTOCK_MIN_AMOUNT must be less than or equal to RESTOCK_MAX_AMOUNT".to_string());
        }
        if self.window <= Duration::zero() {
            return Err("RESTOCK_WINDOW_SECONDS must be greater than zero".to_string());
        }
        if self.window > Duration::seconds(MAX_RESTOCK_WINDOW_SECONDS) {
            return Err(format!(
                "RESTOCK_WINDOW_SECONDS must be at most {}",
                MAX_RESTOCK_WINDOW_SECONDS
            ));
        }
        if self.max_per_window == 0 {
            return Err("RESTOCK_MAX_PER_WINDOW must be at least 1".to_string());
        }
        Ok(())
    }

    fn window_label(&self) -> String {
        let hours = self.window.num_hours();
        if hours > 0 && self.window == Duration::hours(hours) {
            format!("{} hours", hours)
        } else {
            format!("{} seconds", self.window.num_seconds())
        }
    }
}

/// Result of an accepted restock
#[derive(Debug, Clone, Serialize)]
pub struct RestockOutcome {
    pub item: StockItem,
    /// Restocks of this item inside the window, including this one
    pub restocks: u64,
}

/// Removes an item's lock entry once no task holds or awaits it.
///
/// Runs on every exit path, including a request future dropped while it
/// waits on the mutex or the store.
struct LockLease<'a> {
    locks: &'a DashMap<Uuid, Arc<Mutex<()>>>,
    item_id: Uuid,
}

impl Drop for LockLease<'_> {
    fn drop(&mut self) {
        let removed = self
            .locks
            .remove_if(&self.item_id, |_, lock| Arc::strong_count(lock) == 1);
        if removed.is_some() {
            debug!("Released restock lock for item {}", self.item_id);
        }
    }
}

/// Held critical section for one item
struct ItemLock<'a> {
    // Field order matters: the mutex guard (and its Arc) must drop before
    // the lease checks the reference count.
    _guard: OwnedMutexGuard<()>,
    _lease: LockLease<'a>,
}

/// Sliding-window restock limiter backed by the ledger
pub struct RestockGovernor {
    store: Arc<dyn PersistentStore>,
    policy: RestockPolicy,
    /// Per-item critical sections
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl RestockGovernor {
    pub fn new(store: Arc<dyn PersistentStore>, policy: RestockPolicy) -> Self {
        Self {
            store,
            policy,
            locks: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &RestockPolicy {
        &self.policy
    }

    /// Restock an item now
    pub async fn restock(&self, item_id: Uuid, amount: i64) -> Result<RestockOutcome, StorehouseError> {
        self.restock_at(item_id, amount, Utc::now()).await
    }

    /// Restock an item as of `now`
    pub async fn restock_at(
        &self,
        item_id: Uuid,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<RestockOutcome, StorehouseError> {
        if amount < self.policy.min_amount || amount > self.policy.max_amount {
            return Err(StorehouseError::Validation(format!(
                "out of range ({}-{})",
                self.policy.min_amount, self.policy.max_amount
            )));
        }

        let _lock = self.lock_item(item_id).await;
        self.restock_locked(item_id, amount, now).await
    }

    async fn restock_locked(
        &self,
        item_id: Uuid,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<RestockOutcome, StorehouseError> {
        if self.store.get_item(item_id).await?.is_none() {
            return Err(StorehouseError::NotFound("item not found".into()));
        }

        let cutoff = now - self.policy.window;
        let count = self.store.count_restocks_since(item_id, cutoff).await?;
        if count >= self.policy.max_per_window {
            warn!(
                "Restock rejected for item {}: {} restocks in window",
                item_id, count
            );
            return Err(StorehouseError::RateLimited(format!(
                "rate limit exceeded: maximum {} restocks per item in {}",
                self.policy.max_per_window,
                self.policy.window_label()
            )));
        }

        let item = self
            .store
            .record_restock(RestockEntry::new(item_id, amount, now))
            .await
            .map_err(|e| match e {
                // Deleted between the lookup and the write
                StoreError::NotFound(_) => StorehouseError::NotFound("item not found".into()),
                other => other.into(),
            })?;

        info!(
            "Restocked item {} by {} (now {}), {} in window",
            item_id,
            amount,
            item.quantity,
            count + 1
        );

        Ok(RestockOutcome {
            item,
            restocks: count + 1,
        })
    }

    /// Ledger entries for an item, newest first
    pub async fn history(&self, item_id: Uuid) -> Result<Vec<RestockEntry>, StorehouseError> {
        if self.store.get_item(item_id).await?.is_none() {
            return Err(StorehouseError::NotFound("item not found".into()));
        }
        Ok(self.store.restock_history(item_id).await?)
    }

    async fn lock_item(&self, item_id: Uuid) -> ItemLock<'_> {
        // The lease is created before awaiting so cancellation still cleans up
        let lease = LockLease {
            locks: &self.locks,
            item_id,
        };
        let mutex = Arc::clone(self.locks.entry(item_id).or_default().value());
        let guard = mutex.lock_owned().await;
        ItemLock {
            _guard: guard,
            _lease: lease,
        }
    }

    /// Number of items with a live critical section
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }
}
