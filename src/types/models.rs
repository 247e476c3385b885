//! Domain records shared by the services and store backends

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account.
///
/// Deliberately not `Serialize`: the password hash must never reach a
/// response body. Use [`PublicUser`] for anything client-facing.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    /// Normalized (trimmed, lower-cased) email, unique across users
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub is_privileged: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            is_privileged: false,
            created_at: Utc::now(),
        }
    }

    /// Client-safe projection
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
            is_privileged: self.is_privileged,
            created_at: self.created_at,
        }
    }
}

/// User projection returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub is_privileged: bool,
    pub created_at: DateTime<Utc>,
}

/// A stock item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockItem {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub quantity: i64,
    pub last_restock: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/items`
#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: i64,
}

impl NewItem {
    pub fn into_item(self, now: DateTime<Utc>) -> StockItem {
        StockItem {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            quantity: self.quantity,
            last_restock: now,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial item update; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

impl ItemPatch {
    /// Apply this patch to an item in place
    pub fn apply(&self, item: &mut StockItem, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(quantity) = self.quantity {
            item.quantity = quantity;
        }
        item.updated_at = now;
    }
}

/// Filter for item listings
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemFilter {
    /// Only items with `quantity <= max_quantity`
    pub max_quantity: Option<i64>,
}

impl ItemFilter {
    pub fn matches(&self, item: &StockItem) -> bool {
        self.max_quantity.map_or(true, |max| item.quantity <= max)
    }
}

/// One accepted restock. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestockEntry {
    pub id: Uuid,
    pub item_id: Uuid,
    pub amount: i64,
    pub timestamp: DateTime<Utc>,
}

impl RestockEntry {
    pub fn new(item_id: Uuid, amount: i64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id,
            amount,
            timestamp,
        }
    }
}
