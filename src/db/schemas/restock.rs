//! Restock ledger document schema
//!
//! Entries are written once and never updated or deleted.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::db::{StoreError, StoreResult};
use crate::types::RestockEntry;

/// Collection name for the restock ledger
pub const RESTOCK_COLLECTION: &str = "restock_history";

/// Ledger entry stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RestockDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    pub item_id: String,

    pub amount: i64,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl From<&RestockEntry> for RestockDoc {
    fn from(entry: &RestockEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            metadata: Metadata::created(entry.timestamp),
            item_id: entry.item_id.to_string(),
            amount: entry.amount,
            timestamp: entry.timestamp,
        }
    }
}

impl TryFrom<RestockDoc> for RestockEntry {
    type Error = StoreError;

    fn try_from(doc: RestockDoc) -> StoreResult<Self> {
        let parse = |raw: &str| {
            Uuid::parse_str(raw)
                .map_err(|e| StoreError::Backend(format!("Corrupt ledger id {}: {}", raw, e)))
        };
        Ok(RestockEntry {
            id: parse(&doc.id)?,
            item_id: parse(&doc.item_id)?,
            amount: doc.amount,
            timestamp: doc.timestamp,
        })
    }
}

impl IntoIndexes for RestockDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Window counts and newest-first history both scan by item then time
            (
                doc! { "item_id": 1, "timestamp": -1 },
                Some(
                    IndexOptions::builder()
                        .name("item_timestamp_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for RestockDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
