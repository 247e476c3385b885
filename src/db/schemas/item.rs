//! Stock item document schema

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::db::{StoreError, StoreResult};
use crate::types::StockItem;

/// Collection name for items
pub const ITEM_COLLECTION: &str = "items";

/// Item document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ItemDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    pub name: String,

    #[serde(default)]
    pub description: String,

    pub quantity: i64,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub last_restock: DateTime<Utc>,
}

impl From<&StockItem> for ItemDoc {
    fn from(item: &StockItem) -> Self {
        let mut metadata = Metadata::created(item.created_at);
        metadata.updated_at = Some(bson::DateTime::from_chrono(item.updated_at));
        Self {
            id: item.id.to_string(),
            metadata,
            name: item.name.clone(),
            description: item.description.clone(),
            quantity: item.quantity,
            last_restock: item.last_restock,
        }
    }
}

impl TryFrom<ItemDoc> for StockItem {
    type Error = StoreError;

    fn try_from(doc: ItemDoc) -> StoreResult<Self> {
        let id = Uuid::parse_str(&doc.id)
            .map_err(|e| StoreError::Backend(format!("Corrupt item id {}: {}", doc.id, e)))?;
        Ok(StockItem {
            id,
            created_at: doc.metadata.created_at_chrono(),
            updated_at: doc.metadata.updated_at_chrono(),
            name: doc.name,
            description: doc.description,
            quantity: doc.quantity,
            last_restock: doc.last_restock,
        })
    }
}

impl IntoIndexes for ItemDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Low-stock listing
            (
                doc! { "quantity": 1 },
                Some(
                    IndexOptions::builder()
                        .name("quantity_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ItemDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
