//! Stock item CRUD

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::db::PersistentStore;
use crate::types::{ItemFilter, ItemPatch, NewItem, StockItem, StorehouseError};

/// Items at or below this quantity are reported as low stock
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 20;

fn validate_name(name: &str) -> Result<(), StorehouseError> {
    if name.trim().is_empty() {
        return Err(StorehouseError::Validation("name is required".into()));
    }
    Ok(())
}

fn validate_quantity(quantity: i64) -> Result<(), StorehouseError> {
    if quantity < 0 {
        return Err(StorehouseError::Validation(
            "quantity must not be negative".into(),
        ));
    }
    Ok(())
}

/// Item persistence with field validation
pub struct ItemService {
    store: Arc<dyn PersistentStore>,
    low_stock_threshold: i64,
}

impl ItemService {
    pub fn new(store: Arc<dyn PersistentStore>, low_stock_threshold: i64) -> Self {
        Self {
            store,
            low_stock_threshold,
        }
    }

    pub async fn create(&self, new_item: NewItem) -> Result<StockItem, StorehouseError> {
        validate_name(&new_item.name)?;
        validate_quantity(new_item.quantity)?;

        let item = self.store.insert_item(new_item.into_item(Utc::now())).await?;
        info!("Created item {} ({})", item.id, item.name);
        Ok(item)
    }

    pub async fn list(&self) -> Result<Vec<StockItem>, StorehouseError> {
        Ok(self.store.list_items(ItemFilter::default()).await?)
    }

    pub async fn low_stock(&self) -> Result<Vec<StockItem>, StorehouseError> {
        let filter = ItemFilter {
            max_quantity: Some(self.low_stock_threshold),
        };
        Ok(self.store.list_items(filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<StockItem, StorehouseError> {
        self.store
            .get_item(id)
            .await?
            .ok_or_else(|| StorehouseError::NotFound("item not found".into()))
    }

    pub async fn update(&self, id: Uuid, patch: ItemPatch) -> Result<StockItem, StorehouseError> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(quantity) = patch.quantity {
            validate_quantity(quantity)?;
        }

        let item = self
            .store
            .update_item(id, &patch, Utc::now())
            .await
            .map_err(not_found_as_item)?;
        info!("Updated item {}", id);
        Ok(item)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), StorehouseError> {
        self.store.delete_item(id).await.map_err(not_found_as_item)?;
        info!("Deleted item {}", id);
        Ok(())
    }
}

fn not_found_as_item(err: crate::db::StoreError) -> StorehouseError {
    match err {
        crate::db::StoreError::NotFound(_) => StorehouseError::NotFound("item not found".into()),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn service() -> ItemService {
        ItemService::new(Arc::new(MemoryStore::new()), DEFAULT_LOW_STOCK_THRESHOLD)
    }

    fn new_item(name: &str, quantity: i64) -> NewItem {
        NewItem {
            name: name.into(),
            description: String::new(),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let service = service();
        let item = service.create(new_item("Bolts", 100)).await.unwrap();

        let fetched = service.get(item.id).await.unwrap();
        assert_eq!(fetched, item);
        assert_eq!(fetched.last_restock, fetched.created_at);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let service = service();
        assert!(matches!(
            service.create(new_item("   ", 1)).await,
            Err(StorehouseError::Validation(_))
        ));
        assert!(matches!(
            service.create(new_item("Nuts", -1)).await,
            Err(StorehouseError::Validation(_))
        ));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_low_stock_threshold_is_inclusive() {
        let service = service();
        service.create(new_item("At threshold", 20)).await.unwrap();
        service.create(new_item("Above", 21)).await.unwrap();
        service.create(new_item("Empty", 0)).await.unwrap();

        let mut names: Vec<String> = service
            .low_stock()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["At threshold", "Empty"]);
    }

    #[tokio::test]
    async fn test_partial_update() {
        let service = service();
        let item = service.create(new_item("Washers", 10)).await.unwrap();

        let updated = service
            .update(
                item.id,
                ItemPatch {
                    description: Some("M6 zinc".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Washers");
        assert_eq!(updated.quantity, 10);
        assert_eq!(updated.description, "M6 zinc");
    }

    #[tokio::test]
    async fn test_update_rejects_negative_quantity() {
        let service = service();
        let item = service.create(new_item("Washers", 10)).await.unwrap();

        let err = service
            .update(
                item.id,
                ItemPatch {
                    quantity: Some(-5),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorehouseError::Validation(_)));
        assert_eq!(service.get(item.id).await.unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn test_missing_item() {
        let service = service();
        let id = Uuid::new_v4();

        assert!(matches!(service.get(id).await, Err(StorehouseError::NotFound(_))));
        assert!(matches!(
            service.update(id, ItemPatch::default()).await,
            Err(StorehouseError::NotFound(_))
        ));
        assert!(matches!(service.delete(id).await, Err(StorehouseError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let service = service();
        let item = service.create(new_item("Gaskets", 3)).await.unwrap();

        service.delete(item.id).await.unwrap();
        assert!(matches!(
            service.get(item.id).await,
            Err(StorehouseError::NotFound(_))
        ));
    }
}
