//! MongoDB client, collection wrapper, and store backend

use async_trait::async_trait;
use bson::{doc, DateTime as BsonDateTime, Document};
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument, UpdateModifications},
    Client, ClientSession, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::schemas::{
    ItemDoc, Metadata, RestockDoc, UserDoc, ITEM_COLLECTION, RESTOCK_COLLECTION, USER_COLLECTION,
};
use super::{PersistentStore, StoreError, StoreResult};
use crate::types::{ItemFilter, ItemPatch, RestockEntry, StockItem, User};

/// MongoDB duplicate key error code
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

fn backend_error(context: &str, err: mongodb::error::Error) -> StoreError {
    StoreError::Backend(format!("{}: {}", context, err))
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

/// Adds the soft-delete guard to a filter
fn live(mut filter: Document) -> Document {
    filter.insert("metadata.is_deleted", doc! { "$ne": true });
    filter
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and verify the connection with a ping
    pub async fn new(uri: &str, db_name: &str) -> StoreResult<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| backend_error("Failed to connect to MongoDB", e))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| backend_error("MongoDB ping failed", e))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection with its indexes applied
    pub async fn collection<T>(&self, name: &str) -> StoreResult<MongoCollection<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Start a session for multi-document transactions.
    ///
    /// Transactions need a replica set or sharded cluster; a standalone
    /// server rejects `start_transaction`.
    pub async fn start_session(&self) -> StoreResult<ClientSession> {
        self.client
            .start_session()
            .await
            .map_err(|e| backend_error("Failed to start session", e))
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> StoreResult<Self> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> StoreResult<()> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| backend_error("Failed to create indexes", e))?;

        Ok(())
    }

    /// Insert a document. Unique index violations become `DuplicateKey`.
    pub async fn insert_one(&self, mut item: T, unique_field: &str) -> StoreResult<()> {
        item.mut_metadata().is_deleted = false;

        self.inner.insert_one(item).await.map_err(|e| {
            if is_duplicate_key(&e) {
                StoreError::DuplicateKey(unique_field.to_string())
            } else {
                backend_error("Insert failed", e)
            }
        })?;

        Ok(())
    }

    /// Insert a document inside a transaction
    pub async fn insert_one_in(
        &self,
        session: &mut ClientSession,
        mut item: T,
        unique_field: &str,
    ) -> StoreResult<()> {
        item.mut_metadata().is_deleted = false;

        self.inner
            .insert_one(item)
            .session(session)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    StoreError::DuplicateKey(unique_field.to_string())
                } else {
                    backend_error("Insert failed", e)
                }
            })?;

        Ok(())
    }

    /// Find one live document by filter
    pub async fn find_one(&self, filter: Document) -> StoreResult<Option<T>> {
        self.inner
            .find_one(live(filter))
            .await
            .map_err(|e| backend_error("Find failed", e))
    }

    /// Find one live document inside a transaction
    pub async fn find_one_in(
        &self,
        session: &mut ClientSession,
        filter: Document,
    ) -> StoreResult<Option<T>> {
        self.inner
            .find_one(live(filter))
            .session(session)
            .await
            .map_err(|e| backend_error("Find failed", e))
    }

    /// Find all live documents matching a filter
    pub async fn find_many(&self, filter: Document, sort: Document) -> StoreResult<Vec<T>> {
        let cursor = self
            .inner
            .find(live(filter))
            .sort(sort)
            .await
            .map_err(|e| backend_error("Find failed", e))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| backend_error("Cursor read failed", e))
    }

    /// Count live documents matching a filter
    pub async fn count(&self, filter: Document) -> StoreResult<u64> {
        self.inner
            .count_documents(live(filter))
            .await
            .map_err(|e| backend_error("Count failed", e))
    }

    /// Atomically update one live document and return its new state
    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> StoreResult<Option<T>> {
        self.inner
            .find_one_and_update(live(filter), update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| backend_error("Update failed", e))
    }

    /// Update one live document inside a transaction and return its new state
    pub async fn find_one_and_update_in(
        &self,
        session: &mut ClientSession,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> StoreResult<Option<T>> {
        self.inner
            .find_one_and_update(live(filter), update)
            .return_document(ReturnDocument::After)
            .session(session)
            .await
            .map_err(|e| backend_error("Update failed", e))
    }

    /// Soft delete a document. Returns whether a live document matched.
    pub async fn soft_delete(&self, filter: Document) -> StoreResult<bool> {
        let now = BsonDateTime::now();
        let update = doc! {
            "$set": {
                "metadata.is_deleted": true,
                "metadata.deleted_at": now,
                "metadata.updated_at": now,
            }
        };

        let result = self
            .inner
            .update_one(live(filter), update)
            .await
            .map_err(|e| backend_error("Delete failed", e))?;

        Ok(result.matched_count > 0)
    }
}

/// MongoDB-backed [`PersistentStore`]
pub struct MongoStore {
    client: MongoClient,
    users: MongoCollection<UserDoc>,
    items: MongoCollection<ItemDoc>,
    restocks: MongoCollection<RestockDoc>,
}

impl MongoStore {
    /// Open all collections, creating indexes as needed
    pub async fn connect(client: &MongoClient) -> StoreResult<Self> {
        Ok(Self {
            client: client.clone(),
            users: client.collection(USER_COLLECTION).await?,
            items: client.collection(ITEM_COLLECTION).await?,
            restocks: client.collection(RESTOCK_COLLECTION).await?,
        })
    }

    /// Ledger insert and quantity `$inc` for one restock, run in `session`'s
    /// open transaction
    async fn record_restock_in(
        &self,
        session: &mut ClientSession,
        entry: &RestockEntry,
    ) -> StoreResult<StockItem> {
        let filter = doc! { "_id": entry.item_id.to_string() };
        let current = self
            .items
            .find_one_in(session, filter.clone())
            .await?
            .ok_or_else(|| StoreError::NotFound("item".into()))?;
        if current.quantity.checked_add(entry.amount).is_none() {
            return Err(StoreError::QuantityOverflow);
        }

        self.restocks
            .insert_one_in(session, RestockDoc::from(entry), "_id")
            .await?;

        let at = BsonDateTime::from_chrono(entry.timestamp);
        let update = doc! {
            "$inc": { "quantity": entry.amount },
            "$set": {
                "last_restock": at,
                "metadata.updated_at": at,
            },
        };
        self.items
            .find_one_and_update_in(session, filter, update)
            .await?
            .ok_or_else(|| StoreError::NotFound("item".into()))
            .and_then(StockItem::try_from)
    }
}

#[async_trait]
impl PersistentStore for MongoStore {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    async fn insert_user(&self, user: User) -> StoreResult<User> {
        self.users.insert_one(UserDoc::from(&user), "email").await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.users
            .find_one(doc! { "email": email })
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn insert_item(&self, item: StockItem) -> StoreResult<StockItem> {
        self.items.insert_one(ItemDoc::from(&item), "_id").await?;
        Ok(item)
    }

    async fn get_item(&self, id: Uuid) -> StoreResult<Option<StockItem>> {
        self.items
            .find_one(doc! { "_id": id.to_string() })
            .await?
            .map(StockItem::try_from)
            .transpose()
    }

    async fn list_items(&self, filter: ItemFilter) -> StoreResult<Vec<StockItem>> {
        let mut query = Document::new();
        if let Some(max) = filter.max_quantity {
            query.insert("quantity", doc! { "$lte": max });
        }

        self.items
            .find_many(query, doc! { "metadata.created_at": 1 })
            .await?
            .into_iter()
            .map(StockItem::try_from)
            .collect()
    }

    async fn update_item(
        &self,
        id: Uuid,
        patch: &ItemPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<StockItem> {
        let mut set = doc! { "metadata.updated_at": BsonDateTime::from_chrono(now) };
        if let Some(name) = &patch.name {
            set.insert("name", name.as_str());
        }
        if let Some(description) = &patch.description {
            set.insert("description", description.as_str());
        }
        if let Some(quantity) = patch.quantity {
            set.insert("quantity", quantity);
        }

        self.items
            .find_one_and_update(doc! { "_id": id.to_string() }, doc! { "$set": set })
            .await?
            .ok_or_else(|| StoreError::NotFound("item".into()))
            .and_then(StockItem::try_from)
    }

    async fn delete_item(&self, id: Uuid) -> StoreResult<()> {
        if self.items.soft_delete(doc! { "_id": id.to_string() }).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound("item".into()))
        }
    }

    async fn count_restocks_since(
        &self,
        item_id: Uuid,
        since: DateTime<Utc>,
    ) -> StoreResult<u64> {
        self.restocks
            .count(doc! {
                "item_id": item_id.to_string(),
                "timestamp": { "$gt": BsonDateTime::from_chrono(since) },
            })
            .await
    }

    async fn restock_history(&self, item_id: Uuid) -> StoreResult<Vec<RestockEntry>> {
        self.restocks
            .find_many(
                doc! { "item_id": item_id.to_string() },
                doc! { "timestamp": -1 },
            )
            .await?
            .into_iter()
            .map(RestockEntry::try_from)
            .collect()
    }

    async fn record_restock(&self, entry: RestockEntry) -> StoreResult<StockItem> {
        let mut session = self.client.start_session().await?;
        session
            .start_transaction()
            .await
            .map_err(|e| backend_error("Failed to start transaction", e))?;

        // Dropping the session mid-transaction aborts it server-side
        match self.record_restock_in(&mut session, &entry).await {
            Ok(item) => {
                session
                    .commit_transaction()
                    .await
                    .map_err(|e| backend_error("Restock commit failed", e))?;
                Ok(item)
            }
            Err(err) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    warn!("Failed to abort restock transaction: {}", abort_err);
                }
                Err(err)
            }
        }
    }
}
