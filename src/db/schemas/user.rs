//! User document schema
//!
//! Stores credentials for registered accounts.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::db::{StoreError, StoreResult};
use crate::types::User;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserDoc {
    /// User id (UUID string)
    #[serde(rename = "_id")]
    pub id: String,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Normalized email address
    pub email: String,

    /// Argon2 password hash
    pub password_hash: String,

    #[serde(default)]
    pub is_privileged: bool,
}

impl From<&User> for UserDoc {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            metadata: Metadata::created(user.created_at),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            is_privileged: user.is_privileged,
        }
    }
}

impl TryFrom<UserDoc> for User {
    type Error = StoreError;

    fn try_from(doc: UserDoc) -> StoreResult<Self> {
        let id = Uuid::parse_str(&doc.id)
            .map_err(|e| StoreError::Backend(format!("Corrupt user id {}: {}", doc.id, e)))?;
        Ok(User {
            id,
            created_at: doc.metadata.created_at_chrono(),
            email: doc.email,
            password_hash: doc.password_hash,
            is_privileged: doc.is_privileged,
        })
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on email closes the check-then-insert race
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
