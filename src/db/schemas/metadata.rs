//! Common metadata for all documents
//!
//! Tracks creation, update, and soft deletion timestamps.

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Common metadata for all documents
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    /// Whether this document has been soft-deleted
    #[serde(default)]
    pub is_deleted: bool,

    /// When the document was soft-deleted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,

    /// When the document was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    /// When the document was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Metadata stamped with an explicit creation time
    pub fn created(at: chrono::DateTime<chrono::Utc>) -> Self {
        let at = DateTime::from_chrono(at);
        Self {
            is_deleted: false,
            deleted_at: None,
            updated_at: Some(at),
            created_at: Some(at),
        }
    }

    pub fn created_at_chrono(&self) -> chrono::DateTime<chrono::Utc> {
        self.created_at
            .map(|d| d.to_chrono())
            .unwrap_or_else(chrono::Utc::now)
    }

    pub fn updated_at_chrono(&self) -> chrono::DateTime<chrono::Utc> {
        self.updated_at
            .map(|d| d.to_chrono())
            .unwrap_or_else(|| self.created_at_chrono())
    }
}
