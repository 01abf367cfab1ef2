//! Stored file model: a content-addressed blob record.
//!
//! A `StoredFile` row exists once per unique `(checksum, storage_provider)`
//! pair and is never mutated after creation. Both originals and processed
//! variants live in the same table; an identical resize result reuses the
//! original's row outright.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage_types::StorageBackend;

/// A deduplicated blob record. `checksum` is the lowercase SHA-256 hex digest
/// of the file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StoredFile {
    pub id: Uuid,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub checksum: String,
    pub url: String,
    pub storage_provider: StorageBackend,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting a new file row. The repository resolves a
/// `(checksum, storage_provider)` conflict by returning the existing row.
#[derive(Debug, Clone)]
pub struct NewStoredFile {
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub checksum: String,
    pub url: String,
    pub storage_provider: StorageBackend,
}
