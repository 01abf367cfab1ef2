//! Repository for content-addressed file records.

use std::collections::HashMap;

use picstash_core::models::{NewStoredFile, StoredFile};
use picstash_core::{AppError, StorageBackend};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for the `files` table.
///
/// File rows are immutable once written. Concurrent uploads of identical
/// content are resolved here with `ON CONFLICT DO NOTHING` followed by a
/// re-read, so exactly one row survives per `(checksum, storage_provider)`
/// pair no matter how many writers race.
#[derive(Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a file record, or return the existing record when one with the
    /// same checksum and storage provider is already present.
    #[tracing::instrument(skip(self, file), fields(db.table = "files", db.operation = "insert", checksum = %file.checksum))]
    pub async fn insert_or_reuse(&self, file: NewStoredFile) -> Result<StoredFile, AppError> {
        let inserted = sqlx::query_as::<Postgres, StoredFile>(
            r#"
            INSERT INTO files (file_name, file_size, mime_type, checksum, url, storage_provider)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (checksum, storage_provider) DO NOTHING
            RETURNING id, file_name, file_size, mime_type, checksum, url, storage_provider,
                      created_at, updated_at
            "#,
        )
        .bind(&file.file_name)
        .bind(file.file_size)
        .bind(&file.mime_type)
        .bind(&file.checksum)
        .bind(&file.url)
        .bind(file.storage_provider)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(record) => {
                tracing::debug!(file_id = %record.id, "File record created");
                Ok(record)
            }
            None => {
                // Lost the insert race (or the content was uploaded before).
                let existing = self
                    .find_by_checksum(&file.checksum, file.storage_provider)
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal(format!(
                            "file with checksum {} vanished after insert conflict",
                            file.checksum
                        ))
                    })?;
                tracing::debug!(file_id = %existing.id, "File record reused");
                Ok(existing)
            }
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select", db.record_id = %file_id))]
    pub async fn get_by_id(&self, file_id: Uuid) -> Result<Option<StoredFile>, AppError> {
        let record = sqlx::query_as::<Postgres, StoredFile>(
            r#"
            SELECT id, file_name, file_size, mime_type, checksum, url, storage_provider,
                   created_at, updated_at
            FROM files
            WHERE id = $1
            "#,
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    pub async fn find_by_checksum(
        &self,
        checksum: &str,
        provider: StorageBackend,
    ) -> Result<Option<StoredFile>, AppError> {
        let record = sqlx::query_as::<Postgres, StoredFile>(
            r#"
            SELECT id, file_name, file_size, mime_type, checksum, url, storage_provider,
                   created_at, updated_at
            FROM files
            WHERE checksum = $1 AND storage_provider = $2
            "#,
        )
        .bind(checksum)
        .bind(provider)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Batch fetch keyed by id. Used by the image queries to resolve original
    /// and processed files in a single round trip instead of one per row.
    #[tracing::instrument(skip(self, file_ids), fields(db.table = "files", db.operation = "select_batch", count = file_ids.len()))]
    pub async fn get_by_ids(
        &self,
        file_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, StoredFile>, AppError> {
        if file_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let records = sqlx::query_as::<Postgres, StoredFile>(
            r#"
            SELECT id, file_name, file_size, mime_type, checksum, url, storage_provider,
                   created_at, updated_at
            FROM files
            WHERE id = ANY($1)
            "#,
        )
        .bind(file_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(|f| (f.id, f)).collect())
    }
}
