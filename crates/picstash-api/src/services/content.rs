//! Content-addressed blob persistence.
//!
//! Pairs the storage backend with the files table: bytes land under their
//! checksum-derived key, and each unique `(checksum, provider)` pair gets
//! exactly one file row. Writing the same bytes twice is idempotent at both
//! levels, which is what the upload path and the resize worker rely on to
//! converge concurrent duplicates onto one record.

use picstash_core::models::{NewStoredFile, StoredFile};
use picstash_core::AppError;
use picstash_db::FileRepository;
use picstash_storage::{storage_key, Storage, StorageError};
use sha2::{Digest, Sha256};
use std::sync::Arc;

#[derive(Clone)]
pub struct ContentStore {
    files: FileRepository,
    storage: Arc<dyn Storage>,
}

impl ContentStore {
    pub fn new(files: FileRepository, storage: Arc<dyn Storage>) -> Self {
        Self { files, storage }
    }

    /// Lowercase SHA-256 hex digest of the content bytes.
    pub fn checksum_hex(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    /// Store content, reusing the existing file row when identical bytes are
    /// already present on this backend.
    ///
    /// The lookup-then-write window is closed by the repository insert: on a
    /// `(checksum, provider)` conflict it returns the winning row, and the
    /// losing blob write is harmless because both writes target the same
    /// content-addressed key.
    #[tracing::instrument(skip(self, data), fields(file_name = %file_name, file_size = data.len()))]
    pub async fn put(
        &self,
        file_name: &str,
        mime_type: &str,
        data: &[u8],
    ) -> Result<StoredFile, AppError> {
        let checksum = Self::checksum_hex(data);
        let provider = self.storage.backend_type();

        if let Some(existing) = self.files.find_by_checksum(&checksum, provider).await? {
            tracing::debug!(
                checksum = %checksum,
                file_id = %existing.id,
                "Identical content already stored, reusing file record"
            );
            return Ok(existing);
        }

        let key = storage_key(&checksum, mime_type);
        let url = self
            .storage
            .upload(&key, data.to_vec(), mime_type)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        self.files
            .insert_or_reuse(NewStoredFile {
                file_name: file_name.to_string(),
                file_size: data.len() as i64,
                mime_type: mime_type.to_string(),
                checksum,
                url,
                storage_provider: provider,
            })
            .await
    }

    /// Fetch the raw bytes backing a stored file row. The key is recomputed
    /// from the row's checksum and mime type, never stored.
    pub async fn get(&self, file: &StoredFile) -> Result<Vec<u8>, AppError> {
        let key = storage_key(&file.checksum, &file.mime_type);
        self.storage.download(&key).await.map_err(|e| match e {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            other => AppError::Storage(other.to_string()),
        })
    }
}
