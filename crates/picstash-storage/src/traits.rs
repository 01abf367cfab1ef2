use crate::StorageBackend;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage backend abstraction
///
/// Backends persist opaque blobs under caller-supplied keys and serve them
/// back by key. Callers derive keys from content checksums (see
/// [`crate::keys`]), which makes writing the same bytes twice idempotent.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload data under the given storage key
    ///
    /// Returns the public URL of the stored object. Uploading to an existing
    /// key replaces its contents.
    async fn upload(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Download the full contents stored under the key
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Check whether an object exists under the key
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// The backend type serving this storage
    fn backend_type(&self) -> StorageBackend;
}
