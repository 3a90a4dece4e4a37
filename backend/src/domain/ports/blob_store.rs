//! Port abstraction for snapshot image storage.
use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by blob storage adapters.
    pub enum BlobStoreError {
        /// The key was rejected by the backend.
        InvalidKey { key: String } => "invalid blob key: {key}",
        /// Storage I/O failed.
        Io { message: String } => "blob storage failed: {message}",
    }
}

/// Stored object and its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Raw bytes.
    pub bytes: Vec<u8>,
    /// MIME type recorded at upload.
    pub content_type: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write (or overwrite) the object at `key`.
    async fn put(&self, key: &str, blob: Blob) -> Result<(), BlobStoreError>;

    /// Read the object at `key`, if present.
    async fn get(&self, key: &str) -> Result<Option<Blob>, BlobStoreError>;

    /// Remove the object at `key`. Missing objects are not an error.
    async fn delete(&self, key: &str) -> Result<(), BlobStoreError>;
}
