//! Durable blob storage for file payloads.

mod s3;

pub use s3::S3BlobStore;

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use thiserror::Error;
use tracing::debug;

const SOURCE: &str = "narnia::infra::blob";

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob `{0}` not found")]
    NotFound(String),
    #[error("blob storage configuration error: {0}")]
    Config(String),
    #[error("blob storage request failed: {0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),
    #[error("blob storage request timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobObject {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Reads the object stored under `key`. Missing objects are `BlobError::NotFound`.
    async fn get(&self, key: &str) -> Result<BlobObject, BlobError>;
}

/// Normalizes a stored file location into an object key.
///
/// Locations are stored percent-encoded and sometimes carry leading or trailing
/// slashes; neither belongs in the key.
pub fn normalize_storage_path(raw: &str) -> String {
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    decoded.trim_matches('/').to_string()
}

/// Bounded reads from a [`BlobStore`].
#[derive(Clone)]
pub struct BlobFetcher {
    store: Arc<dyn BlobStore>,
    timeout: Duration,
}

impl BlobFetcher {
    pub fn new(store: Arc<dyn BlobStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn fetch(&self, storage_path: &str) -> Result<BlobObject, BlobError> {
        let key = normalize_storage_path(storage_path);
        if key.is_empty() {
            return Err(BlobError::NotFound(storage_path.to_string()));
        }

        let object = tokio::time::timeout(self.timeout, self.store.get(&key))
            .await
            .map_err(|_| BlobError::Timeout(self.timeout))??;

        if object.bytes.is_empty() {
            return Err(BlobError::NotFound(key));
        }

        debug!(
            target = SOURCE,
            key = %key,
            size_bytes = object.bytes.len(),
            "blob fetched"
        );
        Ok(object)
    }
}
