//! Backend contract for the key/value cache.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache command failed: {0}")]
    Command(String),
    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),
}

/// A TTL-bounded byte store shared by every cache namespace.
///
/// Implementations only move bytes; serialization and the miss-on-failure
/// policy live in [`super::CacheAside`].
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    async fn put(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError>;

    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;

    /// Drops every entry in the `user:`, `cape:` and `file:` namespaces.
    async fn invalidate_all(&self) -> Result<(), CacheError>;
}
