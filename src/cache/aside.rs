//! Cache-aside policy over a [`CacheStore`].
//!
//! The cache is advisory: read failures, timeouts and undecodable entries all
//! count as misses, and write failures are logged and dropped. Callers always
//! fall through to the authoritative source on a miss.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::keys::CacheKey;
use super::store::{CacheError, CacheStore};

const SOURCE: &str = "cache::aside";

pub const CACHE_HIT_METRIC: &str = "narnia_cache_hit_total";
pub const CACHE_MISS_METRIC: &str = "narnia_cache_miss_total";
pub const CACHE_WRITE_ERROR_METRIC: &str = "narnia_cache_write_error_total";

#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
    timeout: Duration,
}

impl CacheAside {
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig, timeout: Duration) -> Self {
        Self {
            store,
            config,
            timeout,
        }
    }

    /// Returns the cached value for `key`, or `None` on any kind of miss.
    pub async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let namespace = key.namespace().as_str();
        if !self.config.enabled {
            return None;
        }

        let rendered = key.to_string();
        let raw = match tokio::time::timeout(self.timeout, self.store.get(&rendered)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => {
                warn!(
                    target = SOURCE,
                    key = %rendered,
                    error = %err,
                    "cache read failed; treating as miss"
                );
                None
            }
            Err(_) => {
                warn!(
                    target = SOURCE,
                    key = %rendered,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "cache read timed out; treating as miss"
                );
                None
            }
        };

        let decoded = raw.and_then(|bytes| match serde_json::from_slice::<T>(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    target = SOURCE,
                    key = %rendered,
                    error = %err,
                    "discarding undecodable cache entry"
                );
                None
            }
        });

        match decoded {
            Some(value) => {
                counter!(CACHE_HIT_METRIC, "namespace" => namespace).increment(1);
                debug!(target = SOURCE, key = %rendered, "cache hit");
                Some(value)
            }
            None => {
                counter!(CACHE_MISS_METRIC, "namespace" => namespace).increment(1);
                debug!(target = SOURCE, key = %rendered, "cache miss");
                None
            }
        }
    }

    /// Writes `value` under `key` with the namespace TTL. Failures are swallowed.
    pub async fn store<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T) {
        if !self.config.enabled {
            return;
        }

        let namespace = key.namespace().as_str();
        let rendered = key.to_string();
        let payload = match serde_json::to_vec(value) {
            Ok(payload) => Bytes::from(payload),
            Err(err) => {
                counter!(CACHE_WRITE_ERROR_METRIC, "namespace" => namespace).increment(1);
                warn!(
                    target = SOURCE,
                    key = %rendered,
                    error = %err,
                    "failed to encode cache entry"
                );
                return;
            }
        };

        let ttl = self.config.ttl_for(key.namespace());
        let outcome = match tokio::time::timeout(self.timeout, self.store.put(&rendered, payload, ttl))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(self.timeout)),
        };

        if let Err(err) = outcome {
            counter!(CACHE_WRITE_ERROR_METRIC, "namespace" => namespace).increment(1);
            warn!(
                target = SOURCE,
                key = %rendered,
                error = %err,
                "cache write failed; continuing without cache"
            );
        }
    }

    pub async fn invalidate(&self, key: &CacheKey) -> Result<(), CacheError> {
        let rendered = key.to_string();
        self.bounded(self.store.invalidate(&rendered)).await
    }

    pub async fn invalidate_all(&self) -> Result<(), CacheError> {
        self.bounded(self.store.invalidate_all()).await
    }

    async fn bounded<F>(&self, operation: F) -> Result<(), CacheError>
    where
        F: std::future::Future<Output = Result<(), CacheError>>,
    {
        tokio::time::timeout(self.timeout, operation)
            .await
            .unwrap_or(Err(CacheError::Timeout(self.timeout)))
    }
}
