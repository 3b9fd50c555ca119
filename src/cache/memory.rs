//! In-process cache backend.
//!
//! Used when no Redis URL is configured. Entries are bounded by an LRU capacity
//! and expire lazily on read once their TTL has elapsed.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;

use super::lock::mutex_lock;
use super::store::{CacheError, CacheStore};

const SOURCE: &str = "cache::memory";

struct MemoryEntry {
    value: Bytes,
    expires_at: Instant,
}

pub struct MemoryCacheStore {
    entries: Mutex<LruCache<String, MemoryEntry>>,
}

impl MemoryCacheStore {
    /// Creates a store holding at most `capacity` entries (clamped to 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "get");
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let entry = MemoryEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        mutex_lock(&self.entries, SOURCE, "put").put(key.to_string(), entry);
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        mutex_lock(&self.entries, SOURCE, "invalidate").pop(key);
        Ok(())
    }

    async fn invalidate_all(&self) -> Result<(), CacheError> {
        mutex_lock(&self.entries, SOURCE, "invalidate_all").clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn put_then_get_returns_value() {
        let store = MemoryCacheStore::new(4);
        store
            .put("file:abc", Bytes::from_static(b"payload"), TTL)
            .await
            .unwrap();

        let value = store.get("file:abc").await.unwrap();
        assert_eq!(value.as_deref(), Some(&b"payload"[..]));
        assert!(store.get("file:missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_dropped_on_read() {
        let store = MemoryCacheStore::new(4);
        store
            .put("cape:u1", Bytes::from_static(b"{}"), Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(store.get("cape:u1").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let store = MemoryCacheStore::new(2);
        store.put("user:a", Bytes::from_static(b"1"), TTL).await.unwrap();
        store.put("user:b", Bytes::from_static(b"2"), TTL).await.unwrap();
        store.get("user:a").await.unwrap();
        store.put("user:c", Bytes::from_static(b"3"), TTL).await.unwrap();

        assert!(store.get("user:a").await.unwrap().is_some());
        assert!(store.get("user:b").await.unwrap().is_none());
        assert!(store.get("user:c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn invalidation_removes_entries() {
        let store = MemoryCacheStore::new(8);
        store.put("user:a", Bytes::from_static(b"1"), TTL).await.unwrap();
        store.put("file:b", Bytes::from_static(b"2"), TTL).await.unwrap();

        store.invalidate("user:a").await.unwrap();
        assert!(store.get("user:a").await.unwrap().is_none());
        assert_eq!(store.len(), 1);

        store.invalidate_all().await.unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let store = MemoryCacheStore::new(0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn recovers_from_poisoned_lock() {
        let store = MemoryCacheStore::new(4);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store
                .entries
                .lock()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        store.put("user:a", Bytes::from_static(b"1"), TTL).await.unwrap();
        assert!(store.get("user:a").await.unwrap().is_some());
    }
}
