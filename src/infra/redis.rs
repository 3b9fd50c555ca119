//! Redis cache backend with connection pooling.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use deadpool_redis::{Config as PoolConfig, Connection, Pool, Runtime};
use redis::AsyncCommands;

use crate::cache::{CacheError, CacheStore, Namespace};

/// Number of keys to scan per iteration.
const SCAN_BATCH_SIZE: usize = 100;

#[derive(Clone)]
pub struct RedisCacheStore {
    pool: Pool,
}

impl RedisCacheStore {
    /// Creates a lazily connecting pool for `url` holding at most `max_size`
    /// connections.
    pub fn connect(url: &str, max_size: usize) -> Result<Self, CacheError> {
        let mut config = PoolConfig::from_url(url);
        config.pool = Some(deadpool_redis::PoolConfig::new(max_size.max(1)));
        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|err| CacheError::Unavailable(format!("failed to create Redis pool: {err}")))?;

        Ok(Self { pool })
    }

    async fn connection(&self) -> Result<Connection, CacheError> {
        self.pool.get().await.map_err(|err| {
            CacheError::Unavailable(format!("failed to get connection from pool: {err}"))
        })
    }

    async fn unlink_matching(&self, conn: &mut Connection, pattern: &str) -> Result<(), CacheError> {
        let mut cursor: u64 = 0;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH_SIZE)
                .query_async(&mut *conn)
                .await
                .map_err(|err| {
                    CacheError::Command(format!("failed to scan keys matching {pattern}: {err}"))
                })?;

            if !keys.is_empty() {
                let _: () = redis::cmd("UNLINK")
                    .arg(&keys)
                    .query_async(&mut *conn)
                    .await
                    .map_err(|err| CacheError::Command(format!("failed to unlink keys: {err}")))?;
            }

            cursor = next_cursor;
            if cursor == 0 {
                return Ok(());
            }
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|err| CacheError::Command(format!("failed to get {key}: {err}")))?;

        Ok(value.map(Bytes::from))
    }

    async fn put(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let seconds = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(key, value.as_ref(), seconds)
            .await
            .map_err(|err| CacheError::Command(format!("failed to set {key}: {err}")))?;

        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .del(key)
            .await
            .map_err(|err| CacheError::Command(format!("failed to delete {key}: {err}")))?;

        Ok(())
    }

    async fn invalidate_all(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        for namespace in Namespace::ALL {
            self.unlink_matching(&mut conn, &namespace.pattern()).await?;
        }
        Ok(())
    }
}
