//! Lazy integrity-hash backfill for capes uploaded before hashing existed.
//!
//! Failures here never fail the request: the cape is returned as it was and the
//! hash is retried on a later resolution. Concurrent backfills of the same cape
//! write the same digest.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::application::capes::ResolvedCape;
use crate::application::content::{CacheMode, ContentService};
use crate::application::repos::FilesRepo;
use crate::cache::{CacheAside, CacheKey};

const SOURCE: &str = "application::hashing";

pub const LEGACY_CAPE_HASHED_METRIC: &str = "narnia_legacy_cape_hashed_total";
pub const HASH_BACKFILL_FAILED_METRIC: &str = "narnia_hash_backfill_failed_total";

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub struct HashBackfiller {
    files: Arc<dyn FilesRepo>,
    content: Arc<ContentService>,
    cache: CacheAside,
    timeout: Duration,
}

impl HashBackfiller {
    pub fn new(
        files: Arc<dyn FilesRepo>,
        content: Arc<ContentService>,
        cache: CacheAside,
        timeout: Duration,
    ) -> Self {
        Self {
            files,
            content,
            cache,
            timeout,
        }
    }

    /// Returns the cape with a hash, computing and persisting one if missing.
    pub async fn ensure_hash(&self, cape: ResolvedCape) -> ResolvedCape {
        if cape.record.known_hash().is_some() {
            return cape;
        }

        match self
            .content
            .deliver(&cape.record.texture, CacheMode::ReadWrite)
            .await
        {
            Ok(payload) => self.ensure_hash_with(cape, &payload.bytes).await,
            Err(err) => {
                degraded(&cape, "texture fetch failed", &err);
                cape
            }
        }
    }

    /// Same as [`Self::ensure_hash`] for callers already holding the texture bytes.
    pub async fn ensure_hash_with(&self, mut cape: ResolvedCape, texture: &[u8]) -> ResolvedCape {
        if cape.record.known_hash().is_some() {
            return cape;
        }

        let digest = sha256_hex(texture);
        let persisted = tokio::time::timeout(
            self.timeout,
            self.files.update_file_hash(&cape.record.texture, &digest),
        )
        .await;
        match persisted {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                degraded(&cape, "hash persistence failed", &err);
                return cape;
            }
            Err(_) => {
                degraded(&cape, "hash persistence timed out", &"timeout");
                return cape;
            }
        }

        cape.record.hash = Some(digest);
        self.cache
            .store(&CacheKey::cape(&cape.account_uuid), &cape.record)
            .await;
        self.content.forget(&cape.record.texture).await;

        counter!(LEGACY_CAPE_HASHED_METRIC).increment(1);
        info!(
            target = SOURCE,
            cape_id = %cape.record.id,
            texture = %cape.record.texture,
            "legacy_cape_hashed"
        );
        cape
    }
}

fn degraded(cape: &ResolvedCape, reason: &'static str, error: &dyn std::fmt::Display) {
    counter!(HASH_BACKFILL_FAILED_METRIC).increment(1);
    warn!(
        target = SOURCE,
        cape_id = %cape.record.id,
        texture = %cape.record.texture,
        reason,
        error = %error,
        "hash backfill skipped"
    );
}
