//! Cache policy.
//!
//! Controls the enable switch and per-namespace TTLs via the `[cache]` section of
//! `narnia.toml`.

use std::time::Duration;

use super::keys::Namespace;

const DEFAULT_IDENTITY_TTL_SECS: u64 = 86_400;
const DEFAULT_CAPE_TTL_SECS: u64 = 3_600;
const DEFAULT_FILE_TTL_SECS: u64 = 3_600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// When false every lookup is a miss and every write is skipped.
    pub enabled: bool,
    pub identity_ttl: Duration,
    pub cape_ttl: Duration,
    pub file_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            identity_ttl: Duration::from_secs(DEFAULT_IDENTITY_TTL_SECS),
            cape_ttl: Duration::from_secs(DEFAULT_CAPE_TTL_SECS),
            file_ttl: Duration::from_secs(DEFAULT_FILE_TTL_SECS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            identity_ttl: settings.identity_ttl,
            cape_ttl: settings.cape_ttl,
            file_ttl: settings.file_ttl,
        }
    }
}

impl CacheConfig {
    pub fn ttl_for(&self, namespace: Namespace) -> Duration {
        match namespace {
            Namespace::Identity => self.identity_ttl,
            Namespace::Cape => self.cape_ttl,
            Namespace::File => self.file_ttl,
        }
    }
}
