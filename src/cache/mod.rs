//! Narnia cache layer.
//!
//! A cache-aside layer in front of Postgres and blob storage:
//!
//! - [`CacheStore`]: byte-level backend contract (Redis or in-process LRU)
//! - [`CacheKey`]: typed keys under the `user:`, `cape:` and `file:` namespaces
//! - [`CacheAside`]: TTL policy, JSON encoding and miss-on-failure semantics
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! redis_url = "redis://127.0.0.1:6379"
//! memory_capacity = 4096
//! identity_ttl_secs = 86400
//! cape_ttl_secs = 3600
//! file_ttl_secs = 3600
//! ```

mod aside;
mod config;
mod keys;
mod lock;
mod memory;
mod store;

pub use aside::{CACHE_HIT_METRIC, CACHE_MISS_METRIC, CACHE_WRITE_ERROR_METRIC, CacheAside};
pub use config::CacheConfig;
pub use keys::{CacheKey, Namespace};
pub use memory::MemoryCacheStore;
pub use store::{CacheError, CacheStore};
