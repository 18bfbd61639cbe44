//! Two-tier, fail-open cache.
//!
//! ## Architecture
//!
//! - **Local tier (DashMap)**: in-memory, per-process, TTL plus entry ceiling
//! - **Remote tier (Redis)**: shared across processes, native TTL
//! - **CacheService**: typed facade that serves from Redis while it is
//!   healthy and from the local tier otherwise
//!
//! ```text
//! caller → CacheService ──(Redis ready)──→ RemoteCache
//!                      └─(otherwise)────→ LocalCache
//! ```
//!
//! ## Graceful Degradation
//!
//! If Redis is unavailable or disabled, the service serves from the local
//! tier and switches back as soon as the health monitor sees Redis again.
//! Cache errors are logged, never returned.

pub mod config;
pub mod error;
pub mod local;
pub mod metrics;
pub mod pattern;
pub mod remote;
pub mod service;
pub mod store;

pub use config::{CacheConfig, RedisConfig};
pub use error::{CacheError, CacheResult};
pub use local::{CachedEntry, LocalCache, LocalCacheStats};
pub use pattern::KeyPattern;
pub use remote::{RemoteCache, RemoteHealth};
pub use service::{CacheService, CacheServiceStats, RemoteBackend, create_cache_service};
pub use store::{CacheStore, CacheTier};
