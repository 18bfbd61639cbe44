//! Fail-open cache facade over the local and remote tiers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{CacheConfig, RedisConfig};
use crate::local::{LocalCache, LocalCacheStats};
use crate::remote::{RemoteCache, RemoteHealth};
use crate::store::{CacheStore, CacheTier};

/// A remote store together with the health channel that drives selection.
pub struct RemoteBackend {
    pub store: Arc<dyn CacheStore>,
    pub health: watch::Receiver<RemoteHealth>,
}

impl RemoteBackend {
    pub fn new(store: Arc<dyn CacheStore>, health: watch::Receiver<RemoteHealth>) -> Self {
        Self { store, health }
    }
}

impl From<Arc<RemoteCache>> for RemoteBackend {
    fn from(remote: Arc<RemoteCache>) -> Self {
        let health = remote.subscribe();
        Self::new(remote, health)
    }
}

/// The store currently serving requests.
struct ActiveStore {
    store: Arc<dyn CacheStore>,
}

/// Background tasks owned by the service; aborted when it is dropped.
#[derive(Default)]
struct BackgroundTasks(Vec<JoinHandle<()>>);

impl Drop for BackgroundTasks {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Service-level cache statistics.
#[derive(Debug, Clone)]
pub struct CacheServiceStats {
    pub active_tier: CacheTier,
    pub remote_configured: bool,
    pub hits: u64,
    pub misses: u64,
    pub local: LocalCacheStats,
}

/// Backend-agnostic typed cache that never fails.
///
/// ## Backend Selection
///
/// Requests go to the remote store while its health channel reports
/// [`RemoteHealth::Ready`] and to the local store otherwise. A listener task
/// swaps the active store whenever the health changes, so the hot path only
/// loads a pointer and never probes the network. Each operation loads the
/// active store once and uses it for the whole call.
///
/// ## Failure Semantics
///
/// Backend, serialization and capacity errors are logged and turned into a
/// miss (`get`) or a no-op (`set`, `del`, `del_by_pattern`). A failed cache
/// costs an extra trip to the data source, never an error.
pub struct CacheService {
    local: Arc<LocalCache>,
    remote_configured: bool,
    active: Arc<ArcSwap<ActiveStore>>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    tasks: BackgroundTasks,
}

impl CacheService {
    /// Create a service over `local` and an optional remote backend.
    ///
    /// With a remote backend this spawns the health listener, so it must be
    /// called from within a Tokio runtime.
    pub fn new(
        local: Arc<LocalCache>,
        remote: Option<RemoteBackend>,
        default_ttl: Duration,
    ) -> Self {
        let local_store: Arc<dyn CacheStore> = local.clone();
        let mut tasks = BackgroundTasks::default();

        let (active, remote_configured) = match remote {
            None => (Arc::new(ArcSwap::from_pointee(ActiveStore { store: local_store })), false),
            Some(RemoteBackend { store, mut health }) => {
                let initial = if health.borrow_and_update().is_ready() {
                    store.clone()
                } else {
                    local_store.clone()
                };
                let active = Arc::new(ArcSwap::from_pointee(ActiveStore { store: initial }));

                tasks.0.push(spawn_health_listener(
                    health,
                    active.clone(),
                    local_store,
                    store,
                ));
                (active, true)
            }
        };

        Self {
            local,
            remote_configured,
            active,
            default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            tasks,
        }
    }

    /// Hand a background task to the service so it is stopped with it.
    pub fn with_task(mut self, handle: JoinHandle<()>) -> Self {
        self.tasks.0.push(handle);
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn local(&self) -> &Arc<LocalCache> {
        &self.local
    }

    pub fn active_tier(&self) -> CacheTier {
        self.active.load().store.tier()
    }

    pub fn is_remote_active(&self) -> bool {
        self.active_tier() == CacheTier::Remote
    }

    /// Get a value and deserialize it as `T`.
    ///
    /// Returns `None` if the key is absent, expired, undecodable, or the
    /// backend failed.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let active = self.active.load_full();
        let tier = active.store.tier();

        let bytes = match active.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(key = %key, tier = %tier, "cache miss");
                self.record_miss(tier);
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %key, tier = %tier, error = %e, "cache GET failed");
                crate::metrics::record_cache_error(tier.as_str(), "get");
                self.record_miss(tier);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                tracing::debug!(key = %key, tier = %tier, "cache hit");
                self.hits.fetch_add(1, Ordering::Relaxed);
                crate::metrics::record_cache_hit(tier.as_str());
                Some(value)
            }
            Err(e) => {
                tracing::warn!(key = %key, tier = %tier, error = %e, "cached value could not be decoded");
                crate::metrics::record_cache_error(tier.as_str(), "decode");
                self.record_miss(tier);
                None
            }
        }
    }

    /// Store a value with the default TTL.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        self.set_with_ttl(key, value, self.default_ttl).await;
    }

    /// Store a value with an explicit TTL. A zero TTL never expires, and so
    /// does one too large for the local clock.
    pub async fn set_with_ttl<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        let active = self.active.load_full();
        let tier = active.store.tier();

        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache value could not be serialized");
                crate::metrics::record_cache_error(tier.as_str(), "encode");
                return;
            }
        };

        match active.store.set(key, bytes, ttl).await {
            Ok(()) => {
                tracing::debug!(key = %key, tier = %tier, ttl_ms = ttl.as_millis() as u64, "cache set");
            }
            Err(e) => {
                tracing::warn!(key = %key, tier = %tier, error = %e, "cache SET failed");
                crate::metrics::record_cache_error(tier.as_str(), "set");
            }
        }
    }

    /// Remove a key.
    pub async fn del(&self, key: &str) {
        let active = self.active.load_full();
        let tier = active.store.tier();

        match active.store.del(key).await {
            Ok(()) => tracing::debug!(key = %key, tier = %tier, "cache invalidated"),
            Err(e) => {
                tracing::warn!(key = %key, tier = %tier, error = %e, "cache DEL failed");
                crate::metrics::record_cache_error(tier.as_str(), "del");
            }
        }
    }

    /// Remove every key matching a glob pattern such as `"user:*"`.
    ///
    /// Both tiers understand Redis `KEYS` syntax: `*`, `?`, `[abc]`, `[^a]`,
    /// `[a-z]` and `\` escapes.
    pub async fn del_by_pattern(&self, pattern: &str) {
        let active = self.active.load_full();
        let tier = active.store.tier();

        match active.store.del_by_pattern(pattern).await {
            Ok(removed) => {
                tracing::debug!(pattern = %pattern, tier = %tier, removed = removed, "cache pattern invalidated");
            }
            Err(e) => {
                tracing::warn!(pattern = %pattern, tier = %tier, error = %e, "cache pattern DEL failed");
                crate::metrics::record_cache_error(tier.as_str(), "del_by_pattern");
            }
        }
    }

    pub fn stats(&self) -> CacheServiceStats {
        CacheServiceStats {
            active_tier: self.active_tier(),
            remote_configured: self.remote_configured,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            local: self.local.stats(),
        }
    }

    fn record_miss(&self, tier: CacheTier) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        crate::metrics::record_cache_miss(tier.as_str());
    }
}

/// Follow remote health changes and swap the active store accordingly.
fn spawn_health_listener(
    mut health: watch::Receiver<RemoteHealth>,
    active: Arc<ArcSwap<ActiveStore>>,
    local: Arc<dyn CacheStore>,
    remote: Arc<dyn CacheStore>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while health.changed().await.is_ok() {
            let state = *health.borrow_and_update();
            let next = if state.is_ready() {
                remote.clone()
            } else {
                local.clone()
            };
            let next_tier = next.tier();

            let previous = active.swap(Arc::new(ActiveStore { store: next }));
            if previous.store.tier() != next_tier {
                crate::metrics::record_backend_switch(next_tier.as_str());
                match next_tier {
                    CacheTier::Remote => tracing::info!("remote cache ready, serving from Redis"),
                    CacheTier::Local => {
                        tracing::warn!(health = ?state, "remote cache unavailable, falling back to local cache")
                    }
                }
            }
        }
        tracing::debug!("remote health channel closed, cache backend selection frozen");
    })
}

/// Build the cache service described by the configuration.
///
/// Falls back to the local cache alone when Redis is disabled or its pool
/// cannot be built. When Redis is enabled the first health probe is awaited
/// so the initial selection reflects real connectivity; later changes are
/// picked up by the background health monitor.
pub async fn create_cache_service(cache: &CacheConfig, redis: &RedisConfig) -> CacheService {
    let local = Arc::new(LocalCache::new(cache.local_max_entries));
    let sweeper = local.start_sweeper(cache.sweep_interval());

    if !redis.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return CacheService::new(local, None, cache.default_ttl()).with_task(sweeper);
    }

    tracing::info!(url = %redis.url, "Connecting to Redis");

    let remote = match RemoteCache::connect(redis) {
        Ok(remote) => Arc::new(remote),
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache."
            );
            return CacheService::new(local, None, cache.default_ttl()).with_task(sweeper);
        }
    };

    if remote.check_health().await.is_ready() {
        tracing::info!("Connected to Redis successfully");
    } else {
        tracing::warn!("Redis not reachable yet. Serving from local cache until it is.");
    }

    let monitor = remote.start_health_monitor(redis.health_check_interval());

    CacheService::new(local, Some(remote.into()), cache.default_ttl())
        .with_task(sweeper)
        .with_task(monitor)
}
