//! Redis cache tier with a live connection health state.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use redis::AsyncCommands;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::RedisConfig;
use crate::error::{CacheError, CacheResult};
use crate::store::{CacheStore, CacheTier};

/// Connection state of the remote tier as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteHealth {
    /// No probe has completed yet.
    Connecting,
    /// The last probe or command succeeded.
    Ready,
    /// The last probe or command failed at the transport level.
    Failed,
}

impl RemoteHealth {
    pub fn is_ready(&self) -> bool {
        matches!(self, RemoteHealth::Ready)
    }
}

/// Redis-backed cache store.
///
/// Creating the store does not touch the network: the pool connects lazily
/// and connectivity is discovered by [`RemoteCache::check_health`], usually
/// driven by [`RemoteCache::start_health_monitor`]. Every state change is
/// published on a watch channel so consumers can follow reconnections.
pub struct RemoteCache {
    pool: Pool,
    url: String,
    health: watch::Sender<RemoteHealth>,
}

impl RemoteCache {
    /// Build the connection pool for `config.url`.
    pub fn connect(config: &RedisConfig) -> CacheResult<Self> {
        let mut redis_config = deadpool_redis::Config::from_url(&config.url);
        let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
        pool_config.timeouts.wait = Some(config.timeout());
        pool_config.timeouts.create = Some(config.timeout());
        pool_config.timeouts.recycle = Some(config.timeout());
        redis_config.pool = Some(pool_config);

        let pool = redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1))?;
        let (health, _) = watch::channel(RemoteHealth::Connecting);

        Ok(Self {
            pool,
            url: config.url.clone(),
            health,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn health(&self) -> RemoteHealth {
        *self.health.borrow()
    }

    /// Subscribe to health changes.
    pub fn subscribe(&self) -> watch::Receiver<RemoteHealth> {
        self.health.subscribe()
    }

    /// Round-trip a `PING` to the server.
    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    /// Probe the server and publish the outcome.
    pub async fn check_health(&self) -> RemoteHealth {
        match self.ping().await {
            Ok(()) => self.mark_ready(),
            Err(e) => self.mark_failed(&e),
        }
        self.health()
    }

    /// Start probing the server every `every`.
    ///
    /// The first probe runs after one period; callers wanting an immediate
    /// answer await [`RemoteCache::check_health`] first. The task holds only a
    /// weak reference and exits once the cache is dropped.
    pub fn start_health_monitor(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        let every = every.max(Duration::from_millis(10));

        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + every;
            let mut interval = tokio::time::interval_at(start, every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let Some(cache) = cache.upgrade() else {
                    break;
                };
                cache.check_health().await;
            }
        })
    }

    fn mark_ready(&self) {
        let changed = self.health.send_if_modified(|state| {
            if *state == RemoteHealth::Ready {
                return false;
            }
            *state = RemoteHealth::Ready;
            true
        });
        if changed {
            tracing::info!(url = %self.url, "Redis connection ready");
        }
    }

    fn mark_failed(&self, error: &CacheError) {
        let changed = self.health.send_if_modified(|state| {
            if *state == RemoteHealth::Failed {
                return false;
            }
            *state = RemoteHealth::Failed;
            true
        });
        if changed {
            tracing::warn!(url = %self.url, error = %error, "Redis connection failed");
        }
    }

    async fn conn(&self) -> CacheResult<Connection> {
        self.pool.get().await.map_err(|e| self.observe(e.into()))
    }

    /// Flip health to failed for transport errors, then hand the error back.
    fn observe(&self, error: CacheError) -> CacheError {
        if error.is_connection_error() {
            self.mark_failed(&error);
        }
        error
    }
}

#[async_trait]
impl CacheStore for RemoteCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.conn().await?;
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(|e| self.observe(e.into()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        let result = if ttl.is_zero() {
            conn.set::<_, _, ()>(key, value).await
        } else {
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
            conn.pset_ex::<_, _, ()>(key, value, millis).await
        };
        result.map_err(|e| self.observe(e.into()))
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| self.observe(e.into()))
    }

    async fn del_by_pattern(&self, pattern: &str) -> CacheResult<usize> {
        let mut conn = self.conn().await?;
        let keys: Vec<String> = conn
            .keys(pattern)
            .await
            .map_err(|e| self.observe(e.into()))?;

        if keys.is_empty() {
            return Ok(0);
        }

        conn.del::<_, usize>(&keys)
            .await
            .map_err(|e| self.observe(e.into()))
    }

    fn tier(&self) -> CacheTier {
        CacheTier::Remote
    }
}
