//! In-process cache tier backed by `DashMap`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;

use crate::error::{CacheError, CacheResult};
use crate::pattern::KeyPattern;
use crate::store::{CacheStore, CacheTier};

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// A cached entry with optional expiry.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Vec<u8>,
    pub cached_at: Instant,
    /// `None` means the entry never expires.
    pub expires_at: Option<Instant>,
}

impl CachedEntry {
    /// A TTL of zero, or one too large to represent as an `Instant`, never
    /// expires.
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        let cached_at = Instant::now();
        let expires_at = if ttl.is_zero() {
            None
        } else {
            cached_at.checked_add(ttl)
        };
        Self {
            data,
            cached_at,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Local cache statistics.
#[derive(Debug, Clone, Default)]
pub struct LocalCacheStats {
    pub entries: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped because their TTL ran out (lazily or by the sweeper).
    pub expired: u64,
    /// Inserts refused because the cache was full.
    pub rejected: u64,
}

/// In-memory cache with per-entry TTL and an entry-count ceiling.
///
/// Expired entries are removed lazily on read and eagerly by the sweeper
/// started with [`LocalCache::start_sweeper`]. When the ceiling is reached a
/// new key is refused rather than evicting live entries; overwriting an
/// existing key always succeeds.
pub struct LocalCache {
    entries: DashMap<String, CachedEntry>,
    max_entries: usize,
    // Serializes inserts of new keys so the ceiling check and the insert
    // happen as one step
    admission: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    rejected: AtomicU64,
}

impl LocalCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
            admission: Mutex::new(()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Number of held entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys of all live (unexpired) entries.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn clear(&self) {
        self.entries.clear();
        crate::metrics::set_cache_entries(CacheTier::Local.as_str(), 0);
    }

    /// Remove expired entries and return how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.entries.retain(|_, entry| {
            if entry.is_expired_at(now) {
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            self.expired.fetch_add(removed as u64, Ordering::Relaxed);
            crate::metrics::record_expired(removed);
        }
        crate::metrics::set_cache_entries(CacheTier::Local.as_str(), self.entries.len());

        removed
    }

    pub fn stats(&self) -> LocalCacheStats {
        LocalCacheStats {
            entries: self.entries.len(),
            max_entries: self.max_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    /// Start the background expiry sweep.
    ///
    /// The task holds only a weak reference and exits once the cache is
    /// dropped.
    pub fn start_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        let every = every.max(MIN_SWEEP_INTERVAL);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.sweep_expired();
                if removed > 0 {
                    tracing::debug!(removed = removed, "local cache sweep completed");
                }
            }
        })
    }

    fn get_live(&self, key: &str) -> Option<Vec<u8>> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                return Some(entry.data.clone());
            }
            // Entry expired, remove it unless it was replaced meanwhile
            drop(entry);
            if self
                .entries
                .remove_if(key, |_, entry| entry.is_expired())
                .is_some()
            {
                self.expired.fetch_add(1, Ordering::Relaxed);
            }
        }
        None
    }

    fn insert(&self, key: &str, entry: CachedEntry) -> CacheResult<()> {
        // Overwrites happen under the shard lock and never change the count
        if let Some(mut existing) = self.entries.get_mut(key) {
            *existing = entry;
            return Ok(());
        }

        let _admission = self
            .admission
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            self.sweep_expired();

            if self.entries.len() >= self.max_entries {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                return Err(CacheError::CapacityExceeded {
                    max_entries: self.max_entries,
                });
            }
        }

        self.entries.insert(key.to_string(), entry);
        Ok(())
    }
}

#[async_trait]
impl CacheStore for LocalCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let result = self.get_live(key);
        if result.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(result)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        self.insert(key, CachedEntry::new(value, ttl))
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn del_by_pattern(&self, pattern: &str) -> CacheResult<usize> {
        let matcher = KeyPattern::new(pattern)?;
        let matching: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| matcher.matches(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in matching {
            if self.entries.remove(&key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn tier(&self) -> CacheTier {
        CacheTier::Local
    }
}
