//! Cache metrics recorded through the `metrics` facade.
//!
//! Nothing is exported unless the application installs a recorder
//! (see `backstop::metrics::init_metrics`).

use metrics::{counter, gauge};

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
    pub const CACHE_ERRORS_TOTAL: &str = "cache_errors_total";
    pub const CACHE_ENTRIES: &str = "cache_entries";
    pub const CACHE_EXPIRED_TOTAL: &str = "cache_expired_total";
    pub const CACHE_BACKEND_SWITCHES_TOTAL: &str = "cache_backend_switches_total";
}

/// Record a cache hit.
pub fn record_cache_hit(tier: &str) {
    counter!(names::CACHE_HITS_TOTAL, "tier" => tier.to_string()).increment(1);
}

/// Record a cache miss.
pub fn record_cache_miss(tier: &str) {
    counter!(names::CACHE_MISSES_TOTAL, "tier" => tier.to_string()).increment(1);
}

/// Record a swallowed backend error.
pub fn record_cache_error(tier: &str, operation: &'static str) {
    counter!(
        names::CACHE_ERRORS_TOTAL,
        "tier" => tier.to_string(),
        "operation" => operation
    )
    .increment(1);
}

/// Set the number of cache entries.
pub fn set_cache_entries(tier: &str, count: usize) {
    gauge!(names::CACHE_ENTRIES, "tier" => tier.to_string()).set(count as f64);
}

/// Record entries removed by the expiry sweep.
pub fn record_expired(count: usize) {
    counter!(names::CACHE_EXPIRED_TOTAL).increment(count as u64);
}

/// Record the active backend changing.
pub fn record_backend_switch(to: &str) {
    counter!(names::CACHE_BACKEND_SWITCHES_TOTAL, "to" => to.to_string()).increment(1);
}
