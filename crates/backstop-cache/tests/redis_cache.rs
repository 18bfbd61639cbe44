//! Integration tests for the two-tier cache service.
//!
//! The Redis-backed tests use testcontainers to spin up a real Redis
//! instance and are ignored by default because they need Docker:
//! `cargo test -p backstop-cache -- --ignored`.

use std::time::Duration;

use backstop_cache::{CacheConfig, CacheTier, RedisConfig, create_cache_service};
use serde::{Deserialize, Serialize};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

/// Get or create the shared Redis container
async fn get_redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            let url = format!("redis://127.0.0.1:{}", host_port);

            (container, url)
        })
        .await;

    url.clone()
}

fn redis_config(url: String) -> RedisConfig {
    RedisConfig {
        enabled: true,
        url,
        pool_size: 5,
        timeout_ms: 5000,
        health_check_interval_ms: 200,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Order {
    id: u64,
    lines: Vec<String>,
    total_cents: i64,
}

#[tokio::test]
async fn test_disabled_redis() {
    let config = RedisConfig {
        enabled: false,
        ..RedisConfig::default()
    };

    let cache = create_cache_service(&CacheConfig::default(), &config).await;

    assert_eq!(cache.active_tier(), CacheTier::Local);
    assert!(!cache.stats().remote_configured);
}

#[tokio::test]
async fn test_graceful_degradation_unreachable_redis() {
    let config = RedisConfig {
        enabled: true,
        url: "redis://127.0.0.1:1".to_string(),
        pool_size: 2,
        timeout_ms: 500,
        health_check_interval_ms: 100,
    };

    // Should fall back to the local tier
    let cache = create_cache_service(&CacheConfig::default(), &config).await;
    assert!(!cache.is_remote_active());
    assert!(cache.stats().remote_configured);

    // But should still work as a cache
    let order = Order {
        id: 1,
        lines: vec!["widget".to_string()],
        total_cents: 1999,
    };
    cache.set("order:1", &order).await;
    assert_eq!(cache.get::<Order>("order:1").await, Some(order));

    cache.del("order:1").await;
    assert_eq!(cache.get::<Order>("order:1").await, None);

    // Health probes keep failing in the background without disturbing callers
    tokio::time::sleep(Duration::from_millis(250)).await;
    cache.set("order:2", &2).await;
    assert_eq!(cache.get::<i32>("order:2").await, Some(2));
    assert_eq!(cache.active_tier(), CacheTier::Local);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_cache_connection() {
    let config = redis_config(get_redis_url().await);

    let cache = create_cache_service(&CacheConfig::default(), &config).await;

    assert!(cache.is_remote_active());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_round_trip() {
    let config = redis_config(get_redis_url().await);
    let cache = create_cache_service(&CacheConfig::default(), &config).await;

    let order = Order {
        id: 42,
        lines: vec!["a".to_string(), "b".to_string()],
        total_cents: 500,
    };
    cache.set("it:order:42", &order).await;

    assert_eq!(cache.get::<Order>("it:order:42").await, Some(order));
    // Served from Redis, so the local tier stays empty
    assert!(cache.local().is_empty());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_shared_between_instances() {
    let config = redis_config(get_redis_url().await);

    // Two services simulate two processes sharing one Redis
    let cache1 = create_cache_service(&CacheConfig::default(), &config).await;
    let cache2 = create_cache_service(&CacheConfig::default(), &config).await;

    cache1.set("it:shared", &"hello").await;

    assert_eq!(
        cache2.get::<String>("it:shared").await.as_deref(),
        Some("hello")
    );

    cache2.del("it:shared").await;
    assert_eq!(cache1.get::<String>("it:shared").await, None);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_expiry() {
    let config = redis_config(get_redis_url().await);
    let cache = create_cache_service(&CacheConfig::default(), &config).await;

    cache
        .set_with_ttl("it:expiring", &1, Duration::from_secs(1))
        .await;
    assert_eq!(cache.get::<i32>("it:expiring").await, Some(1));

    tokio::time::sleep(Duration::from_millis(1200)).await;

    assert_eq!(cache.get::<i32>("it:expiring").await, None);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_pattern_delete() {
    let config = redis_config(get_redis_url().await);
    let cache = create_cache_service(&CacheConfig::default(), &config).await;

    cache.set("it:user:1", &1).await;
    cache.set("it:user:2", &2).await;
    cache.set("it:order:1", &3).await;

    cache.del_by_pattern("it:user:*").await;

    assert_eq!(cache.get::<i32>("it:user:1").await, None);
    assert_eq!(cache.get::<i32>("it:user:2").await, None);
    assert_eq!(cache.get::<i32>("it:order:1").await, Some(3));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_pattern_character_set() {
    let config = redis_config(get_redis_url().await);
    let cache = create_cache_service(&CacheConfig::default(), &config).await;

    cache.set("it:shard:1", &1).await;
    cache.set("it:shard:2", &2).await;
    cache.set("it:shard:3", &3).await;

    cache.del_by_pattern("it:shard:[12]").await;

    assert_eq!(cache.get::<i32>("it:shard:1").await, None);
    assert_eq!(cache.get::<i32>("it:shard:2").await, None);
    assert_eq!(cache.get::<i32>("it:shard:3").await, Some(3));
}
