use std::time::Duration;

use backstop::{AppConfig, AppContext, CacheTier, GateError, GateKind, process_batch};

#[tokio::test]
async fn test_context_from_default_config() {
    let ctx = AppContext::from_config(&AppConfig::default()).await;

    assert_eq!(ctx.cache().active_tier(), CacheTier::Local);
    assert_eq!(ctx.gates().get(GateKind::DbRead).capacity(), 50);
    assert_eq!(ctx.gates().get(GateKind::DbWrite).capacity(), 10);
    assert_eq!(ctx.gates().get(GateKind::ExternalApi).capacity(), 5);
    assert_eq!(ctx.gates().get(GateKind::Cpu).capacity(), 2);
}

#[tokio::test]
async fn test_clones_share_instances() {
    let ctx = AppContext::from_config(&AppConfig::default()).await;
    let other = ctx.clone();

    ctx.cache().set("shared", &"value").await;

    assert_eq!(
        other.cache().get::<String>("shared").await.as_deref(),
        Some("value")
    );
}

#[tokio::test]
async fn test_read_through_with_gate() {
    let ctx = AppContext::from_config(&AppConfig::default()).await;

    async fn load_user(ctx: &AppContext, id: u32) -> String {
        let key = format!("user:{id}");
        if let Some(hit) = ctx.cache().get::<String>(&key).await {
            return hit;
        }
        let loaded = ctx
            .gates()
            .run(GateKind::DbRead, async move { format!("user-{id}") })
            .await
            .unwrap();
        ctx.cache()
            .set_with_ttl(&key, &loaded, Duration::from_secs(30))
            .await;
        loaded
    }

    assert_eq!(load_user(&ctx, 1).await, "user-1");
    assert_eq!(load_user(&ctx, 1).await, "user-1");

    let stats = ctx.cache().stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn test_batch_writes_invalidate_by_pattern() {
    let ctx = AppContext::from_config(&AppConfig::default()).await;
    for id in 1..=4 {
        ctx.cache().set(&format!("user:{id}"), &id).await;
    }
    ctx.cache().set("order:1", &1).await;

    let gates = ctx.gates().clone();
    let written = process_batch(1..=4u32, 2, |chunk: Vec<u32>| {
        let gates = gates.clone();
        async move { gates.run(GateKind::DbWrite, async move { chunk }).await }
    })
    .await
    .unwrap();
    assert_eq!(written, vec![1, 2, 3, 4]);

    ctx.cache().del_by_pattern("user:*").await;

    assert_eq!(ctx.cache().get::<u32>("user:1").await, None);
    assert_eq!(ctx.cache().get::<u32>("order:1").await, Some(1));
}

#[tokio::test]
async fn test_shutdown_closes_gates() {
    let ctx = AppContext::from_config(&AppConfig::default()).await;
    ctx.shutdown();

    assert_eq!(
        ctx.gates().run(GateKind::Cpu, async {}).await,
        Err(GateError::Closed(GateKind::Cpu))
    );
}
