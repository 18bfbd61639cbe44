//! Start-up through `bootstrap`: tracing, Prometheus recorder and context.
//!
//! The subscriber and the metrics recorder are process-global, so everything
//! that depends on them lives in one test.

use std::io::Write;

use backstop::{GateKind, metrics, observability};

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[tokio::test]
async fn test_bootstrap_installs_tracing_and_metrics() {
    // Nothing to reload before a subscriber is installed
    assert!(!observability::set_log_level("debug"));
    assert_eq!(metrics::render_metrics(), None);

    let file = write_config(
        r#"
[logging]
level = "warn"

[metrics]
enabled = true
"#,
    );

    let (config, ctx) = backstop::bootstrap(file.path().to_str())
        .await
        .expect("bootstrap should succeed");
    assert!(config.metrics.enabled);

    // Some traffic through both the cache and a gate
    ctx.cache().set("user:1", &"Ada").await;
    assert_eq!(
        ctx.cache().get::<String>("user:1").await.as_deref(),
        Some("Ada")
    );
    assert_eq!(ctx.cache().get::<String>("user:2").await, None);
    let rows = ctx
        .gates()
        .run(GateKind::DbRead, async { vec![1, 2, 3] })
        .await
        .expect("gate open");
    assert_eq!(rows.len(), 3);

    let rendered = metrics::render_metrics().expect("recorder installed");
    assert!(rendered.contains("cache_hits_total"), "{rendered}");
    assert!(rendered.contains("cache_misses_total"), "{rendered}");
    assert!(rendered.contains("gate_in_flight"), "{rendered}");
    assert!(rendered.contains("gate_wait_seconds"), "{rendered}");

    // A second install is refused and keeps the first handle
    assert!(!metrics::init_metrics());
    assert!(metrics::render_metrics().is_some());

    // The level can be changed at runtime
    assert!(observability::set_log_level("debug"));
    assert_eq!(observability::current_log_level().as_deref(), Some("debug"));

    // An unparsable directive leaves the filter alone
    assert!(!observability::set_log_level("info,backstop=loudest"));
    assert_eq!(observability::current_log_level().as_deref(), Some("debug"));

    ctx.shutdown();
}
