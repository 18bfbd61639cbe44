//! Overload protection for a backend application.
//!
//! Wires the fail-open two-tier cache ([`backstop_cache`]) and the workload
//! gates ([`backstop_gate`]) into one [`AppContext`] built from
//! configuration.
//!
//! ```no_run
//! # async fn run() -> Result<(), backstop::ConfigError> {
//! use backstop::GateKind;
//!
//! let (_config, ctx) = backstop::bootstrap(None).await?;
//!
//! let user: Option<String> = ctx.cache().get("user:1").await;
//! if user.is_none() {
//!     let loaded = ctx
//!         .gates()
//!         .run(GateKind::DbRead, async { "Ada".to_string() })
//!         .await
//!         .expect("gate open");
//!     ctx.cache().set("user:1", &loaded).await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod observability;

pub use config::{AppConfig, LoggingConfig, MetricsConfig};
pub use context::AppContext;
pub use error::ConfigError;

pub use backstop_cache::{CacheService, CacheTier};
pub use backstop_gate::{
    BatchError, ConcurrencyGate, GateError, GateKind, GateSet, process_batch,
};

/// Load configuration, install tracing (and metrics when enabled), and build
/// the application context.
pub async fn bootstrap(config_path: Option<&str>) -> Result<(AppConfig, AppContext), ConfigError> {
    let config = config::loader::load_config(config_path)?;

    observability::init_tracing(&config.logging);
    if config.metrics.enabled {
        metrics::init_metrics();
    }

    let ctx = AppContext::from_config(&config).await;
    Ok((config, ctx))
}
