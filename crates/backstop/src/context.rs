use std::sync::Arc;

use backstop_cache::{CacheService, create_cache_service};
use backstop_gate::GateSet;

use crate::config::AppConfig;

/// The cache and gates shared by every consumer in the process.
///
/// Built once at start-up and handed to consumers explicitly; cloning is
/// cheap and shares the same instances.
#[derive(Clone)]
pub struct AppContext {
    cache: Arc<CacheService>,
    gates: Arc<GateSet>,
}

impl AppContext {
    pub fn new(cache: Arc<CacheService>, gates: Arc<GateSet>) -> Self {
        Self { cache, gates }
    }

    /// Build the cache service and gates described by `config`.
    pub async fn from_config(config: &AppConfig) -> Self {
        let cache = create_cache_service(&config.cache, &config.redis).await;
        let gates = GateSet::from_config(&config.gates);

        tracing::info!(
            cache_tier = %cache.active_tier(),
            db_read = config.gates.db_read,
            db_write = config.gates.db_write,
            external_api = config.gates.external_api,
            cpu = config.gates.cpu,
            "backstop context ready"
        );

        Self::new(Arc::new(cache), Arc::new(gates))
    }

    pub fn cache(&self) -> &Arc<CacheService> {
        &self.cache
    }

    pub fn gates(&self) -> &Arc<GateSet> {
        &self.gates
    }

    /// Stop admitting new gated work. Running tasks finish normally.
    pub fn shutdown(&self) {
        self.gates.close_all();
        tracing::info!("backstop context shut down");
    }
}
