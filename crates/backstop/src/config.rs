use backstop_cache::{CacheConfig, RedisConfig};
use backstop_gate::GateConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
///
/// Every section is optional; missing fields take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Local cache and default TTL
    #[serde(default)]
    pub cache: CacheConfig,
    /// Redis (remote cache tier)
    #[serde(default)]
    pub redis: RedisConfig,
    /// Workload gate capacities
    #[serde(default)]
    pub gates: GateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Cache validations
        if self.cache.default_ttl_secs == 0 {
            return Err(ConfigError::validation("cache.default_ttl_secs must be > 0"));
        }
        if self.cache.local_max_entries == 0 {
            return Err(ConfigError::validation("cache.local_max_entries must be > 0"));
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(ConfigError::validation("cache.sweep_interval_secs must be > 0"));
        }
        // Redis validations (only relevant when enabled)
        if self.redis.enabled {
            if self.redis.url.trim().is_empty() {
                return Err(ConfigError::validation("redis.url must not be empty"));
            }
            if self.redis.pool_size == 0 {
                return Err(ConfigError::validation("redis.pool_size must be > 0"));
            }
            if self.redis.timeout_ms == 0 || self.redis.health_check_interval_ms == 0 {
                return Err(ConfigError::validation(
                    "redis timeouts and intervals must be > 0",
                ));
            }
        }
        self.gates.validate().map_err(ConfigError::Validation)?;
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder at bootstrap
    #[serde(default)]
    pub enabled: bool,
}

pub mod loader {
    use super::AppConfig;
    use crate::error::ConfigError;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default config file looked up when no path is given.
    pub const DEFAULT_CONFIG_FILE: &str = "backstop.toml";

    /// Load configuration from an optional TOML file plus `BACKSTOP__*`
    /// environment overrides, then validate it.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
        load_config_with_env(path, None)
    }

    /// Like [`load_config`], reading overrides from `env` instead of the
    /// process environment when given.
    pub fn load_config_with_env(
        path: Option<&str>,
        env: Option<config::Map<String, String>>,
    ) -> Result<AppConfig, ConfigError> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        } else if path.is_some() {
            tracing::warn!(path = %pathbuf.display(), "config file not found, using defaults");
        }
        // Environment variable overrides, e.g., BACKSTOP__REDIS__ENABLED=true
        builder = builder.add_source(
            Environment::with_prefix("BACKSTOP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );
        let merged: AppConfig = builder.build()?.try_deserialize()?;
        merged.validate()?;
        Ok(merged)
    }
}
