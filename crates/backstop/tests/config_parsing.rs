use std::io::Write;

use backstop::config::loader::{load_config, load_config_with_env};
use backstop::ConfigError;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn test_missing_file_uses_defaults() {
    let config = load_config_with_env(Some("/nonexistent/backstop.toml"), Some(Default::default()))
        .expect("defaults should load");

    assert_eq!(config.cache.default_ttl_secs, 600);
    assert_eq!(config.cache.local_max_entries, 10000);
    assert!(!config.redis.enabled);
    assert_eq!(config.gates.db_read, 50);
    assert_eq!(config.gates.cpu, 2);
}

#[test]
fn test_parses_toml_sections() {
    let file = write_config(
        r#"
[cache]
default_ttl_secs = 120
local_max_entries = 500

[redis]
enabled = true
url = "redis://cache.internal:6380"
pool_size = 4

[gates]
external_api = 3

[logging]
level = "debug"
"#,
    );

    let config = load_config(file.path().to_str()).expect("config should load");

    assert_eq!(config.cache.default_ttl_secs, 120);
    assert_eq!(config.cache.local_max_entries, 500);
    assert_eq!(config.cache.sweep_interval_secs, 60);
    assert!(config.redis.enabled);
    assert_eq!(config.redis.url, "redis://cache.internal:6380");
    assert_eq!(config.redis.pool_size, 4);
    assert_eq!(config.redis.timeout_ms, 5000);
    assert_eq!(config.gates.external_api, 3);
    assert_eq!(config.gates.db_write, 10);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_env_overrides_file() {
    let file = write_config(
        r#"
[gates]
cpu = 4
"#,
    );

    let mut env = config::Map::new();
    env.insert("BACKSTOP__GATES__CPU".to_string(), "8".to_string());
    env.insert("BACKSTOP__REDIS__ENABLED".to_string(), "true".to_string());

    let config = load_config_with_env(file.path().to_str(), Some(env)).expect("config should load");

    assert_eq!(config.gates.cpu, 8);
    assert!(config.redis.enabled);
}

#[test]
fn test_invalid_values_are_rejected() {
    let file = write_config(
        r#"
[gates]
db_read = 0
"#,
    );

    let err = load_config_with_env(file.path().to_str(), Some(Default::default())).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
}

#[test]
fn test_malformed_file_is_a_build_error() {
    let file = write_config("[cache\ndefault_ttl_secs = ");

    let err = load_config_with_env(file.path().to_str(), Some(Default::default())).unwrap_err();
    assert!(matches!(err, ConfigError::Build(_)));
}
