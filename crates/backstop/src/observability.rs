//! Structured logging setup.
//!
//! The level filter sits behind a reload layer so `[logging].level` can be
//! changed while the process runs.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

use crate::config::LoggingConfig;

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `logging.level` when it is set and parses. Returns
/// `false` if another subscriber is already installed, in which case the
/// level cannot be changed later through [`set_log_level`].
pub fn init_tracing(logging: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let (filter, handle) = reload::Layer::new(filter);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok();

    if installed {
        let _ = FILTER_HANDLE.set(handle);
        tracing::debug!(level = %logging.level, "tracing initialized");
    }
    installed
}

/// Replace the active filter with `level` (any `EnvFilter` directive, such
/// as `"debug"` or `"info,backstop_cache=trace"`).
///
/// Returns `false` if [`init_tracing`] did not install the subscriber or the
/// directive does not parse; the previous filter stays in place.
pub fn set_log_level(level: &str) -> bool {
    let Some(handle) = FILTER_HANDLE.get() else {
        return false;
    };
    let filter = match EnvFilter::try_new(level) {
        Ok(filter) => filter,
        Err(e) => {
            tracing::warn!(level = %level, error = %e, "ignoring invalid log level");
            return false;
        }
    };

    match handle.reload(filter) {
        Ok(()) => {
            tracing::info!(level = %level, "log level changed");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "log level reload failed");
            false
        }
    }
}

/// The filter currently in effect, if tracing was initialized here.
pub fn current_log_level() -> Option<String> {
    FILTER_HANDLE
        .get()
        .and_then(|handle| handle.with_current(|filter| filter.to_string()).ok())
}
