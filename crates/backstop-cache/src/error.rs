use thiserror::Error;

/// Errors raised by the individual cache backends.
///
/// These never reach callers of [`crate::CacheService`]; the service logs them
/// and degrades to a miss or a no-op.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("Redis pool creation error: {0}")]
    PoolCreation(#[from] deadpool_redis::CreatePoolError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Local cache is full ({max_entries} entries)")]
    CapacityExceeded { max_entries: usize },

    #[error("Invalid key pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl CacheError {
    /// Check if this error came from the remote tier's transport.
    ///
    /// Transport errors are what flip the remote backend to unhealthy;
    /// serialization or capacity errors say nothing about connectivity.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Pool(_) | Self::PoolCreation(_) => true,
            Self::Redis(e) => {
                e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
            }
            _ => false,
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
