use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Unknown cache backend: {0}")]
    UnknownBackend(String),

    #[error("Cache backend '{backend}' requires the '{feature}' feature")]
    BackendUnavailable {
        backend: &'static str,
        feature: &'static str,
    },

    #[error("Cache backend cycle detected: {0}")]
    BackendCycle(String),

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache lock poisoned")]
    LockPoisoned,
}
