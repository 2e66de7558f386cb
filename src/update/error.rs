use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Option store lock poisoned")]
    LockPoisoned,
}

/// Errors surfaced by update checks.
/// Network failures are never reported; they degrade to an unknown version.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Option store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
