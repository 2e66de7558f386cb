//! Backend trait shared by every cache implementation

use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::error::CacheError;

/// Key/value storage contract implemented by all cache backends
#[cfg_attr(test, automock)]
pub trait CacheBackend: Send + Sync {
    /// Returns the value stored under `key`, or `None` if missing or expired
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Stores `value` under `key`. A `None` or zero lifetime means the entry never expires.
    fn set(&self, key: &str, value: &Value, lifetime: Option<Duration>) -> Result<(), CacheError>;

    fn delete(&self, key: &str) -> Result<(), CacheError>;

    fn has(&self, key: &str) -> Result<bool, CacheError>;

    /// Removes every entry held by the backend
    fn flush(&self) -> Result<(), CacheError>;
}

/// Value plus its absolute expiry, as kept by the local backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: Value,
    /// Expiry as epoch seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl StoredEntry {
    /// A lifetime reaching past `i64::MAX` epoch seconds never expires
    pub fn new(value: Value, lifetime: Option<Duration>, now: i64) -> Self {
        Self {
            value,
            expires_at: lifetime.filter(|l| !l.is_zero()).and_then(|l| {
                i64::try_from(l.as_secs())
                    .ok()
                    .and_then(|secs| now.checked_add(secs))
            }),
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Current time in seconds since UNIX epoch
pub(crate) fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
