//! Composite backend delegating to an ordered list of backends
//!
//! Reads walk the list front to back. A hit further down the chain is copied
//! into every backend in front of it. Writes, deletes and flushes go to all
//! backends.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::backend::CacheBackend;
use crate::cache::error::CacheError;

/// Lifetime applied to values copied into faster backends on a read hit
pub const BACKFILL_LIFETIME: Duration = Duration::from_secs(300);

pub struct ChainedCache<B> {
    backends: Vec<B>,
}

impl<B: CacheBackend> ChainedCache<B> {
    pub fn new(backends: Vec<B>) -> Self {
        Self { backends }
    }

    /// Backends in lookup order
    pub fn backends(&self) -> &[B] {
        &self.backends
    }

    /// Runs `op` on every backend, returning the first error after all ran
    fn for_each_backend(
        &self,
        op: impl Fn(&B) -> Result<(), CacheError>,
    ) -> Result<(), CacheError> {
        let mut first_error = None;
        for (index, backend) in self.backends.iter().enumerate() {
            if let Err(e) = op(backend) {
                warn!("Chained cache backend #{} failed: {}", index, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<B: CacheBackend> CacheBackend for ChainedCache<B> {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        for (index, backend) in self.backends.iter().enumerate() {
            let Some(value) = backend.get(key)? else {
                continue;
            };

            for faster in self.backends[..index].iter().rev() {
                faster.set(key, &value, Some(BACKFILL_LIFETIME))?;
            }
            if index > 0 {
                debug!("Back-filled {} from chained backend #{}", key, index);
            }
            return Ok(Some(value));
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: &Value, lifetime: Option<Duration>) -> Result<(), CacheError> {
        self.for_each_backend(|backend| backend.set(key, value, lifetime))
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.for_each_backend(|backend| backend.delete(key))
    }

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        for backend in &self.backends {
            if backend.has(key)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn flush(&self) -> Result<(), CacheError> {
        self.for_each_backend(|backend| backend.flush())
    }
}
