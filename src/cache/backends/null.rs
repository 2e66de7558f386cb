//! Backend that stores nothing

use std::time::Duration;

use serde_json::Value;

use crate::cache::backend::CacheBackend;
use crate::cache::error::CacheError;

#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

impl CacheBackend for NullCache {
    fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &Value, _lifetime: Option<Duration>) -> Result<(), CacheError> {
        Ok(())
    }

    fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }

    fn has(&self, _key: &str) -> Result<bool, CacheError> {
        Ok(false)
    }

    fn flush(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
