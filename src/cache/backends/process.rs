//! Process-wide shared cache
//!
//! Every `ProcessCache` handle in the same process reads and writes one shared
//! map, so entries outlive the backend instance that stored them.

use std::sync::OnceLock;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;

use crate::cache::backend::{CacheBackend, StoredEntry, current_timestamp};
use crate::cache::error::CacheError;

static SHARED_ENTRIES: OnceLock<DashMap<String, StoredEntry>> = OnceLock::new();

fn shared_entries() -> &'static DashMap<String, StoredEntry> {
    SHARED_ENTRIES.get_or_init(DashMap::new)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCache;

impl ProcessCache {
    pub fn new() -> Self {
        Self
    }
}

impl CacheBackend for ProcessCache {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let entries = shared_entries();
        let now = current_timestamp();

        // Drop the read guard before removing to avoid deadlocking the shard
        let found = entries.get(key).map(|entry| {
            if entry.is_expired(now) {
                None
            } else {
                Some(entry.value.clone())
            }
        });

        match found {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                entries.remove_if(key, |_, entry| entry.is_expired(now));
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &Value, lifetime: Option<Duration>) -> Result<(), CacheError> {
        let entry = StoredEntry::new(value.clone(), lifetime, current_timestamp());
        shared_entries().insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        shared_entries().remove(key);
        Ok(())
    }

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key)?.is_some())
    }

    fn flush(&self) -> Result<(), CacheError> {
        shared_entries().clear();
        Ok(())
    }
}
