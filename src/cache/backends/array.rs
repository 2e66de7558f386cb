//! In-memory backend scoped to a single instance

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;

use crate::cache::backend::{CacheBackend, StoredEntry, current_timestamp};
use crate::cache::error::CacheError;

#[derive(Debug, Default)]
pub struct ArrayCache {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl ArrayCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_entries(&self) -> Result<MutexGuard<'_, HashMap<String, StoredEntry>>, CacheError> {
        self.entries.lock().map_err(|_| CacheError::LockPoisoned)
    }
}

impl CacheBackend for ArrayCache {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now = current_timestamp();
        let mut entries = self.lock_entries()?;

        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &Value, lifetime: Option<Duration>) -> Result<(), CacheError> {
        let entry = StoredEntry::new(value.clone(), lifetime, current_timestamp());
        self.lock_entries()?.insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.lock_entries()?.remove(key);
        Ok(())
    }

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key)?.is_some())
    }

    fn flush(&self) -> Result<(), CacheError> {
        self.lock_entries()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_then_get_returns_value() {
        let cache = ArrayCache::new();

        cache.set("answer", &json!({"n": 42}), None).unwrap();

        assert_eq!(cache.get("answer").unwrap(), Some(json!({"n": 42})));
        assert!(cache.has("answer").unwrap());
    }

    #[test]
    fn get_returns_none_for_missing_key() {
        let cache = ArrayCache::new();

        assert_eq!(cache.get("missing").unwrap(), None);
        assert!(!cache.has("missing").unwrap());
    }

    #[test]
    fn delete_removes_entry() {
        let cache = ArrayCache::new();
        cache.set("key", &json!(1), None).unwrap();

        cache.delete("key").unwrap();

        assert!(!cache.has("key").unwrap());
    }

    #[test]
    fn flush_removes_all_entries() {
        let cache = ArrayCache::new();
        cache.set("a", &json!(1), None).unwrap();
        cache.set("b", &json!(2), None).unwrap();

        cache.flush().unwrap();

        assert!(!cache.has("a").unwrap());
        assert!(!cache.has("b").unwrap());
    }

    #[test]
    fn expired_entry_reads_as_missing() {
        let cache = ArrayCache::new();
        cache
            .lock_entries()
            .unwrap()
            .insert(
                "stale".to_string(),
                StoredEntry {
                    value: json!("old"),
                    expires_at: Some(current_timestamp() - 1),
                },
            );

        assert_eq!(cache.get("stale").unwrap(), None);
        assert!(cache.lock_entries().unwrap().is_empty());
    }

    #[test]
    fn huge_lifetime_keeps_entry() {
        let cache = ArrayCache::new();

        cache
            .set("key", &json!(1), Some(Duration::from_secs(u64::MAX)))
            .unwrap();

        assert_eq!(cache.get("key").unwrap(), Some(json!(1)));
    }

    #[test]
    fn instances_do_not_share_entries() {
        let first = ArrayCache::new();
        let second = ArrayCache::new();

        first.set("key", &json!("value"), None).unwrap();

        assert!(!second.has("key").unwrap());
    }
}
