//! Request-scoped cache loaded in one read and persisted in one write

use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::cache::backend::CacheBackend;
use crate::cache::error::CacheError;

/// Lifetime of the persisted eager cache document (12 hours)
pub const EAGER_CACHE_LIFETIME: Duration = Duration::from_secs(43200);

/// Kind of request the eager cache is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestContext {
    Tracker,
    Ui,
}

impl RequestContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestContext::Tracker => "tracker",
            RequestContext::Ui => "ui",
        }
    }
}

/// Storage id for the eager cache of `version`, e.g. `eagercache-300b1-ui`
pub fn eager_cache_id(version: &str, context: RequestContext) -> String {
    let compact: String = version.chars().filter(|c| !matches!(c, '.' | '-')).collect();
    format!("eagercache-{}-{}", compact, context.as_str())
}

pub struct EagerCache<B: CacheBackend> {
    storage: B,
    storage_id: String,
    entries: Map<String, Value>,
    changed: bool,
}

impl<B: CacheBackend> EagerCache<B> {
    /// Loads every entry stored under `storage_id` from `storage`.
    pub fn new(storage: B, storage_id: impl Into<String>) -> Result<Self, CacheError> {
        let storage_id = storage_id.into();

        let entries = match storage.get(&storage_id)? {
            Some(Value::Object(entries)) => entries,
            Some(_) => {
                warn!("Discarding malformed eager cache {}", storage_id);
                Map::new()
            }
            None => Map::new(),
        };
        debug!("Loaded {} eager cache entries from {}", entries.len(), storage_id);

        Ok(Self {
            storage,
            storage_id,
            entries,
            changed: false,
        })
    }

    pub fn fetch(&self, id: &str) -> Option<&Value> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn save(&mut self, id: &str, value: Value) {
        self.entries.insert(id.to_string(), value);
        self.changed = true;
    }

    pub fn delete(&mut self, id: &str) {
        if self.entries.remove(id).is_some() {
            self.changed = true;
        }
    }

    pub fn flush(&mut self) {
        self.entries.clear();
        self.changed = true;
    }

    pub fn has_changed(&self) -> bool {
        self.changed
    }

    /// Writes the entries back to storage if anything changed since loading.
    /// Returns whether a write happened.
    pub fn persist_cache_if_needed(&mut self, lifetime: Duration) -> Result<bool, CacheError> {
        if !self.changed {
            return Ok(false);
        }

        let document = Value::Object(self.entries.clone());
        self.storage.set(&self.storage_id, &document, Some(lifetime))?;
        self.changed = false;
        debug!(
            "Persisted {} eager cache entries to {}",
            self.entries.len(),
            self.storage_id
        );

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::backend::MockCacheBackend;
    use crate::cache::backends::ArrayCache;
    use mockall::predicate::eq;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("3.0.0", RequestContext::Ui, "eagercache-300-ui")]
    #[case("3.0.0-b1", RequestContext::Tracker, "eagercache-300b1-tracker")]
    #[case("2.16.5-rc2", RequestContext::Ui, "eagercache-2165rc2-ui")]
    fn eager_cache_id_strips_separators(
        #[case] version: &str,
        #[case] context: RequestContext,
        #[case] expected: &str,
    ) {
        assert_eq!(eager_cache_id(version, context), expected);
    }

    #[test]
    fn new_loads_existing_entries() {
        let storage = ArrayCache::new();
        storage
            .set("eager", &json!({"a": 1, "b": "two"}), None)
            .unwrap();

        let cache = EagerCache::new(storage, "eager").unwrap();

        assert_eq!(cache.fetch("a"), Some(&json!(1)));
        assert!(cache.contains("b"));
        assert!(!cache.has_changed());
    }

    #[test]
    fn new_discards_non_object_document() {
        let storage = ArrayCache::new();
        storage.set("eager", &json!("garbage"), None).unwrap();

        let cache = EagerCache::new(storage, "eager").unwrap();

        assert!(!cache.contains("garbage"));
    }

    #[test]
    fn persist_writes_only_after_changes() {
        let mut storage = MockCacheBackend::new();
        storage.expect_get().times(1).returning(|_| Ok(None));
        storage
            .expect_set()
            .with(
                eq("eager"),
                eq(json!({"segment": [1, 2]})),
                eq(Some(EAGER_CACHE_LIFETIME)),
            )
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut cache = EagerCache::new(storage, "eager").unwrap();
        assert!(!cache.persist_cache_if_needed(EAGER_CACHE_LIFETIME).unwrap());

        cache.save("segment", json!([1, 2]));
        assert!(cache.persist_cache_if_needed(EAGER_CACHE_LIFETIME).unwrap());

        // Nothing changed since the last write
        assert!(!cache.persist_cache_if_needed(EAGER_CACHE_LIFETIME).unwrap());
    }

    #[test]
    fn persisted_entries_are_visible_to_next_request() {
        let mut cache = EagerCache::new(ArrayCache::new(), "eager").unwrap();
        cache.save("x", json!(true));
        cache.persist_cache_if_needed(EAGER_CACHE_LIFETIME).unwrap();

        let EagerCache { storage, .. } = cache;
        let next = EagerCache::new(storage, "eager").unwrap();

        assert_eq!(next.fetch("x"), Some(&json!(true)));
    }

    #[test]
    fn delete_of_missing_entry_does_not_mark_changed() {
        let mut cache = EagerCache::new(ArrayCache::new(), "eager").unwrap();

        cache.delete("missing");

        assert!(!cache.has_changed());
    }

    #[test]
    fn flush_clears_entries_and_marks_changed() {
        let storage = ArrayCache::new();
        storage.set("eager", &json!({"a": 1}), None).unwrap();
        let mut cache = EagerCache::new(storage, "eager").unwrap();

        cache.flush();

        assert!(!cache.contains("a"));
        assert!(cache.has_changed());
    }
}
