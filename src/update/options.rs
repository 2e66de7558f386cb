//! Persistent key/value option storage

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

#[cfg(test)]
use mockall::automock;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::update::error::StoreError;

/// Trait for reading and writing named options
#[cfg_attr(test, automock)]
pub trait OptionStore: Send + Sync + 'static {
    /// Get the value of an option, `None` if it was never set
    fn get(&self, name: &str) -> Result<Option<String>, StoreError>;

    /// Create or overwrite an option.
    /// Autoloaded options are read in bulk on first access.
    fn set(&self, name: &str, value: &str, autoload: bool) -> Result<(), StoreError>;

    fn delete(&self, name: &str) -> Result<(), StoreError>;

    /// All options flagged for autoloading
    fn autoloaded(&self) -> Result<HashMap<String, String>, StoreError>;
}

/// SQLite-backed option store
pub struct SqliteOptionStore {
    conn: Mutex<Connection>,
    /// Autoloaded options, filled on first read
    autoload_cache: Mutex<Option<HashMap<String, String>>>,
}

impl SqliteOptionStore {
    pub fn new(db_path: &Path) -> Result<Self, StoreError> {
        info!("Initializing option store at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode so concurrent processes can read while one writes
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let store = Self {
            conn: Mutex::new(conn),
            autoload_cache: Mutex::new(None),
        };

        store.create_schema()?;
        debug!("Option store initialized");

        Ok(store)
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn lock_autoload_cache(
        &self,
    ) -> Result<MutexGuard<'_, Option<HashMap<String, String>>>, StoreError> {
        self.autoload_cache
            .lock()
            .map_err(|_| StoreError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS options (
                option_name TEXT PRIMARY KEY,
                option_value TEXT NOT NULL,
                autoload INTEGER NOT NULL DEFAULT 1
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_option_autoload ON options(autoload)",
            [],
        )?;

        Ok(())
    }

    fn load_autoloaded(&self) -> Result<HashMap<String, String>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt =
            conn.prepare("SELECT option_name, option_value FROM options WHERE autoload = 1")?;

        let options = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<HashMap<String, String>, _>>()?;
        debug!("Autoloaded {} options", options.len());

        Ok(options)
    }
}

impl OptionStore for SqliteOptionStore {
    fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        let autoloaded = self.autoloaded()?;
        if let Some(value) = autoloaded.get(name) {
            return Ok(Some(value.clone()));
        }

        let conn = self.lock_conn()?;
        let value = conn
            .query_row(
                "SELECT option_value FROM options WHERE option_name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    fn set(&self, name: &str, value: &str, autoload: bool) -> Result<(), StoreError> {
        {
            let conn = self.lock_conn()?;
            conn.execute(
                r#"
                INSERT INTO options (option_name, option_value, autoload)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(option_name) DO UPDATE SET
                    option_value = excluded.option_value,
                    autoload = excluded.autoload
                "#,
                (name, value, autoload),
            )?;
        }

        if let Some(cache) = self.lock_autoload_cache()?.as_mut() {
            if autoload {
                cache.insert(name.to_string(), value.to_string());
            } else {
                cache.remove(name);
            }
        }

        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.lock_conn()?
            .execute("DELETE FROM options WHERE option_name = ?1", [name])?;

        if let Some(cache) = self.lock_autoload_cache()?.as_mut() {
            cache.remove(name);
        }

        Ok(())
    }

    fn autoloaded(&self) -> Result<HashMap<String, String>, StoreError> {
        if let Some(cache) = self.lock_autoload_cache()?.as_ref() {
            return Ok(cache.clone());
        }

        let loaded = self.load_autoloaded()?;
        *self.lock_autoload_cache()? = Some(loaded.clone());

        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(temp_dir: &TempDir) -> SqliteOptionStore {
        SqliteOptionStore::new(&temp_dir.path().join("options.db")).unwrap()
    }

    #[test]
    fn get_returns_none_for_unknown_option() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn set_then_get_returns_value() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        store.set("UpdateCheck_LatestVersion", "3.1.0", false).unwrap();

        assert_eq!(
            store.get("UpdateCheck_LatestVersion").unwrap(),
            Some("3.1.0".to_string())
        );
    }

    #[test]
    fn set_overwrites_existing_value() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        store.set("name", "first", true).unwrap();

        store.set("name", "second", true).unwrap();

        assert_eq!(store.get("name").unwrap(), Some("second".to_string()));
    }

    #[test]
    fn autoloaded_contains_only_autoload_options() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        store.set("auto", "1", true).unwrap();
        store.set("manual", "2", false).unwrap();

        let autoloaded = store.autoloaded().unwrap();

        assert_eq!(autoloaded.get("auto"), Some(&"1".to_string()));
        assert!(!autoloaded.contains_key("manual"));
    }

    #[test]
    fn autoload_cache_follows_writes_after_first_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        store.set("flag", "old", true).unwrap();
        store.autoloaded().unwrap();

        store.set("flag", "new", true).unwrap();
        store.set("other", "x", true).unwrap();

        let autoloaded = store.autoloaded().unwrap();
        assert_eq!(autoloaded.get("flag"), Some(&"new".to_string()));
        assert_eq!(autoloaded.get("other"), Some(&"x".to_string()));
    }

    #[test]
    fn switching_autoload_off_removes_from_autoload_cache() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        store.set("flag", "1", true).unwrap();
        store.autoloaded().unwrap();

        store.set("flag", "2", false).unwrap();

        assert!(!store.autoloaded().unwrap().contains_key("flag"));
        assert_eq!(store.get("flag").unwrap(), Some("2".to_string()));
    }

    #[test]
    fn delete_removes_option() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        store.set("flag", "1", true).unwrap();
        store.autoloaded().unwrap();

        store.delete("flag").unwrap();

        assert_eq!(store.get("flag").unwrap(), None);
    }

    #[test]
    fn options_persist_across_store_instances() {
        let temp_dir = TempDir::new().unwrap();
        store_in(&temp_dir)
            .set("UpdateCheck_LastTimeChecked", "1700000000", true)
            .unwrap();

        let reopened = store_in(&temp_dir);

        assert_eq!(
            reopened.get("UpdateCheck_LastTimeChecked").unwrap(),
            Some("1700000000".to_string())
        );
    }
}
