//! File-backed cache storing one JSON document per key

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::cache::backend::{CacheBackend, StoredEntry, current_timestamp};
use crate::cache::error::CacheError;

const FILE_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct FileCache {
    directory: PathBuf,
}

impl FileCache {
    /// Creates a file cache rooted at `directory`.
    /// The directory is created on first write.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, CacheError> {
        if !is_valid_key(key) {
            return Err(CacheError::InvalidKey(key.to_string()));
        }
        Ok(self.directory.join(format!("{}.{}", key, FILE_EXTENSION)))
    }

    fn read_entry(&self, path: &Path) -> Result<Option<StoredEntry>, CacheError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<StoredEntry>(&content) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                // A partially written or foreign file is a cache miss
                warn!("Ignoring unreadable cache file {:?}: {}", path, e);
                Ok(None)
            }
        }
    }
}

/// Keys become file names, so path separators and leading dots are rejected
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn remove_if_exists(path: &Path) -> Result<(), CacheError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl CacheBackend for FileCache {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let path = self.path_for(key)?;
        let Some(entry) = self.read_entry(&path)? else {
            return Ok(None);
        };

        if entry.is_expired(current_timestamp()) {
            debug!("Cache file {:?} expired", path);
            remove_if_exists(&path)?;
            return Ok(None);
        }

        Ok(Some(entry.value))
    }

    fn set(&self, key: &str, value: &Value, lifetime: Option<Duration>) -> Result<(), CacheError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.directory)?;

        let entry = StoredEntry::new(value.clone(), lifetime, current_timestamp());
        let content = serde_json::to_vec(&entry)?;

        // Each writer gets its own temp file; the rename replaces the entry atomically
        let mut tmp = NamedTempFile::new_in(&self.directory)?;
        tmp.write_all(&content)?;
        tmp.persist(&path).map_err(|e| CacheError::Io(e.error))?;

        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        remove_if_exists(&self.path_for(key)?)
    }

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key)?.is_some())
    }

    fn flush(&self) -> Result<(), CacheError> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == FILE_EXTENSION) {
                remove_if_exists(&path)?;
                removed += 1;
            }
        }
        debug!("Flushed {} cache files from {:?}", removed, self.directory);

        Ok(())
    }
}
