use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

// =============================================================================
// Defaults
// =============================================================================

/// Base URL of the API service queried for the latest stable version
pub const DEFAULT_API_SERVICE_URL: &str = "https://api.piwik.org";

/// Base URL of the build server hosting archives and beta markers
pub const DEFAULT_BUILDS_URL: &str = "http://builds.piwik.org";

/// Backend used when the settings do not name one
pub const DEFAULT_CACHE_BACKEND: &str = "chained";

/// Default timezone reported to the update service
pub const DEFAULT_TIMEZONE: &str = "UTC";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Top-level settings structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub general: GeneralConfig,
    pub cache: CacheConfig,
    pub chained_cache: ChainedCacheConfig,
    pub redis_cache: RedisCacheConfig,
    pub paths: PathsConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneralConfig {
    pub enable_auto_update: bool,
    /// Raw release channel name; invalid values fall back to `latest_stable`
    pub release_channel: Option<String>,
    pub api_service_url: String,
    pub builds_url: String,
    pub instance_id: Option<String>,
    pub default_timezone: String,
    /// Public URL of this instance, reported with update checks
    pub current_url: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enable_auto_update: true,
            release_channel: None,
            api_service_url: DEFAULT_API_SERVICE_URL.to_string(),
            builds_url: DEFAULT_BUILDS_URL.to_string(),
            instance_id: None,
            default_timezone: DEFAULT_TIMEZONE.to_string(),
            current_url: None,
        }
    }
}

/// Cache backend selection
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: Option<String>,
}

impl CacheConfig {
    pub fn backend_name(&self) -> &str {
        self.backend.as_deref().unwrap_or(DEFAULT_CACHE_BACKEND)
    }
}

/// Backends composed by the chained cache, in lookup order
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChainedCacheConfig {
    pub backends: Vec<String>,
}

impl Default for ChainedCacheConfig {
    fn default() -> Self {
        Self {
            backends: vec!["array".to_string(), "file".to_string()],
        }
    }
}

/// Connection settings for the distributed cache
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RedisCacheConfig {
    pub host: String,
    pub port: u16,
    /// Connection timeout in seconds, 0 disables it
    pub timeout: f64,
    pub password: String,
    pub database: i64,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            timeout: 0.0,
            password: String::new(),
            database: 14,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub root: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self { root: data_dir() }
    }
}

impl Settings {
    /// Loads settings from a JSON file.
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Config file {:?} not found, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let settings = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded settings from {:?}", path);

        Ok(settings)
    }

    /// Temporary directory, scoped by instance id when one is configured.
    pub fn tmp_path(&self) -> PathBuf {
        let tmp = self.paths.root.join("tmp");
        match self.general.instance_id.as_deref() {
            Some(id) if !id.is_empty() => tmp.join(id),
            _ => tmp,
        }
    }

    /// Directory used by the file cache backend.
    pub fn file_cache_path(&self) -> PathBuf {
        self.tmp_path().join("cache").join("tracker")
    }
}

/// Returns the path to the data directory for piwik-kernel.
/// Uses $XDG_DATA_HOME/piwik-kernel if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/piwik-kernel,
/// or ./piwik-kernel if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the default settings file.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Returns the path to the option database.
pub fn options_db_path() -> PathBuf {
    data_dir().join("options.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("piwik-kernel.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("piwik-kernel")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn settings_from_partial_object_uses_defaults_for_missing_fields() {
        let result = serde_json::from_value::<Settings>(json!({
            "general": {
                "releaseChannel": "latest_beta"
            }
        }))
        .unwrap();

        assert_eq!(
            result.general.release_channel.as_deref(),
            Some("latest_beta")
        );
        assert!(result.general.enable_auto_update);
        assert_eq!(result.general.api_service_url, DEFAULT_API_SERVICE_URL);
        assert_eq!(result.cache.backend_name(), "chained");
        assert_eq!(result.chained_cache.backends, vec!["array", "file"]);
        assert_eq!(result.redis_cache, RedisCacheConfig::default());
    }

    #[test]
    fn settings_from_full_object_parses_all_sections() {
        let result = serde_json::from_value::<Settings>(json!({
            "general": {
                "enableAutoUpdate": false,
                "releaseChannel": "2x_stable",
                "apiServiceUrl": "http://api.local",
                "buildsUrl": "http://builds.local",
                "instanceId": "tenant1",
                "defaultTimezone": "Europe/Paris",
                "currentUrl": "https://stats.example.com/"
            },
            "cache": { "backend": "file" },
            "chainedCache": { "backends": ["array", "redis"] },
            "redisCache": {
                "host": "redis.local",
                "port": 6380,
                "timeout": 1.5,
                "password": "secret",
                "database": 3
            },
            "paths": { "root": "/srv/piwik" }
        }))
        .unwrap();

        assert_eq!(
            result,
            Settings {
                general: GeneralConfig {
                    enable_auto_update: false,
                    release_channel: Some("2x_stable".to_string()),
                    api_service_url: "http://api.local".to_string(),
                    builds_url: "http://builds.local".to_string(),
                    instance_id: Some("tenant1".to_string()),
                    default_timezone: "Europe/Paris".to_string(),
                    current_url: Some("https://stats.example.com/".to_string()),
                },
                cache: CacheConfig {
                    backend: Some("file".to_string())
                },
                chained_cache: ChainedCacheConfig {
                    backends: vec!["array".to_string(), "redis".to_string()]
                },
                redis_cache: RedisCacheConfig {
                    host: "redis.local".to_string(),
                    port: 6380,
                    timeout: 1.5,
                    password: "secret".to_string(),
                    database: 3,
                },
                paths: PathsConfig {
                    root: PathBuf::from("/srv/piwik")
                },
            }
        );
    }

    #[test]
    fn file_cache_path_without_instance_id() {
        let mut settings = Settings::default();
        settings.paths.root = PathBuf::from("/srv/piwik");

        assert_eq!(
            settings.file_cache_path(),
            PathBuf::from("/srv/piwik/tmp/cache/tracker")
        );
    }

    #[test]
    fn file_cache_path_is_scoped_by_instance_id() {
        let mut settings = Settings::default();
        settings.paths.root = PathBuf::from("/srv/piwik");
        settings.general.instance_id = Some("tenant1".to_string());

        assert_eq!(
            settings.file_cache_path(),
            PathBuf::from("/srv/piwik/tmp/tenant1/cache/tracker")
        );
    }

    #[test]
    fn empty_instance_id_is_ignored() {
        let mut settings = Settings::default();
        settings.paths.root = PathBuf::from("/srv/piwik");
        settings.general.instance_id = Some(String::new());

        assert_eq!(settings.tmp_path(), PathBuf::from("/srv/piwik/tmp"));
    }

    #[test]
    fn load_returns_defaults_when_file_is_missing() {
        let temp_dir = TempDir::new().unwrap();

        let settings = Settings::load(&temp_dir.path().join("missing.json")).unwrap();

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn load_reports_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = Settings::load(&path);

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn data_dir_with_env_uses_xdg_data_home_when_set() {
        let path = data_dir_with_env(
            Some("/tmp/test-data".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-data/piwik-kernel"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_home_local_share() {
        let path = data_dir_with_env(None, Some(PathBuf::from("/home/user")));

        assert_eq!(path, PathBuf::from("/home/user/.local/share/piwik-kernel"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = data_dir_with_env(None, None);
        assert_eq!(path, PathBuf::from("./piwik-kernel"));
    }
}
