//! Resolves configured backend names to ready-to-use cache backends

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::cache::backend::CacheBackend;
use crate::cache::backends::{ArrayCache, ChainedCache, FileCache, NullCache};
#[cfg(feature = "process-cache")]
use crate::cache::backends::ProcessCache;
#[cfg(feature = "redis")]
use crate::cache::backends::RedisCache;
use crate::cache::error::CacheError;
use crate::config::Settings;

/// Names accepted in the `cache.backend` and `chainedCache.backends` settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Null,
    Array,
    File,
    Process,
    Redis,
    Chained,
}

impl BackendKind {
    pub const ALL: [BackendKind; 6] = [
        BackendKind::Null,
        BackendKind::Array,
        BackendKind::File,
        BackendKind::Process,
        BackendKind::Redis,
        BackendKind::Chained,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Null => "null",
            BackendKind::Array => "array",
            BackendKind::File => "file",
            BackendKind::Process => "process",
            BackendKind::Redis => "redis",
            BackendKind::Chained => "chained",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "null" => Ok(BackendKind::Null),
            "array" => Ok(BackendKind::Array),
            "file" => Ok(BackendKind::File),
            "process" | "apc" => Ok(BackendKind::Process),
            "redis" => Ok(BackendKind::Redis),
            "chained" => Ok(BackendKind::Chained),
            other => Err(CacheError::UnknownBackend(other.to_string())),
        }
    }
}

/// A constructed cache backend of any kind
pub enum Backend {
    Null(NullCache),
    Array(ArrayCache),
    File(FileCache),
    #[cfg(feature = "process-cache")]
    Process(ProcessCache),
    #[cfg(feature = "redis")]
    Redis(RedisCache),
    Chained(ChainedCache<Backend>),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Null(_) => BackendKind::Null,
            Backend::Array(_) => BackendKind::Array,
            Backend::File(_) => BackendKind::File,
            #[cfg(feature = "process-cache")]
            Backend::Process(_) => BackendKind::Process,
            #[cfg(feature = "redis")]
            Backend::Redis(_) => BackendKind::Redis,
            Backend::Chained(_) => BackendKind::Chained,
        }
    }

    fn inner(&self) -> &dyn CacheBackend {
        match self {
            Backend::Null(backend) => backend,
            Backend::Array(backend) => backend,
            Backend::File(backend) => backend,
            #[cfg(feature = "process-cache")]
            Backend::Process(backend) => backend,
            #[cfg(feature = "redis")]
            Backend::Redis(backend) => backend,
            Backend::Chained(backend) => backend,
        }
    }
}

/// Renders the backend tree, e.g. `chained(array, file)`
impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Chained(chain) => {
                write!(f, "chained(")?;
                for (i, backend) in chain.backends().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", backend)?;
                }
                write!(f, ")")
            }
            other => f.write_str(other.kind().as_str()),
        }
    }
}

impl CacheBackend for Backend {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        self.inner().get(key)
    }

    fn set(&self, key: &str, value: &Value, lifetime: Option<Duration>) -> Result<(), CacheError> {
        self.inner().set(key, value, lifetime)
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.inner().delete(key)
    }

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        self.inner().has(key)
    }

    fn flush(&self) -> Result<(), CacheError> {
        self.inner().flush()
    }
}

/// Builds the backend selected by `cache.backend`, defaulting to `chained`.
pub fn build_backend(settings: &Settings) -> Result<Backend, CacheError> {
    let name = settings.cache.backend_name();
    let backend = build_named_backend(name, settings)?;
    info!("Using cache backend {}", backend);
    Ok(backend)
}

/// Builds the backend registered under `name`.
pub fn build_named_backend(name: &str, settings: &Settings) -> Result<Backend, CacheError> {
    let kind = name.parse::<BackendKind>()?;
    resolve(kind, settings, &mut Vec::new())
}

fn resolve(
    kind: BackendKind,
    settings: &Settings,
    stack: &mut Vec<BackendKind>,
) -> Result<Backend, CacheError> {
    if stack.contains(&kind) {
        let path = stack
            .iter()
            .chain(std::iter::once(&kind))
            .map(BackendKind::as_str)
            .collect::<Vec<_>>()
            .join(" -> ");
        return Err(CacheError::BackendCycle(path));
    }

    debug!("Resolving cache backend {}", kind);

    match kind {
        BackendKind::Null => Ok(Backend::Null(NullCache::new())),
        BackendKind::Array => Ok(Backend::Array(ArrayCache::new())),
        BackendKind::File => Ok(Backend::File(FileCache::new(settings.file_cache_path()))),
        BackendKind::Process => build_process_backend(),
        BackendKind::Redis => build_redis_backend(settings),
        BackendKind::Chained => {
            stack.push(kind);
            let backends = settings
                .chained_cache
                .backends
                .iter()
                .map(|name| resolve(name.parse()?, settings, stack))
                .collect::<Result<Vec<_>, _>>()?;
            stack.pop();

            Ok(Backend::Chained(ChainedCache::new(backends)))
        }
    }
}

#[cfg(feature = "process-cache")]
fn build_process_backend() -> Result<Backend, CacheError> {
    Ok(Backend::Process(ProcessCache::new()))
}

#[cfg(not(feature = "process-cache"))]
fn build_process_backend() -> Result<Backend, CacheError> {
    Err(CacheError::BackendUnavailable {
        backend: "process",
        feature: "process-cache",
    })
}

#[cfg(feature = "redis")]
fn build_redis_backend(settings: &Settings) -> Result<Backend, CacheError> {
    Ok(Backend::Redis(RedisCache::connect(&settings.redis_cache)?))
}

#[cfg(not(feature = "redis"))]
fn build_redis_backend(_settings: &Settings) -> Result<Backend, CacheError> {
    Err(CacheError::BackendUnavailable {
        backend: "redis",
        feature: "redis",
    })
}
