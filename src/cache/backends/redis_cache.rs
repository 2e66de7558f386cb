//! Distributed cache backed by a Redis server

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use redis::{Commands, Connection, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use serde_json::Value;
use tracing::info;

use crate::cache::backend::CacheBackend;
use crate::cache::error::CacheError;
use crate::config::RedisCacheConfig;

pub struct RedisCache {
    conn: Mutex<Connection>,
}

impl RedisCache {
    /// Connects to the configured server. Connection failures are returned immediately.
    pub fn connect(config: &RedisCacheConfig) -> Result<Self, CacheError> {
        let client = redis::Client::open(connection_info(config))?;

        let conn = if config.timeout > 0.0 {
            client.get_connection_with_timeout(Duration::from_secs_f64(config.timeout))?
        } else {
            client.get_connection()?
        };
        info!(
            "Connected to redis cache at {}:{} (db {})",
            config.host, config.port, config.database
        );

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }
}

fn connection_info(config: &RedisCacheConfig) -> ConnectionInfo {
    ConnectionInfo {
        addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
        redis: RedisConnectionInfo {
            db: config.database,
            password: Some(config.password.clone()).filter(|password| !password.is_empty()),
            ..RedisConnectionInfo::default()
        },
    }
}

impl CacheBackend for RedisCache {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let raw: Option<String> = self.lock_conn()?.get(key)?;
        raw.map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(CacheError::from)
    }

    fn set(&self, key: &str, value: &Value, lifetime: Option<Duration>) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value)?;
        let mut conn = self.lock_conn()?;

        match lifetime.filter(|l| !l.is_zero()) {
            Some(lifetime) => conn.set_ex::<_, _, ()>(key, raw, lifetime.as_secs().max(1))?,
            None => conn.set::<_, _, ()>(key, raw)?,
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.lock_conn()?.del::<_, ()>(key)?;
        Ok(())
    }

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.lock_conn()?.exists(key)?)
    }

    fn flush(&self) -> Result<(), CacheError> {
        let mut conn = self.lock_conn()?;
        redis::cmd("FLUSHDB").query::<()>(&mut *conn)?;
        Ok(())
    }
}
