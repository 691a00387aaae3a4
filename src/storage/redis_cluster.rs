//! Redis storage backend for distributed rate limiting.
//!
//! Counters are plain Redis integers, so every instance sharing the server
//! sees the same windows. Uses connection pooling for high performance.

use std::time::Duration;

use deadpool_redis::{
    Config, Connection, Pool, PoolConfig, PoolError, Runtime,
    redis::{AsyncCommands, RedisError, cmd, pipe},
};
use tracing::debug;

use crate::error::{ConfigError, ConnectionError, Result, StorageError};
use crate::storage::{Storage, Ttl};

/// `PTTL` reply for a key that does not exist.
const PTTL_MISSING: i64 = -2;
/// `PTTL` reply for a key without expiration.
const PTTL_PERSISTENT: i64 = -1;

/// Redis storage configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
    /// Connection pool size
    pub pool_size: usize,
    /// Key prefix for rate limit keys
    pub key_prefix: String,
    /// Connection timeout
    pub connection_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            key_prefix: "rl:".to_string(),
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// Create a new Redis configuration.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the pool size.
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Set how long to wait for the initial connection.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// Redis storage backend for distributed rate limiting.
///
/// # Example
///
/// ```ignore
/// use quota_gate::storage::{RedisStorage, RedisConfig};
///
/// let config = RedisConfig::new("redis://localhost:6379")
///     .with_prefix("myapp:rl:")
///     .with_pool_size(20);
///
/// let storage = RedisStorage::new(config).await?;
/// ```
pub struct RedisStorage {
    pool: Pool,
    key_prefix: String,
}

impl std::fmt::Debug for RedisStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStorage")
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl RedisStorage {
    /// Create a new Redis storage from configuration.
    pub async fn new(config: RedisConfig) -> Result<Self> {
        if config.pool_size == 0 {
            return Err(ConfigError::InvalidStorage("pool_size must be greater than 0".into()).into());
        }

        let mut cfg = Config::from_url(&config.url);
        cfg.pool = Some(PoolConfig::new(config.pool_size));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| ConfigError::InvalidStorage(e.to_string()))?;

        // Test connection
        let ping = async {
            let mut conn = pool
                .get()
                .await
                .map_err(|e| ConnectionError::ConnectionFailed(e.to_string()))?;
            cmd("PING")
                .query_async::<()>(&mut *conn)
                .await
                .map_err(|e| ConnectionError::ConnectionFailed(e.to_string()))
        };
        tokio::time::timeout(config.connection_timeout, ping)
            .await
            .map_err(|_| ConnectionError::Timeout(config.connection_timeout))??;

        debug!(url = %config.url, pool_size = config.pool_size, "connected to redis");

        Ok(Self {
            pool,
            key_prefix: config.key_prefix,
        })
    }

    /// Create a new Redis storage from a URL.
    pub async fn from_url(url: impl Into<String>) -> Result<Self> {
        Self::new(RedisConfig::new(url)).await
    }

    /// Get the full key with prefix.
    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> Result<Connection> {
        self.pool.get().await.map_err(|e| match e {
            PoolError::Timeout(_) => StorageError::PoolExhausted.into(),
            other => StorageError::operation_failed(other.to_string(), true).into(),
        })
    }
}

fn command_failed(e: RedisError) -> StorageError {
    let retryable = e.is_timeout() || e.is_connection_dropped() || e.is_io_error();
    StorageError::operation_failed(e.to_string(), retryable)
}

/// Redis takes whole milliseconds and rejects zero.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn ttl_from_pttl(key: &str, pttl: i64) -> Result<Ttl> {
    match pttl {
        PTTL_MISSING => Ok(Ttl::Missing),
        PTTL_PERSISTENT => Ok(Ttl::Persistent),
        ms if ms >= 0 => Ok(Ttl::Remaining(Duration::from_millis(ms.unsigned_abs()))),
        other => Err(StorageError::UnexpectedReply {
            key: key.to_string(),
            reply: format!("PTTL {other}"),
        }
        .into()),
    }
}

impl Storage for RedisStorage {
    async fn get(&self, key: &str) -> Result<Option<u64>> {
        let mut conn = self.get_conn().await?;
        let full_key = self.full_key(key);

        let count: Option<u64> = conn.get(&full_key).await.map_err(command_failed)?;
        Ok(count)
    }

    async fn increment(&self, key: &str) -> Result<u64> {
        let mut conn = self.get_conn().await?;
        let full_key = self.full_key(key);

        // INCR creates missing keys at 0 first and never touches the TTL.
        let total: u64 = conn.incr(&full_key, 1u64).await.map_err(command_failed)?;
        Ok(total)
    }

    async fn ttl(&self, key: &str) -> Result<Ttl> {
        let mut conn = self.get_conn().await?;
        let full_key = self.full_key(key);

        let pttl: i64 = cmd("PTTL")
            .arg(&full_key)
            .query_async(&mut *conn)
            .await
            .map_err(command_failed)?;
        ttl_from_pttl(key, pttl)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let full_key = self.full_key(key);
        let ttl_ms = ttl_millis(ttl);

        // PEXPIRE alone is a no-op on a missing key, which would leave the
        // following INCR without a window. SET NX creates it at zero first.
        pipe()
            .atomic()
            .cmd("SET")
            .arg(&full_key)
            .arg(0)
            .arg("PX")
            .arg(ttl_ms)
            .arg("NX")
            .ignore()
            .cmd("PEXPIRE")
            .arg(&full_key)
            .arg(ttl_ms)
            .ignore()
            .query_async::<()>(&mut *conn)
            .await
            .map_err(command_failed)?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let full_key = self.full_key(key);

        conn.del::<_, ()>(&full_key).await.map_err(command_failed)?;

        Ok(())
    }

    async fn get_with_ttl(&self, key: &str) -> Result<(Option<u64>, Ttl)> {
        let mut conn = self.get_conn().await?;
        let full_key = self.full_key(key);

        let (count, pttl): (Option<u64>, i64) = pipe()
            .cmd("GET")
            .arg(&full_key)
            .cmd("PTTL")
            .arg(&full_key)
            .query_async(&mut *conn)
            .await
            .map_err(command_failed)?;

        Ok((count, ttl_from_pttl(key, pttl)?))
    }
}
