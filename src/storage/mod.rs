//! Shared counter store trait and implementations.
//!
//! The limiter keeps no state of its own. Everything lives in a store that
//! offers a handful of primitives: read a counter, atomically increment it
//! (creating it at 1), ask how long it has left to live, and give it an
//! expiration. Redis offers exactly these; the in-memory store mimics them.

#[cfg(feature = "memory")]
mod memory_gc;
#[cfg(feature = "redis")]
mod redis_cluster;

#[cfg(feature = "memory")]
pub use memory_gc::{GcConfig, GcInterval, MemoryStorage};

// RedisStorage with connection pooling
#[cfg(feature = "redis")]
pub use redis_cluster::{RedisConfig, RedisStorage};

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// Remaining lifetime of a key, as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// The key does not exist.
    Missing,
    /// The key exists but never expires.
    Persistent,
    /// The key expires after this much time.
    Remaining(Duration),
}

impl Ttl {
    /// Time left in the window, if one is in progress.
    ///
    /// A zero remaining time counts as no window: the key is about to vanish.
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Self::Remaining(d) if !d.is_zero() => Some(*d),
            _ => None,
        }
    }
}

/// Counter store used by rate limiting algorithms.
///
/// All operations are async to support both local and distributed backends.
/// Implementations must be thread-safe (`Send + Sync`) and must make
/// `increment` atomic; nothing else is assumed to be atomic.
///
/// # Example
///
/// ```ignore
/// use quota_gate::storage::{Storage, MemoryStorage};
///
/// async fn example<S: Storage>(storage: &S) -> quota_gate::Result<()> {
///     storage.expire("user:1", Duration::from_secs(60)).await?;
///     let total = storage.increment("user:1").await?;
///     println!("seen {total} requests");
///     Ok(())
/// }
/// ```
pub trait Storage: Send + Sync + 'static {
    /// Read the counter stored at `key`.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<u64>>> + Send;

    /// Atomically increment the counter and return the value AFTER incrementing.
    ///
    /// A missing key is created at 1. The key's expiration is left untouched.
    fn increment(&self, key: &str) -> impl Future<Output = Result<u64>> + Send;

    /// Query the remaining time-to-live of `key`.
    fn ttl(&self, key: &str) -> impl Future<Output = Result<Ttl>> + Send;

    /// Make `key` expire `ttl` from now.
    ///
    /// If the key does not exist it is created with a zero counter, so the
    /// expiration holds for the increment that follows.
    fn expire(&self, key: &str, ttl: Duration) -> impl Future<Output = Result<()>> + Send;

    /// Delete a key.
    ///
    /// Returns success even if the key didn't exist.
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// Read the counter and its TTL together.
    ///
    /// The default issues both reads concurrently. Backends that can batch
    /// commands should answer in a single round trip.
    fn get_with_ttl(&self, key: &str) -> impl Future<Output = Result<(Option<u64>, Ttl)>> + Send {
        async move { tokio::try_join!(self.get(key), self.ttl(key)) }
    }
}

impl<S: Storage + ?Sized> Storage for std::sync::Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<u64>> {
        (**self).get(key).await
    }

    async fn increment(&self, key: &str) -> Result<u64> {
        (**self).increment(key).await
    }

    async fn ttl(&self, key: &str) -> Result<Ttl> {
        (**self).ttl(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        (**self).expire(key, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }

    async fn get_with_ttl(&self, key: &str) -> Result<(Option<u64>, Ttl)> {
        (**self).get_with_ttl(key).await
    }
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    async fn get(&self, key: &str) -> Result<Option<u64>> {
        (**self).get(key).await
    }

    async fn increment(&self, key: &str) -> Result<u64> {
        (**self).increment(key).await
    }

    async fn ttl(&self, key: &str) -> Result<Ttl> {
        (**self).ttl(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        (**self).expire(key, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }

    async fn get_with_ttl(&self, key: &str) -> Result<(Option<u64>, Ttl)> {
        (**self).get_with_ttl(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_remaining() {
        assert_eq!(Ttl::Missing.remaining(), None);
        assert_eq!(Ttl::Persistent.remaining(), None);
        assert_eq!(Ttl::Remaining(Duration::ZERO).remaining(), None);
        assert_eq!(
            Ttl::Remaining(Duration::from_secs(5)).remaining(),
            Some(Duration::from_secs(5))
        );
    }
}
