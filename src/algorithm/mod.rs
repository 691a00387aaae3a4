//! Rate limiting algorithm trait and implementations.
//!
//! An algorithm is a stateless strategy: every piece of mutable state it
//! needs lives in the [`Storage`] it is handed, so one instance can serve any
//! number of concurrent callers. The gateway only depends on this trait, which
//! keeps other strategies pluggable.
//!
//! # Available Algorithms
//!
//! - **Fixed Window**: counter per key, reset when the key's window expires

mod fixed_window;

pub use fixed_window::FixedWindow;

use std::future::Future;

use crate::decision::Decision;
use crate::error::Result;
use crate::quota::Quota;
use crate::storage::Storage;

/// Rate limiting algorithm trait.
pub trait Algorithm: Send + Sync + 'static {
    /// Get the algorithm name (for logging/metrics).
    fn name(&self) -> &'static str;

    /// Check if a request is allowed and record it.
    ///
    /// Fails only when no verdict could be reached, e.g. the store is down.
    fn check_and_record<S: Storage>(
        &self,
        storage: &S,
        key: &str,
        quota: &Quota,
    ) -> impl Future<Output = Result<Decision>> + Send;

    /// Reset the rate limit for a key.
    fn reset<S: Storage>(&self, storage: &S, key: &str) -> impl Future<Output = Result<()>> + Send {
        async move { storage.delete(key).await }
    }
}
