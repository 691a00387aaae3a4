//! Fixed Window rate limiting algorithm.
//!
//! Each key owns one counter in the store. The first request of a window gives
//! the key an expiration equal to the window length; every request increments
//! the counter; when the key expires the store forgets it and the next request
//! opens a new window.
//!
//! Reading the window, setting the expiration and incrementing are separate
//! store calls. Two callers racing on a fresh key may both set the expiration,
//! which is harmless because they set the same value, and the atomic increment
//! still counts both requests. No lock is taken across instances.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::algorithm::Algorithm;
use crate::clock::{add_duration, Clock, SystemClock};
use crate::decision::{Decision, RateLimitInfo};
use crate::error::{RateLimitError, Result};
use crate::quota::Quota;
use crate::storage::Storage;

const NAME: &str = "fixed_window";

/// Fixed Window rate limiting algorithm.
///
/// A denial found before incrementing reports the stored count, so once a key
/// is over its limit further calls in the same window do not grow the count.
///
/// # Example
///
/// ```ignore
/// use quota_gate::{Algorithm, FixedWindow, MemoryStorage, Quota};
///
/// let storage = MemoryStorage::new();
/// let limiter = FixedWindow::new().with_timeout(Duration::from_millis(200));
/// let decision = limiter.check_and_record(&storage, "user:1", &Quota::per_hour(100)).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct FixedWindow<C = SystemClock> {
    clock: C,
    timeout: Option<Duration>,
}

impl FixedWindow {
    /// Create a new Fixed Window algorithm instance using the system clock.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Clock> FixedWindow<C> {
    /// Create an instance that reads wall-clock time from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            timeout: None,
        }
    }

    /// Bound every evaluation by `timeout`, store round trips included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The configured per-evaluation timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Evaluate against a caller-supplied deadline.
    ///
    /// When the deadline passes mid-evaluation no decision is returned. Any
    /// expiration already written to the store stays in place.
    pub async fn check_and_record_until<S: Storage>(
        &self,
        storage: &S,
        key: &str,
        quota: &Quota,
        deadline: Instant,
    ) -> Result<Decision> {
        let budget = deadline.saturating_duration_since(Instant::now());
        tokio::time::timeout_at(deadline, self.evaluate(storage, key, quota))
            .await
            .map_err(|_| RateLimitError::DeadlineExceeded(budget))?
    }

    async fn evaluate<S: Storage>(&self, storage: &S, key: &str, quota: &Quota) -> Result<Decision> {
        let limit = quota.max_requests();
        let window = quota.window();

        let (current, ttl) = storage.get_with_ttl(key).await?;

        let now = self.clock.now();
        let remaining = match ttl.remaining() {
            Some(remaining) => remaining,
            None => {
                // No window in progress (missing key or no expiration): open one.
                storage.expire(key, window).await?;
                debug!(key, ?window, "started new rate limit window");
                window
            }
        };
        let expires_at = add_duration(now, remaining);

        if let Some(count) = current.filter(|&count| count >= limit) {
            trace!(key, count, limit, "over limit, skipping increment");
            let info = RateLimitInfo::new(limit, count, expires_at)
                .with_algorithm(NAME)
                .with_retry_after(remaining);
            return Ok(Decision::denied(info));
        }

        let total = storage.increment(key).await?;
        let info = RateLimitInfo::new(limit, total, expires_at).with_algorithm(NAME);

        if total > limit {
            debug!(key, total, limit, "rate limit exceeded");
            Ok(Decision::denied(info.with_retry_after(remaining)))
        } else {
            Ok(Decision::allowed(info))
        }
    }
}

impl<C: Clock> Algorithm for FixedWindow<C> {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn check_and_record<S: Storage>(
        &self,
        storage: &S,
        key: &str,
        quota: &Quota,
    ) -> Result<Decision> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.evaluate(storage, key, quota))
                .await
                .map_err(|_| RateLimitError::DeadlineExceeded(timeout))?,
            None => self.evaluate(storage, key, quota).await,
        }
    }
}
