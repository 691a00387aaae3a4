//! In-memory counter store with automatic garbage collection.
//!
//! This storage backend uses `DashMap` for thread-safe concurrent access and
//! follows Redis semantics for counters and expirations. Expired entries are
//! invisible immediately and physically removed by configurable GC.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::trace;

use crate::clock::{add_duration, remaining_until, Clock, SystemClock};
use crate::error::Result;
use crate::storage::{Storage, Ttl};

/// Garbage collection interval configuration.
#[derive(Debug, Clone)]
pub enum GcInterval {
    /// Run GC every N requests.
    Requests(u64),
    /// Run GC at fixed time intervals.
    Duration(Duration),
    /// Disable automatic GC.
    Manual,
}

impl Default for GcInterval {
    fn default() -> Self {
        Self::Requests(10000)
    }
}

/// Garbage collection configuration.
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// When to trigger GC.
    pub interval: GcInterval,
    /// Maximum idle time of a counter without expiration before cleanup
    /// (default: 1 hour).
    pub max_age: Duration,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            interval: GcInterval::default(),
            max_age: Duration::from_secs(3600),
        }
    }
}

impl GcConfig {
    /// Create config with request-based GC.
    pub fn on_requests(count: u64) -> Self {
        Self {
            interval: GcInterval::Requests(count),
            ..Default::default()
        }
    }

    /// Create config with time-based GC.
    pub fn on_duration(interval: Duration) -> Self {
        Self {
            interval: GcInterval::Duration(interval),
            ..Default::default()
        }
    }

    /// Create config with manual GC only.
    pub fn manual() -> Self {
        Self {
            interval: GcInterval::Manual,
            ..Default::default()
        }
    }

    /// Set the maximum idle age for counters without expiration.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }
}

/// A counter with its optional expiration.
#[derive(Debug, Clone)]
struct CounterEntry {
    count: u64,
    expires_at: Option<DateTime<Utc>>,
    last_update: DateTime<Utc>,
}

impl CounterEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

type CounterMap = Arc<DashMap<String, CounterEntry>>;

/// In-memory counter store with garbage collection.
///
/// Suitable for a single instance, and as a stand-in for Redis in tests:
/// pass a [`ManualClock`](crate::clock::ManualClock) to control expirations.
///
/// # Example
///
/// ```ignore
/// use quota_gate::storage::{MemoryStorage, GcConfig};
/// use std::time::Duration;
///
/// // Default GC (every 10000 requests)
/// let storage = MemoryStorage::new();
///
/// // Custom GC interval
/// let storage = MemoryStorage::with_gc(GcConfig::on_duration(Duration::from_secs(60)));
///
/// // Manual GC only
/// let storage = MemoryStorage::with_gc(GcConfig::manual());
/// storage.run_gc();
/// ```
pub struct MemoryStorage<C = SystemClock> {
    data: CounterMap,
    clock: C,
    gc_config: GcConfig,
    request_count: AtomicU64,
    gc_lock: Mutex<()>,
    shutdown: Arc<Notify>,
}

impl<C> std::fmt::Debug for MemoryStorage<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("entries", &self.data.len())
            .field("gc_config", &self.gc_config)
            .finish()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    /// Create a new memory storage with default GC configuration.
    pub fn new() -> Self {
        Self::with_gc(GcConfig::default())
    }

    /// Create a new memory storage with custom GC configuration.
    pub fn with_gc(gc_config: GcConfig) -> Self {
        Self::with_clock_and_gc(SystemClock, gc_config)
    }
}

impl<C: Clock + Clone> MemoryStorage<C> {
    /// Create a memory storage that reads time from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self::with_clock_and_gc(clock, GcConfig::default())
    }

    /// Create a memory storage with both a custom clock and GC configuration.
    ///
    /// Duration-based GC spawns a tokio task, so it must be called inside a runtime.
    pub fn with_clock_and_gc(clock: C, gc_config: GcConfig) -> Self {
        let storage = Self {
            data: Arc::new(DashMap::new()),
            clock,
            gc_config: gc_config.clone(),
            request_count: AtomicU64::new(0),
            gc_lock: Mutex::new(()),
            shutdown: Arc::new(Notify::new()),
        };

        // Start background GC task if duration-based
        if let GcInterval::Duration(interval) = gc_config.interval {
            storage.start_gc_task(interval);
        }

        storage
    }

    /// Start background GC task.
    fn start_gc_task(&self, interval: Duration) {
        let data = self.data.clone();
        let clock = self.clock.clone();
        let max_age = self.gc_config.max_age;
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        run_gc_on_map(&data, clock.now(), max_age);
                    }
                    _ = shutdown.notified() => {
                        break;
                    }
                }
            }
        });
    }
}

impl<C: Clock> MemoryStorage<C> {
    /// Manually trigger garbage collection.
    pub fn run_gc(&self) {
        run_gc_on_map(&self.data, self.clock.now(), self.gc_config.max_age);
    }

    /// Get the number of entries currently stored, expired ones included.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the storage is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.data.clear();
    }

    /// Check if GC should run and run it if needed.
    fn maybe_run_gc(&self) {
        if let GcInterval::Requests(threshold) = self.gc_config.interval {
            let count = self.request_count.fetch_add(1, Ordering::Relaxed);
            if threshold > 0 && count % threshold == 0 && count > 0 {
                // Try to acquire GC lock (non-blocking)
                if let Some(_guard) = self.gc_lock.try_lock() {
                    self.run_gc();
                }
            }
        }
    }

    /// The live entry at `key`, dropping it if it has expired.
    fn live_entry(&self, key: &str, now: DateTime<Utc>) -> Option<CounterEntry> {
        let entry = self.data.get(key)?.value().clone();
        if entry.is_live(now) {
            return Some(entry);
        }
        self.data.remove_if(key, |_, e| !e.is_live(now));
        None
    }
}

impl<C> Drop for MemoryStorage<C> {
    fn drop(&mut self) {
        // Stores a permit when the task is between polls.
        self.shutdown.notify_one();
    }
}

/// Run garbage collection on a DashMap.
fn run_gc_on_map(data: &DashMap<String, CounterEntry>, now: DateTime<Utc>, max_age: Duration) {
    let before = data.len();
    data.retain(|_, entry| match entry.expires_at {
        Some(_) => entry.is_live(now),
        // Counters without expiration only go once they have been idle too long.
        None => add_duration(entry.last_update, max_age) > now,
    });
    trace!(removed = before.saturating_sub(data.len()), "memory storage gc finished");
}

impl<C: Clock> Storage for MemoryStorage<C> {
    async fn get(&self, key: &str) -> Result<Option<u64>> {
        self.maybe_run_gc();

        let now = self.clock.now();
        Ok(self.live_entry(key, now).map(|e| e.count))
    }

    async fn increment(&self, key: &str) -> Result<u64> {
        self.maybe_run_gc();

        let now = self.clock.now();
        let new_count = self
            .data
            .entry(key.to_string())
            .and_modify(|entry| {
                if entry.is_live(now) {
                    entry.count += 1;
                } else {
                    // Expired keys behave as absent: start over without expiration.
                    entry.count = 1;
                    entry.expires_at = None;
                }
                entry.last_update = now;
            })
            .or_insert_with(|| CounterEntry {
                count: 1,
                expires_at: None,
                last_update: now,
            })
            .count;

        Ok(new_count)
    }

    async fn ttl(&self, key: &str) -> Result<Ttl> {
        self.maybe_run_gc();

        let now = self.clock.now();
        Ok(match self.live_entry(key, now) {
            None => Ttl::Missing,
            Some(CounterEntry { expires_at: None, .. }) => Ttl::Persistent,
            Some(CounterEntry { expires_at: Some(at), .. }) => {
                remaining_until(now, at).map_or(Ttl::Missing, Ttl::Remaining)
            }
        })
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        self.maybe_run_gc();

        let now = self.clock.now();
        let expires_at = add_duration(now, ttl);
        self.data
            .entry(key.to_string())
            .and_modify(|entry| {
                if !entry.is_live(now) {
                    entry.count = 0;
                }
                entry.expires_at = Some(expires_at);
                entry.last_update = now;
            })
            .or_insert_with(|| CounterEntry {
                count: 0,
                expires_at: Some(expires_at),
                last_update: now,
            });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }
}
