//! Fixed-window rate limiting over a shared counter store.
//!
//! `quota_gate` counts requests per client key in a store shared by every
//! service instance, and denies requests once a key exceeds its quota for the
//! current window:
//!
//! - **Fixed Window Algorithm**: one counter per key, reset when the key's window expires
//! - **Pluggable Storage**: in-memory with GC, Redis with connection pooling
//! - **Composite Keys**: rate limit by several headers, IP + path, etc.
//! - **Framework Integration**: Axum/Tower middleware
//!
//! # Quick Start
//!
//! ```ignore
//! use quota_gate::{Algorithm, FixedWindow, MemoryStorage, Quota};
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = MemoryStorage::new();
//!     let algorithm = FixedWindow::new();
//!     let quota = Quota::per_hour(100);
//!
//!     let decision = algorithm.check_and_record(&storage, "user:123", &quota).await.unwrap();
//!
//!     if decision.is_allowed() {
//!         println!("Request allowed! {} used so far", decision.info().total_requests);
//!     } else {
//!         println!("Rate limited until {}", decision.info().expires_at_rfc3339());
//!     }
//! }
//! ```
//!
//! # Feature Flags
//!
//! - `memory` (default): In-memory storage with garbage collection
//! - `redis`: Redis storage backend with connection pooling
//! - `axum` (default): Axum/Tower middleware
//! - `full`: All of the above

pub mod algorithm;
pub mod clock;
pub mod decision;
pub mod error;
pub mod extensions;
pub mod headers;
pub mod key;
pub mod quota;
pub mod storage;

#[cfg(feature = "axum")]
pub mod middleware;

// Re-export main types
pub use algorithm::{Algorithm, FixedWindow};
pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::{Decision, RateLimitInfo, State};
pub use error::{ConfigError, ConnectionError, RateLimitError, Result, StorageError};
pub use key::{CompositeKey, EitherKey, FnKey, GlobalKey, HeadersKey, Key, StaticKey};
pub use quota::{Quota, QuotaBuilder};
pub use storage::{Storage, Ttl};

// Re-export extensions and headers
pub use extensions::{RateLimitExt, RateLimitResponse};
pub use headers::RateLimitHeaders;

// Re-export storage types
#[cfg(feature = "memory")]
pub use storage::{GcConfig, GcInterval, MemoryStorage};

#[cfg(feature = "redis")]
pub use storage::{RedisConfig, RedisStorage};

#[cfg(feature = "axum")]
pub use middleware::{FailurePolicy, RateLimitLayer};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::algorithm::{Algorithm, FixedWindow};
    pub use crate::decision::{Decision, RateLimitInfo, State};
    pub use crate::error::{RateLimitError, Result};
    pub use crate::key::{HeadersKey, Key};
    pub use crate::quota::Quota;
    pub use crate::storage::Storage;

    #[cfg(feature = "memory")]
    pub use crate::storage::{GcConfig, GcInterval, MemoryStorage};

    #[cfg(feature = "redis")]
    pub use crate::storage::{RedisConfig, RedisStorage};

    #[cfg(feature = "axum")]
    pub use crate::middleware::{FailurePolicy, RateLimitLayer};
}
