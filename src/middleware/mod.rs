//! Axum middleware for rate limiting.
//!
//! Provides a Tower-compatible layer that puts the fixed-window limiter in
//! front of an Axum router:
//!
//! - a request without a usable key gets `400 Bad Request`,
//! - a failed evaluation gets `500 Internal Server Error` (or is forwarded
//!   under [`FailurePolicy::Open`]),
//! - a denied request gets `429 Too Many Requests`,
//! - an allowed request is forwarded with a [`RateLimitExt`](crate::extensions::RateLimitExt)
//!   extension.
//!
//! Evaluated responses carry the `Rate-Limiting-*` headers.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use quota_gate::{
//!     middleware::RateLimitLayer,
//!     FixedWindow, Quota, MemoryStorage,
//!     key::HeadersKey,
//! };
//!
//! let app = Router::new()
//!     .route("/albums", get(handler))
//!     .layer(RateLimitLayer::new(
//!         MemoryStorage::new(),
//!         FixedWindow::new(),
//!         Quota::per_hour(100),
//!         HeadersKey::new(["userId"]),
//!     ));
//! ```

mod layer;

pub use layer::{FailurePolicy, RateLimitLayer, RateLimitService, TOO_MANY_REQUESTS_MESSAGE};
