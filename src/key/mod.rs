//! Key extraction for rate limiting.
//!
//! This module provides the `Key` trait for deriving rate limiting keys from
//! requests, along with pre-built extractors for common patterns.
//!
//! # Overview
//!
//! Rate limiting keys determine how requests are grouped together. For example:
//! - Limit by user id header: all requests carrying the same id share a quota
//! - Limit by IP address: all requests from the same IP share a quota
//! - Limit by several headers at once: `HeadersKey::new(["x-tenant", "x-user"])`
//!
//! # Example
//!
//! ```ignore
//! use quota_gate::key::{Key, HeadersKey, IpKey, CompositeKey, PathKey};
//!
//! // The user id header must be present and non-blank
//! let by_user = HeadersKey::new(["userId"]);
//!
//! // Composite key: IP + path
//! let composite = CompositeKey::new(IpKey::new(), PathKey::new());
//! ```

mod composite;
mod extractors;

pub use composite::{CompositeKey, EitherKey};
pub use extractors::*;

use crate::error::{RateLimitError, Result};

/// Trait for extracting rate limiting keys from requests.
///
/// Extraction either yields a non-empty key or fails with
/// [`RateLimitError::KeyExtraction`]; the gateway rejects such requests
/// without consulting the limiter.
///
/// # Type Parameters
///
/// - `R`: The request type (e.g., `http::Request<Body>`)
pub trait Key<R>: Send + Sync + 'static {
    /// Extract a rate limiting key from the request.
    fn extract(&self, request: &R) -> Result<String>;

    /// Get the key name for logging/metrics.
    fn name(&self) -> &'static str;
}

/// A constant key that applies the same limit to all requests.
#[derive(Debug, Clone, Default)]
pub struct GlobalKey;

impl GlobalKey {
    /// Create a new global key.
    pub fn new() -> Self {
        Self
    }
}

impl<R> Key<R> for GlobalKey {
    fn extract(&self, _request: &R) -> Result<String> {
        Ok("global".to_string())
    }

    fn name(&self) -> &'static str {
        "global"
    }
}

/// A key computed by a closure.
///
/// The closure returns `None` when the request carries nothing to key on.
#[derive(Clone)]
pub struct FnKey<F> {
    extractor: F,
    name: &'static str,
}

impl<F> std::fmt::Debug for FnKey<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnKey").field("name", &self.name).finish()
    }
}

impl<F> FnKey<F> {
    /// Create a new function-based key extractor.
    pub fn new(name: &'static str, extractor: F) -> Self {
        Self { extractor, name }
    }
}

impl<R, F> Key<R> for FnKey<F>
where
    F: Fn(&R) -> Option<String> + Send + Sync + 'static,
{
    fn extract(&self, request: &R) -> Result<String> {
        (self.extractor)(request)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| RateLimitError::key_extraction(format!("no {} key in request", self.name)))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// A key that always returns a static value.
#[derive(Debug, Clone)]
pub struct StaticKey {
    key: String,
}

impl StaticKey {
    /// Create a new static key.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl<R> Key<R> for StaticKey {
    fn extract(&self, _request: &R) -> Result<String> {
        Ok(self.key.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
