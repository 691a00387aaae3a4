//! HTTP headers for rate limiting.
//!
//! The `Rate-Limiting-*` trio is attached to every evaluated response; the
//! `X-RateLimit-*` and `Retry-After` headers are extras for standard clients.

use crate::decision::Decision;

/// Rate limit header names.
pub mod names {
    /// Requests observed so far in the current window.
    pub const TOTAL_REQUESTS: &str = "Rate-Limiting-Total-Requests";

    /// `Allow` or `Deny`.
    pub const STATE: &str = "Rate-Limiting-State";

    /// RFC 3339 timestamp at which the current window ends.
    pub const EXPIRES_AT: &str = "Rate-Limiting-Expires-At";

    /// Maximum requests allowed per window.
    pub const RATE_LIMIT_LIMIT: &str = "X-RateLimit-Limit";

    /// Remaining requests in current window.
    pub const RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";

    /// Seconds until the client should retry (standard HTTP header).
    pub const RETRY_AFTER: &str = "Retry-After";
}

/// Builder for rate limit headers.
#[derive(Debug, Default)]
pub struct RateLimitHeaders {
    total_requests: Option<u64>,
    state: Option<&'static str>,
    expires_at: Option<String>,
    limit: Option<u64>,
    remaining: Option<u64>,
    retry_after: Option<u64>,
}

impl RateLimitHeaders {
    /// Create a new header builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total requests header.
    pub fn total_requests(mut self, total: u64) -> Self {
        self.total_requests = Some(total);
        self
    }

    /// Set the state header.
    pub fn state(mut self, state: &'static str) -> Self {
        self.state = Some(state);
        self
    }

    /// Set the expiration header (already formatted).
    pub fn expires_at(mut self, expires_at: impl Into<String>) -> Self {
        self.expires_at = Some(expires_at.into());
        self
    }

    /// Set the limit header.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the remaining header.
    pub fn remaining(mut self, remaining: u64) -> Self {
        self.remaining = Some(remaining);
        self
    }

    /// Set the retry-after header (seconds until retry).
    pub fn retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Convert to a vector of (name, value) pairs.
    pub fn to_vec(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();

        if let Some(total) = self.total_requests {
            headers.push((names::TOTAL_REQUESTS, total.to_string()));
        }
        if let Some(state) = self.state {
            headers.push((names::STATE, state.to_string()));
        }
        if let Some(ref expires_at) = self.expires_at {
            headers.push((names::EXPIRES_AT, expires_at.clone()));
        }
        if let Some(limit) = self.limit {
            headers.push((names::RATE_LIMIT_LIMIT, limit.to_string()));
        }
        if let Some(remaining) = self.remaining {
            headers.push((names::RATE_LIMIT_REMAINING, remaining.to_string()));
        }
        if let Some(retry_after) = self.retry_after {
            headers.push((names::RETRY_AFTER, retry_after.to_string()));
        }

        headers
    }
}

impl From<&Decision> for RateLimitHeaders {
    fn from(decision: &Decision) -> Self {
        let info = decision.info();
        let mut headers = Self::new()
            .total_requests(info.total_requests)
            .state(decision.state().as_str())
            .expires_at(info.expires_at_rfc3339())
            .limit(info.limit)
            .remaining(info.remaining());

        if let Some(retry) = info.retry_after {
            // Round up so clients never retry inside the old window.
            let secs = retry.as_secs() + u64::from(retry.subsec_nanos() > 0);
            headers = headers.retry_after(secs);
        }

        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::RateLimitInfo;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    #[test]
    fn test_header_builder() {
        let headers = RateLimitHeaders::new()
            .total_requests(3)
            .state("Allow")
            .expires_at("2024-01-01T00:00:00Z")
            .to_vec();

        assert_eq!(headers.len(), 3);
        assert!(headers.iter().any(|(k, v)| *k == "Rate-Limiting-Total-Requests" && v == "3"));
        assert!(headers.iter().any(|(k, v)| *k == "Rate-Limiting-State" && v == "Allow"));
        assert!(headers.iter().any(|(k, v)| *k == "Rate-Limiting-Expires-At" && v == "2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_headers_from_denied_decision() {
        let expires = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let info = RateLimitInfo::new(1, 1, expires).with_retry_after(Duration::from_millis(1500));
        let headers = Decision::denied(info).to_headers();

        assert!(headers.iter().any(|(k, v)| *k == names::STATE && v == "Deny"));
        assert!(headers.iter().any(|(k, v)| *k == names::TOTAL_REQUESTS && v == "1"));
        assert!(headers.iter().any(|(k, v)| *k == names::EXPIRES_AT && v == "2024-01-01T01:00:00Z"));
        assert!(headers.iter().any(|(k, v)| *k == names::RATE_LIMIT_REMAINING && v == "0"));
        assert!(headers.iter().any(|(k, v)| *k == names::RETRY_AFTER && v == "2"));
    }

    #[test]
    fn test_allowed_decision_has_no_retry_after() {
        let expires = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let headers = Decision::allowed(RateLimitInfo::new(10, 4, expires)).to_headers();

        assert!(!headers.iter().any(|(k, _)| *k == names::RETRY_AFTER));
        assert!(headers.iter().any(|(k, v)| *k == names::RATE_LIMIT_REMAINING && v == "6"));
    }
}
