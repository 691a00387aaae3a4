//! Request extensions for accessing rate limit info in handlers.
//!
//! The gateway inserts a [`RateLimitExt`] into every request it forwards.
//!
//! # Example
//!
//! ```ignore
//! use axum::Extension;
//! use quota_gate::extensions::RateLimitExt;
//!
//! async fn handler(Extension(rate_limit): Extension<RateLimitExt>) {
//!     println!("Used {} of {}", rate_limit.total_requests, rate_limit.limit);
//! }
//! ```

use chrono::{DateTime, Utc};

use crate::decision::{Decision, State};
use crate::quota::Quota;

/// Rate limit information available via request extensions.
#[derive(Debug, Clone)]
pub struct RateLimitExt {
    /// The key used for rate limiting this request.
    pub key: String,
    /// The quota applied to this request.
    pub quota: Quota,
    /// The rate limit decision.
    pub decision: Decision,
    /// Requests observed in the current window.
    pub total_requests: u64,
    /// Maximum requests allowed.
    pub limit: u64,
    /// When the current window ends.
    pub expires_at: DateTime<Utc>,
}

impl RateLimitExt {
    /// Create a new rate limit extension from a decision.
    pub fn new(key: impl Into<String>, quota: Quota, decision: Decision) -> Self {
        let info = decision.info();
        Self {
            key: key.into(),
            total_requests: info.total_requests,
            limit: info.limit,
            expires_at: info.expires_at,
            quota,
            decision,
        }
    }

    /// Check if the request was allowed.
    pub fn is_allowed(&self) -> bool {
        self.decision.is_allowed()
    }

    /// Requests left in the current window.
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.total_requests)
    }
}

/// Rate limit info that can be serialized to JSON.
///
/// Useful for returning rate limit information in API responses.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RateLimitResponse {
    /// `Allow` or `Deny`.
    pub state: State,
    /// Maximum requests allowed per window.
    pub limit: u64,
    /// Requests observed in the current window.
    pub total_requests: u64,
    /// When the current window ends.
    pub expires_at: DateTime<Utc>,
    /// If denied, seconds until the window ends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

impl From<&RateLimitExt> for RateLimitResponse {
    fn from(ext: &RateLimitExt) -> Self {
        Self {
            state: ext.decision.state(),
            limit: ext.limit,
            total_requests: ext.total_requests,
            expires_at: ext.expires_at,
            retry_after_seconds: ext
                .decision
                .info()
                .retry_after
                .map(|d| d.as_secs()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::RateLimitInfo;
    use chrono::TimeZone;
    use std::time::Duration;

    fn expires() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap()
    }

    #[test]
    fn test_rate_limit_ext() {
        let decision = Decision::allowed(RateLimitInfo::new(100, 50, expires()));
        let ext = RateLimitExt::new("user:123", Quota::per_hour(100), decision);

        assert!(ext.is_allowed());
        assert_eq!(ext.remaining(), 50);
        assert_eq!(ext.limit, 100);
        assert_eq!(ext.expires_at, expires());
    }

    #[test]
    fn test_rate_limit_response_serialization() {
        let info = RateLimitInfo::new(100, 100, expires()).with_retry_after(Duration::from_secs(30));
        let ext = RateLimitExt::new("user:123", Quota::per_hour(100), Decision::denied(info));
        let response: RateLimitResponse = (&ext).into();

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["state"], "Deny");
        assert_eq!(json["total_requests"], 100);
        assert_eq!(json["retry_after_seconds"], 30);
        assert_eq!(json["expires_at"], "2024-01-01T01:00:00Z");
    }
}
