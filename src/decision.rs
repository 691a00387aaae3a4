//! Decision types for rate limiting results.
//!
//! Every evaluation produces a fresh `Decision`: the allow/deny state, the
//! number of requests observed in the current window, and the wall-clock
//! instant the window ends. Decisions are never persisted.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::headers::RateLimitHeaders;

/// Allow/deny state of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    /// The request fits in the quota.
    Allow,
    /// The quota for the current window is used up.
    Deny,
}

impl State {
    /// The header rendering of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of a rate limit check.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    state: State,
    info: RateLimitInfo,
}

impl Decision {
    /// Create a new "allowed" decision.
    pub fn allowed(info: RateLimitInfo) -> Self {
        Self {
            state: State::Allow,
            info,
        }
    }

    /// Create a new "denied" decision.
    pub fn denied(info: RateLimitInfo) -> Self {
        Self {
            state: State::Deny,
            info,
        }
    }

    /// The allow/deny state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Check if the request is allowed.
    pub fn is_allowed(&self) -> bool {
        self.state == State::Allow
    }

    /// Check if the request is denied.
    pub fn is_denied(&self) -> bool {
        self.state == State::Deny
    }

    /// Get the rate limit info.
    pub fn info(&self) -> &RateLimitInfo {
        &self.info
    }

    /// Consume the decision and return the info.
    pub fn into_info(self) -> RateLimitInfo {
        self.info
    }

    /// Response headers describing this decision.
    pub fn to_headers(&self) -> Vec<(&'static str, String)> {
        RateLimitHeaders::from(self).to_vec()
    }
}

/// Information about the current rate limit state.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitInfo {
    /// Maximum requests allowed per window.
    pub limit: u64,
    /// Requests observed in the current window, including this one when it
    /// was counted.
    pub total_requests: u64,
    /// When the current window ends.
    pub expires_at: DateTime<Utc>,
    /// How long to wait before retrying (only set when rate limited).
    pub retry_after: Option<Duration>,
    /// Name of the algorithm that made this decision.
    pub algorithm: Option<&'static str>,
}

impl RateLimitInfo {
    /// Create a new rate limit info.
    pub fn new(limit: u64, total_requests: u64, expires_at: DateTime<Utc>) -> Self {
        Self {
            limit,
            total_requests,
            expires_at,
            retry_after: None,
            algorithm: None,
        }
    }

    /// Set the retry-after duration.
    pub fn with_retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    /// Set the algorithm name.
    pub fn with_algorithm(mut self, name: &'static str) -> Self {
        self.algorithm = Some(name);
        self
    }

    /// Requests left in the current window.
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.total_requests)
    }

    /// The expiration rendered as RFC 3339 text, e.g. `2024-01-01T01:00:00Z`.
    pub fn expires_at_rfc3339(&self) -> String {
        self.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}
