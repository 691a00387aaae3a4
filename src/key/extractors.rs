//! Pre-built key extractors for common patterns.
//!
//! These extractors are generic and can work with any request type
//! that provides the necessary data through traits.

use std::borrow::Cow;
use std::net::IpAddr;

use crate::error::{RateLimitError, Result};
use crate::key::Key;

// ============================================================================
// Request Info Traits
// ============================================================================

/// Trait for requests that have an IP address.
pub trait HasIpAddr {
    /// Get the client IP address.
    fn client_ip(&self) -> Option<IpAddr>;
}

/// Trait for requests that have a path.
pub trait HasPath {
    /// Get the request path.
    fn path(&self) -> &str;
}

/// Trait for requests that have headers.
pub trait HasHeaders {
    /// Get a header value by name.
    fn header(&self, name: &str) -> Option<Cow<'_, str>>;
}

#[cfg(feature = "axum")]
mod http_request {
    use std::borrow::Cow;
    use std::net::{IpAddr, SocketAddr};

    use axum::extract::ConnectInfo;
    use http::Request;

    use super::{HasHeaders, HasIpAddr, HasPath};

    impl<B> HasPath for Request<B> {
        fn path(&self) -> &str {
            self.uri().path()
        }
    }

    impl<B> HasHeaders for Request<B> {
        /// Values that are not UTF-8 are kept distinct by escaping their bytes.
        fn header(&self, name: &str) -> Option<Cow<'_, str>> {
            let value = self.headers().get(name)?.as_bytes();
            Some(match std::str::from_utf8(value) {
                Ok(text) => Cow::Borrowed(text),
                Err(_) => Cow::Owned(value.escape_ascii().to_string()),
            })
        }
    }

    impl<B> HasIpAddr for Request<B> {
        /// The peer address recorded by `into_make_service_with_connect_info`.
        fn client_ip(&self) -> Option<IpAddr> {
            self.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        }
    }
}

/// Read a header, trimmed, failing when it is absent or blank.
fn required_header<R: HasHeaders>(request: &R, name: &str) -> Result<String> {
    request
        .header(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| RateLimitError::key_extraction(format!("the header {name} must have a value set")))
}

// ============================================================================
// IP-based Extractors
// ============================================================================

/// Extract key from client IP address.
#[derive(Debug, Clone, Default)]
pub struct IpKey {
    /// Header to check for real IP (e.g., X-Forwarded-For).
    real_ip_header: Option<&'static str>,
}

impl IpKey {
    /// Create a new IP key extractor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use X-Forwarded-For header to get real IP behind proxy.
    pub fn with_forwarded_for() -> Self {
        Self {
            real_ip_header: Some("x-forwarded-for"),
        }
    }

    /// Use X-Real-IP header.
    pub fn with_real_ip() -> Self {
        Self {
            real_ip_header: Some("x-real-ip"),
        }
    }

    /// Use a custom header for real IP.
    pub fn with_header(header: &'static str) -> Self {
        Self {
            real_ip_header: Some(header),
        }
    }
}

impl<R> Key<R> for IpKey
where
    R: HasIpAddr + HasHeaders,
{
    fn extract(&self, request: &R) -> Result<String> {
        // Try real IP header first if configured
        let forwarded = self
            .real_ip_header
            .and_then(|header| request.header(header))
            // X-Forwarded-For might have multiple IPs, take the first
            .and_then(|value| value.split(',').next().map(|ip| ip.trim().to_string()))
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return Ok(format!("ip:{}", ip));
        }

        // Fall back to direct IP
        request
            .client_ip()
            .map(|ip| format!("ip:{}", ip))
            .ok_or_else(|| RateLimitError::key_extraction("client IP address is unknown"))
    }

    fn name(&self) -> &'static str {
        "ip"
    }
}

// ============================================================================
// Path-based Extractors
// ============================================================================

/// Extract key from request path.
#[derive(Debug, Clone, Default)]
pub struct PathKey;

impl PathKey {
    /// Create a new path key extractor.
    pub fn new() -> Self {
        Self
    }
}

impl<R: HasPath> Key<R> for PathKey {
    fn extract(&self, request: &R) -> Result<String> {
        Ok(format!("path:{}", request.path()))
    }

    fn name(&self) -> &'static str {
        "path"
    }
}

// ============================================================================
// Header-based Extractors
// ============================================================================

/// Extract key from a specific header.
#[derive(Debug, Clone)]
pub struct HeaderKey {
    header_name: &'static str,
}

impl HeaderKey {
    /// Create a new header key extractor.
    pub fn new(header_name: &'static str) -> Self {
        Self { header_name }
    }

    /// Extract from Authorization header.
    pub fn authorization() -> Self {
        Self::new("authorization")
    }

    /// Extract from X-API-Key header.
    pub fn api_key() -> Self {
        Self::new("x-api-key")
    }
}

impl<R: HasHeaders> Key<R> for HeaderKey {
    fn extract(&self, request: &R) -> Result<String> {
        let value = required_header(request, self.header_name)?;
        Ok(format!("header:{}:{}", self.header_name, value))
    }

    fn name(&self) -> &'static str {
        "header"
    }
}

/// Compose one key from several required headers.
///
/// Values are trimmed and joined with `-` in the configured order, so
/// `userId: 42` and `tenant: acme` give `42-acme`. Every header must be
/// present and non-blank.
#[derive(Debug, Clone)]
pub struct HeadersKey {
    headers: Vec<String>,
    separator: &'static str,
}

impl HeadersKey {
    /// Create an extractor over the given header names.
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            separator: "-",
        }
    }

    /// Join values with a different separator.
    pub fn with_separator(mut self, separator: &'static str) -> Self {
        self.separator = separator;
        self
    }
}

impl<R: HasHeaders> Key<R> for HeadersKey {
    fn extract(&self, request: &R) -> Result<String> {
        if self.headers.is_empty() {
            return Err(RateLimitError::key_extraction("no headers configured for the rate limiting key"));
        }

        let values = self
            .headers
            .iter()
            .map(|name| required_header(request, name))
            .collect::<Result<Vec<_>>>()?;
        Ok(values.join(self.separator))
    }

    fn name(&self) -> &'static str {
        "headers"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::IpAddr;

    // Mock request for testing
    #[derive(Default)]
    struct MockRequest {
        ip: Option<IpAddr>,
        path: String,
        headers: HashMap<String, String>,
    }

    impl HasIpAddr for MockRequest {
        fn client_ip(&self) -> Option<IpAddr> {
            self.ip
        }
    }

    impl HasPath for MockRequest {
        fn path(&self) -> &str {
            &self.path
        }
    }

    impl HasHeaders for MockRequest {
        fn header(&self, name: &str) -> Option<Cow<'_, str>> {
            self.headers.get(name).map(|s| Cow::Borrowed(s.as_str()))
        }
    }

    fn with_headers(pairs: &[(&str, &str)]) -> MockRequest {
        MockRequest {
            headers: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_ip_key() {
        let key = IpKey::new();
        let req = MockRequest {
            ip: Some("192.168.1.1".parse().unwrap()),
            ..Default::default()
        };

        assert_eq!(key.extract(&req).unwrap(), "ip:192.168.1.1");
    }

    #[test]
    fn test_ip_key_with_forwarded_for() {
        let key = IpKey::with_forwarded_for();
        let mut req = with_headers(&[("x-forwarded-for", "203.0.113.50, 70.41.3.18")]);
        req.ip = Some("10.0.0.1".parse().unwrap());

        // Should use the first IP from X-Forwarded-For
        assert_eq!(key.extract(&req).unwrap(), "ip:203.0.113.50");
    }

    #[test]
    fn test_ip_key_unknown() {
        let key = IpKey::with_real_ip();
        assert!(key.extract(&MockRequest::default()).is_err());
    }

    #[test]
    fn test_path_key() {
        let key = PathKey::new();
        let req = MockRequest {
            path: "/api/users/123".into(),
            ..Default::default()
        };

        assert_eq!(key.extract(&req).unwrap(), "path:/api/users/123");
    }

    #[test]
    fn test_header_key() {
        let key = HeaderKey::api_key();
        let req = with_headers(&[("x-api-key", " secret-key ")]);

        assert_eq!(key.extract(&req).unwrap(), "header:x-api-key:secret-key");
    }

    #[test]
    fn test_headers_key_joins_trimmed_values() {
        let key = HeadersKey::new(["userId", "tenant"]);
        let req = with_headers(&[("userId", " 42 "), ("tenant", "acme")]);

        assert_eq!(key.extract(&req).unwrap(), "42-acme");
    }

    #[test]
    fn test_headers_key_missing_or_blank() {
        let key = HeadersKey::new(["userId", "tenant"]);

        let err = key.extract(&with_headers(&[("userId", "42")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Key extraction failed: the header tenant must have a value set"
        );

        let blank = with_headers(&[("userId", "   "), ("tenant", "acme")]);
        assert!(key.extract(&blank).is_err());
    }

    #[test]
    fn test_headers_key_requires_configuration() {
        let key = HeadersKey::new(Vec::<String>::new());
        assert!(key.extract(&MockRequest::default()).is_err());
    }
}
