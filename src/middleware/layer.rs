//! Tower layer for rate limiting in Axum.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request, Response, StatusCode, header},
};
use serde::{Deserialize, Serialize};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::algorithm::Algorithm;
use crate::decision::Decision;
use crate::error::RateLimitError;
use crate::extensions::RateLimitExt;
use crate::key::Key;
use crate::quota::Quota;
use crate::storage::Storage;

/// Body of the 429 response.
pub const TOO_MANY_REQUESTS_MESSAGE: &str =
    "you have sent too many requests to this service, slow down please";

/// What the gateway does when the limiter itself fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Reject with `500 Internal Server Error`.
    #[default]
    Closed,
    /// Forward the request without rate limit metadata.
    Open,
}

/// Tower layer for rate limiting.
pub struct RateLimitLayer<S, A, K> {
    storage: Arc<S>,
    algorithm: A,
    quota: Quota,
    key_extractor: K,
    failure_policy: FailurePolicy,
}

impl<S, A, K> RateLimitLayer<S, A, K> {
    /// Create a new rate limit layer.
    pub fn new(storage: S, algorithm: A, quota: Quota, key_extractor: K) -> Self {
        Self::with_shared_storage(Arc::new(storage), algorithm, quota, key_extractor)
    }

    /// Create a layer over storage that other layers also use.
    pub fn with_shared_storage(storage: Arc<S>, algorithm: A, quota: Quota, key_extractor: K) -> Self {
        Self {
            storage,
            algorithm,
            quota,
            key_extractor,
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Choose what happens when the limiter fails.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// The quota applied by this layer.
    pub fn quota(&self) -> &Quota {
        &self.quota
    }

    /// The configured failure policy.
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }
}

impl<S, A, K> Clone for RateLimitLayer<S, A, K>
where
    A: Clone,
    K: Clone,
{
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            algorithm: self.algorithm.clone(),
            quota: self.quota.clone(),
            key_extractor: self.key_extractor.clone(),
            failure_policy: self.failure_policy,
        }
    }
}

impl<S, A, K, Inner> Layer<Inner> for RateLimitLayer<S, A, K>
where
    A: Clone,
    K: Clone,
{
    type Service = RateLimitService<S, A, K, Inner>;

    fn layer(&self, inner: Inner) -> Self::Service {
        RateLimitService {
            inner,
            storage: self.storage.clone(),
            algorithm: self.algorithm.clone(),
            quota: self.quota.clone(),
            key_extractor: self.key_extractor.clone(),
            failure_policy: self.failure_policy,
        }
    }
}

/// The rate limiting service.
pub struct RateLimitService<S, A, K, Inner> {
    inner: Inner,
    storage: Arc<S>,
    algorithm: A,
    quota: Quota,
    key_extractor: K,
    failure_policy: FailurePolicy,
}

impl<S, A, K, Inner> Clone for RateLimitService<S, A, K, Inner>
where
    A: Clone,
    K: Clone,
    Inner: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            storage: self.storage.clone(),
            algorithm: self.algorithm.clone(),
            quota: self.quota.clone(),
            key_extractor: self.key_extractor.clone(),
            failure_policy: self.failure_policy,
        }
    }
}

impl<S, A, K, Inner> Service<Request<Body>> for RateLimitService<S, A, K, Inner>
where
    S: Storage,
    A: Algorithm + Clone,
    K: Key<Request<Body>>,
    Inner: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    Inner::Future: Send,
{
    type Response = Response<Body>;
    type Error = Inner::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        // The clone may not be ready; keep the one that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let key = match self.key_extractor.extract(&request) {
            Ok(key) => key,
            Err(err) => {
                debug!(extractor = self.key_extractor.name(), error = %err, "rejecting request without a rate limit key");
                return Box::pin(async move { Ok(bad_request_response(&err)) });
            }
        };

        let storage = self.storage.clone();
        let algorithm = self.algorithm.clone();
        let quota = self.quota.clone();
        let failure_policy = self.failure_policy;

        Box::pin(async move {
            let decision = match algorithm.check_and_record(&*storage, &key, &quota).await {
                Ok(decision) => decision,
                Err(err) => match failure_policy {
                    FailurePolicy::Closed => {
                        warn!(key = %key, error = %err, "rate limiting failed, rejecting request");
                        return Ok(internal_error_response(&err));
                    }
                    FailurePolicy::Open => {
                        warn!(key = %key, error = %err, "rate limiting failed, forwarding request");
                        return inner.call(request).await;
                    }
                },
            };

            if decision.is_denied() {
                debug!(
                    key = %key,
                    total_requests = decision.info().total_requests,
                    "rate limit exceeded"
                );
                return Ok(rate_limited_response(&decision));
            }

            request
                .extensions_mut()
                .insert(RateLimitExt::new(key, quota, decision.clone()));
            let response = inner.call(request).await?;
            Ok(add_rate_limit_headers(response, &decision))
        })
    }
}

/// Add rate limit headers to a response.
fn add_rate_limit_headers(mut response: Response<Body>, decision: &Decision) -> Response<Body> {
    let headers = response.headers_mut();
    for (name, value) in decision.to_headers() {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            headers.insert(name, value);
        }
    }
    response
}

fn text_response(status: StatusCode, body: String) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Create a 400 Bad Request response for a request without a usable key.
fn bad_request_response(err: &RateLimitError) -> Response<Body> {
    let message = match err {
        RateLimitError::KeyExtraction(message) => message.clone(),
        other => other.to_string(),
    };
    text_response(
        StatusCode::BAD_REQUEST,
        format!("failed to collect rate limiting key from request: {message}"),
    )
}

/// Create a 500 Internal Server Error response for a failed evaluation.
fn internal_error_response(err: &RateLimitError) -> Response<Body> {
    text_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("failed to run rate limiting for request: {err}"),
    )
}

/// Create a 429 Too Many Requests response.
fn rate_limited_response(decision: &Decision) -> Response<Body> {
    let response = text_response(
        StatusCode::TOO_MANY_REQUESTS,
        TOO_MANY_REQUESTS_MESSAGE.to_string(),
    );
    add_rate_limit_headers(response, decision)
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::algorithm::FixedWindow;
    use crate::decision::RateLimitInfo;
    use crate::headers::names;
    use crate::key::GlobalKey;
    use crate::storage::MemoryStorage;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    #[test]
    fn test_layer_creation() {
        let layer = RateLimitLayer::new(
            MemoryStorage::new(),
            FixedWindow::new(),
            Quota::per_second(10),
            GlobalKey::new(),
        );

        assert_eq!(layer.quota().max_requests(), 10);
        assert_eq!(layer.failure_policy(), FailurePolicy::Closed);

        let layer = layer.with_failure_policy(FailurePolicy::Open);
        assert_eq!(layer.failure_policy(), FailurePolicy::Open);
    }

    #[test]
    fn test_rate_limited_response() {
        let expires = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let info = RateLimitInfo::new(1, 1, expires).with_retry_after(Duration::from_secs(60));
        let response = rate_limited_response(&Decision::denied(info));

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[names::STATE], "Deny");
        assert_eq!(response.headers()[names::TOTAL_REQUESTS], "1");
        assert_eq!(response.headers()[names::EXPIRES_AT], "2024-01-01T01:00:00Z");
        assert_eq!(response.headers()[names::RETRY_AFTER], "60");
    }

    #[tokio::test]
    async fn test_bad_request_uses_extraction_message() {
        let err = RateLimitError::key_extraction("the header userId must have a value set");
        let response = bad_request_response(&err);

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(
            &body[..],
            b"failed to collect rate limiting key from request: the header userId must have a value set"
        );
    }

    #[test]
    fn test_failure_policy_serde() {
        let policy: FailurePolicy = serde_json::from_str("\"open\"").unwrap();
        assert_eq!(policy, FailurePolicy::Open);
        assert_eq!(serde_json::to_string(&FailurePolicy::Closed).unwrap(), "\"closed\"");
    }
}
