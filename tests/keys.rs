//! Integration tests for key extractors.

use quota_gate::key::{CompositeKey, EitherKey, FnKey, Key, StaticKey};
use tokio_test::{assert_err, assert_ok};

#[test]
fn test_composite_key_two_parts() {
    let key = CompositeKey::new(StaticKey::new("user:123"), StaticKey::new("/api/data"));

    assert_eq!(assert_ok!(key.extract(&())), "user:123:/api/data");
}

#[test]
fn test_composite_key_with_separator() {
    let key = CompositeKey::with_separator(StaticKey::new("a"), StaticKey::new("b"), "|");

    assert_eq!(assert_ok!(key.extract(&())), "a|b");
}

#[test]
fn test_either_key_uses_primary() {
    let key = EitherKey::new(StaticKey::new("primary"), StaticKey::new("fallback"));

    assert_eq!(assert_ok!(key.extract(&())), "primary");
}

#[test]
fn test_either_key_falls_back_on_error() {
    let missing: FnKey<fn(&()) -> Option<String>> = FnKey::new("user", |_: &()| None);
    let key = EitherKey::new(missing, StaticKey::new("anonymous"));

    assert_eq!(assert_ok!(key.extract(&())), "anonymous");
}

#[test]
fn test_fn_key_rejects_empty_key() {
    let key: FnKey<fn(&&str) -> Option<String>> =
        FnKey::new("tenant", |s: &&str| Some(s.to_string()));

    assert_eq!(assert_ok!(key.extract(&"acme")), "acme");

    let err = assert_err!(key.extract(&""));
    assert!(err.is_client_error());
}

#[cfg(feature = "axum")]
mod http_requests {
    use std::net::SocketAddr;

    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use http::{HeaderValue, Request};
    use quota_gate::key::{CompositeKey, HeaderKey, HeadersKey, IpKey, Key, PathKey};
    use quota_gate::RateLimitError;
    use tokio_test::{assert_err, assert_ok};

    fn request(headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri("/albums/1");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_headers_key_single_header() {
        let key = HeadersKey::new(["userId"]);
        let req = request(&[("userId", "  42  ")]);

        assert_eq!(assert_ok!(key.extract(&req)), "42");
    }

    #[test]
    fn test_headers_key_joins_in_configured_order() {
        let key = HeadersKey::new(["tenant", "userId"]);
        let req = request(&[("userId", "42"), ("tenant", "acme")]);

        assert_eq!(assert_ok!(key.extract(&req)), "acme-42");
    }

    #[test]
    fn test_headers_key_missing_header_message() {
        let key = HeadersKey::new(["userId"]);

        let err = assert_err!(key.extract(&request(&[])));
        match err {
            RateLimitError::KeyExtraction(message) => {
                assert_eq!(message, "the header userId must have a value set")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_headers_key_blank_header() {
        let key = HeadersKey::new(["userId"]);

        assert_err!(key.extract(&request(&[("userId", "   ")])));
    }

    #[test]
    fn test_headers_key_accepts_non_ascii_values() {
        let key = HeadersKey::new(["userId"]);
        let mut req = request(&[]);
        req.headers_mut().insert(
            "userId",
            HeaderValue::from_bytes(" José ".as_bytes()).unwrap(),
        );

        assert_eq!(assert_ok!(key.extract(&req)), "José");
    }

    #[test]
    fn test_headers_key_keeps_raw_bytes_distinct() {
        let key = HeadersKey::new(["userId"]);
        let mut latin1 = request(&[]);
        latin1
            .headers_mut()
            .insert("userId", HeaderValue::from_bytes(b"Jos\xe9").unwrap());
        let mut other = request(&[]);
        other
            .headers_mut()
            .insert("userId", HeaderValue::from_bytes(b"Jos\xe8").unwrap());

        let first = assert_ok!(key.extract(&latin1));
        let second = assert_ok!(key.extract(&other));
        assert_eq!(first, "Jos\\xe9");
        assert_ne!(first, second);
    }

    #[test]
    fn test_header_key_is_case_insensitive() {
        let key = HeaderKey::api_key();
        let req = request(&[("X-API-Key", "secret")]);

        assert_eq!(assert_ok!(key.extract(&req)), "header:x-api-key:secret");
    }

    #[test]
    fn test_ip_key_uses_connect_info() {
        let key = IpKey::new();
        let mut req = request(&[]);
        req.extensions_mut()
            .insert(ConnectInfo("127.0.0.1:8080".parse::<SocketAddr>().unwrap()));

        assert_eq!(assert_ok!(key.extract(&req)), "ip:127.0.0.1");
    }

    #[test]
    fn test_ip_key_without_address_fails() {
        assert_err!(IpKey::new().extract(&request(&[])));
    }

    #[test]
    fn test_composite_of_headers_and_path() {
        let key = CompositeKey::new(HeadersKey::new(["userId"]), PathKey::new());
        let req = request(&[("userId", "42")]);

        assert_eq!(assert_ok!(key.extract(&req)), "42:path:/albums/1");
    }
}
