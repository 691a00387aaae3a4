//! Composite key for combining multiple extractors.

use crate::error::Result;
use crate::key::Key;

/// Combine two key extractors into a composite key.
///
/// The resulting key is formatted as `"{key1}:{key2}"`. Extraction fails if
/// either part fails.
///
/// # Example
///
/// ```ignore
/// use quota_gate::key::{CompositeKey, IpKey, PathKey};
///
/// // Rate limit by IP + path
/// let key = CompositeKey::new(IpKey::new(), PathKey::new());
/// // Results in keys like "ip:192.168.1.1:path:/api/users"
/// ```
#[derive(Debug, Clone)]
pub struct CompositeKey<K1, K2> {
    first: K1,
    second: K2,
    separator: &'static str,
}

impl<K1, K2> CompositeKey<K1, K2> {
    /// Create a new composite key with default separator `:`.
    pub fn new(first: K1, second: K2) -> Self {
        Self {
            first,
            second,
            separator: ":",
        }
    }

    /// Create a new composite key with custom separator.
    pub fn with_separator(first: K1, second: K2, separator: &'static str) -> Self {
        Self {
            first,
            second,
            separator,
        }
    }
}

impl<R, K1, K2> Key<R> for CompositeKey<K1, K2>
where
    K1: Key<R>,
    K2: Key<R>,
{
    fn extract(&self, request: &R) -> Result<String> {
        let k1 = self.first.extract(request)?;
        let k2 = self.second.extract(request)?;
        Ok(format!("{}{}{}", k1, self.separator, k2))
    }

    fn name(&self) -> &'static str {
        "composite"
    }
}

/// Either key - use first if available, otherwise second.
#[derive(Debug, Clone)]
pub struct EitherKey<K1, K2> {
    primary: K1,
    fallback: K2,
}

impl<K1, K2> EitherKey<K1, K2> {
    /// Create a new either key.
    ///
    /// Uses primary if it extracts successfully, otherwise falls back to secondary.
    pub fn new(primary: K1, fallback: K2) -> Self {
        Self { primary, fallback }
    }
}

impl<R, K1, K2> Key<R> for EitherKey<K1, K2>
where
    K1: Key<R>,
    K2: Key<R>,
{
    fn extract(&self, request: &R) -> Result<String> {
        self.primary
            .extract(request)
            .or_else(|_| self.fallback.extract(request))
    }

    fn name(&self) -> &'static str {
        "either"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{FnKey, StaticKey};

    fn missing() -> FnKey<fn(&()) -> Option<String>> {
        FnKey::new("missing", |_: &()| None)
    }

    #[test]
    fn test_composite_key() {
        let key = CompositeKey::new(StaticKey::new("ip"), StaticKey::new("path"));
        assert_eq!(key.extract(&()).unwrap(), "ip:path");
    }

    #[test]
    fn test_composite_key_fails_if_any_part_fails() {
        let key = CompositeKey::new(StaticKey::new("ip"), missing());
        assert!(key.extract(&()).is_err());
    }

    #[test]
    fn test_either_key_primary() {
        let key = EitherKey::new(StaticKey::new("primary"), StaticKey::new("fallback"));
        assert_eq!(key.extract(&()).unwrap(), "primary");
    }

    #[test]
    fn test_either_key_fallback() {
        let key = EitherKey::new(missing(), StaticKey::new("fallback"));
        assert_eq!(key.extract(&()).unwrap(), "fallback");
    }
}
