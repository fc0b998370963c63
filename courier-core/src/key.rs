//! Cache key types and construction.
//!
//! This module provides the types used to address cached responses:
//!
//! - [`CacheKey`] - The key a response is stored under
//! - [`KeyGenerator`] - Turns a [`Request`] into a [`CacheKey`]
//! - [`DigestKeyGenerator`] - The default, digest based generator
//!
//! ## Key Structure
//!
//! A key is a digest plus an optional prefix. The prefix lets companion
//! entries live next to a response entry; the hit counter of a response is
//! stored under the same digest with the `x-cache-hits` prefix.
//!
//! ```
//! use courier_core::CacheKey;
//!
//! let key = CacheKey::new("3f2a");
//! assert_eq!(key.to_string(), "3f2a");
//!
//! let hits = key.with_prefix("x-cache-hits");
//! assert_eq!(hits.to_string(), "x-cache-hits3f2a");
//! assert_eq!(hits.digest(), key.digest());
//! ```
//!
//! ## Default Algorithm
//!
//! [`DigestKeyGenerator`] hashes
//! `uri ? query ~ header values joined by ~ ~ body` with SHA-256. The request
//! method is not part of the key, so a destructive request addresses the
//! same entry as its `GET` twin.
//!
//! ## Performance
//!
//! [`CacheKey`] uses `Arc` internally for cheap cloning - copying a key
//! only increments a reference count.

use sha2::{Digest, Sha256};
use smol_str::SmolStr;
use std::fmt;
use std::sync::Arc;

use crate::Request;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct CacheKeyInner {
    prefix: SmolStr,
    digest: SmolStr,
}

/// A cache key identifying a cached entry.
///
/// # Cheap Cloning
///
/// `CacheKey` wraps its data in [`Arc`], making `clone()` an O(1) operation.
/// Keys are cloned into backends on every write.
#[derive(Clone, Debug)]
pub struct CacheKey {
    inner: Arc<CacheKeyInner>,
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        // Fast path: same Arc pointer
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner == other.inner
    }
}

impl Eq for CacheKey {}

impl std::hash::Hash for CacheKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.inner.prefix, self.inner.digest)
    }
}

impl CacheKey {
    /// Creates a key without a prefix.
    pub fn new(digest: impl Into<SmolStr>) -> Self {
        CacheKey {
            inner: Arc::new(CacheKeyInner {
                prefix: SmolStr::default(),
                digest: digest.into(),
            }),
        }
    }

    /// Returns a key for a companion entry sharing this key's digest.
    pub fn with_prefix(&self, prefix: impl Into<SmolStr>) -> Self {
        CacheKey {
            inner: Arc::new(CacheKeyInner {
                prefix: prefix.into(),
                digest: self.inner.digest.clone(),
            }),
        }
    }

    /// Returns the key prefix, empty for response entries.
    pub fn prefix(&self) -> &str {
        &self.inner.prefix
    }

    /// Returns the digest part of the key.
    pub fn digest(&self) -> &str {
        &self.inner.digest
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        CacheKey::new(value)
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        CacheKey::new(value)
    }
}

/// Derives the cache key of a request.
///
/// Any `Fn(&Request) -> CacheKey` closure is a generator, so a custom
/// strategy can be handed to the cache without a new type:
///
/// ```
/// use courier_core::{CacheKey, KeyGenerator, Request};
///
/// let by_uri = |request: &Request| CacheKey::new(request.uri());
/// let key = by_uri.generate(&Request::get("/users"));
/// assert_eq!(key.to_string(), "/users");
/// ```
pub trait KeyGenerator: Send + Sync {
    /// Computes the key for `request`. Must be pure.
    fn generate(&self, request: &Request) -> CacheKey;
}

impl<F> KeyGenerator for F
where
    F: Fn(&Request) -> CacheKey + Send + Sync,
{
    fn generate(&self, request: &Request) -> CacheKey {
        self(request)
    }
}

/// Default key generator: SHA-256 over the request identity, hex encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestKeyGenerator;

impl DigestKeyGenerator {
    /// Creates the generator.
    pub fn new() -> Self {
        DigestKeyGenerator
    }
}

impl KeyGenerator for DigestKeyGenerator {
    fn generate(&self, request: &Request) -> CacheKey {
        let mut hasher = Sha256::new();
        hasher.update(request.uri().as_bytes());
        hasher.update(b"?");
        hasher.update(request.encoded_query().as_bytes());
        hasher.update(b"~");
        for (i, value) in request.headers().values().enumerate() {
            if i > 0 {
                hasher.update(b"~");
            }
            hasher.update(value.as_bytes());
        }
        hasher.update(b"~");
        hasher.update(request.body());
        CacheKey::new(hex::encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, Method, header};

    fn request() -> Request {
        Request::get("http://example.com/users?page=2&sort=name")
            .with_header(header::ACCEPT, HeaderValue::from_static("application/json"))
    }

    #[test]
    fn identical_requests_share_a_key() {
        let generator = DigestKeyGenerator::new();
        assert_eq!(
            generator.generate(&request()),
            generator.generate(&request())
        );
    }

    #[test]
    fn key_is_a_fixed_length_hex_digest() {
        let key = DigestKeyGenerator.generate(&request());
        assert_eq!(key.digest().len(), 64);
        assert!(key.digest().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn body_changes_the_key() {
        let generator = DigestKeyGenerator;
        let first = generator.generate(&request().with_body("a"));
        let second = generator.generate(&request().with_body("b"));
        assert_ne!(first, second);
    }

    #[test]
    fn query_and_headers_change_the_key() {
        let generator = DigestKeyGenerator;
        let base = generator.generate(&request());
        let other_query = generator.generate(&request().with_query("page", "3"));
        let other_header = generator.generate(
            &request().with_header(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en")),
        );
        assert_ne!(base, other_query);
        assert_ne!(base, other_header);
    }

    #[test]
    fn method_is_not_part_of_the_key() {
        let generator = DigestKeyGenerator;
        let post = request().with_method(Method::POST);
        assert_eq!(generator.generate(&request()), generator.generate(&post));
    }

    #[test]
    fn prefixed_key_differs_from_base() {
        let key = CacheKey::new("abc");
        let hits = key.with_prefix("x-cache-hits");
        assert_ne!(key, hits);
        assert_eq!(hits.prefix(), "x-cache-hits");
        assert_eq!(hits.to_string(), "x-cache-hitsabc");
    }
}
