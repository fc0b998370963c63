//! Cached value types with expiration metadata.
//!
//! - [`CacheValue`] - Cached data with an optional expire timestamp
//! - [`CacheMeta`] - Just the metadata without the data
//!
//! The expire timestamp is computed once, when the value is stored, from the
//! freshness lifetime of the response. Backends enforce it; nothing revises
//! it afterwards.
//!
//! ```
//! use courier_core::CacheValue;
//! use std::time::Duration;
//!
//! let value = CacheValue::with_ttl("cached data", Some(Duration::from_secs(3600)));
//! assert!(!value.is_expired());
//! assert!(value.ttl().unwrap() <= Duration::from_secs(3600));
//! ```

use chrono::{DateTime, Utc};
use std::time::Duration;

/// A cached value with expiration metadata.
///
/// # Type Parameter
///
/// * `T` - The cached data type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheValue<T> {
    data: T,
    expire: Option<DateTime<Utc>>,
}

impl<T> CacheValue<T> {
    /// Creates a new cache value with the given data and expire timestamp.
    ///
    /// `None` means the entry lives until the backend evicts it.
    pub fn new(data: T, expire: Option<DateTime<Utc>>) -> Self {
        CacheValue { data, expire }
    }

    /// Creates a value expiring `ttl` from now.
    ///
    /// A `ttl` reaching past the last representable date never expires.
    pub fn with_ttl(data: T, ttl: Option<Duration>) -> Self {
        let expire = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        CacheValue { data, expire }
    }

    /// Returns a reference to the cached data.
    #[inline]
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Returns when the data expires.
    #[inline]
    pub fn expire(&self) -> Option<DateTime<Utc>> {
        self.expire
    }

    /// Consumes the cache value and returns the inner data.
    pub fn into_inner(self) -> T {
        self.data
    }

    /// Consumes the cache value and returns metadata and data separately.
    pub fn into_parts(self) -> (CacheMeta, T) {
        (CacheMeta::new(self.expire), self.data)
    }

    /// Returns true once the expire timestamp has passed.
    pub fn is_expired(&self) -> bool {
        self.expire.is_some_and(|expire| expire <= Utc::now())
    }

    /// Calculate TTL (time-to-live) from the expire time.
    ///
    /// Returns `Some(Duration)` if there's a valid expire time in the future,
    /// or `None` if there's no expire time or it's already expired.
    pub fn ttl(&self) -> Option<Duration> {
        self.expire.and_then(|expire| {
            let duration = expire.signed_duration_since(Utc::now());
            if duration.num_seconds() > 0 {
                Some(Duration::from_secs(duration.num_seconds() as u64))
            } else {
                None
            }
        })
    }
}

/// Cache expiration metadata without the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheMeta {
    /// When the cached data expires and becomes invalid.
    pub expire: Option<DateTime<Utc>>,
}

impl CacheMeta {
    /// Creates new cache metadata with the given timestamp.
    pub fn new(expire: Option<DateTime<Utc>>) -> CacheMeta {
        CacheMeta { expire }
    }
}
