//! Cache status reported on responses.

use http::{HeaderName, HeaderValue};

/// Default header name for cache status (SAVED/HIT/MISS).
///
/// The value is `x-cache-status`. Use builder methods on the HTTP cache
/// to customize the header name.
pub const DEFAULT_CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache-status");

/// Default header name for the hit counter, also used as the key prefix of
/// the counter entry.
pub const DEFAULT_CACHE_HITS_HEADER: HeaderName = HeaderName::from_static("x-cache-hits");

/// How a response passed through the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStatus {
    /// The response was written to the cache. Only seen on stored copies.
    Saved,
    /// The response was served from the cache.
    Hit,
    /// The response came from the transport.
    #[default]
    Miss,
}

impl CacheStatus {
    /// Returns the status as it appears in the header.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Saved => "SAVED",
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }

    /// Returns the status as a header value.
    pub fn header_value(&self) -> HeaderValue {
        HeaderValue::from_static(self.as_str())
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
