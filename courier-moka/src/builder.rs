//! Builder for configuring [`MokaBackend`].

use std::time::{Duration, Instant};

use chrono::Utc;
use courier_backend::format::{Format, JsonFormat};
use courier_core::{CacheKey, CacheValue, Raw};
use moka::Expiry;
use moka::future::{Cache, CacheBuilder};
use moka::policy::EvictionPolicy;

use crate::backend::MokaBackend;

/// Approximate per-entry overhead of a key and its metadata, in bytes.
const ENTRY_OVERHEAD: usize = 96;

/// Expiry policy that reads the TTL from [`CacheValue::expire`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Expiration;

impl Expiry<CacheKey, CacheValue<Raw>> for Expiration {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &CacheValue<Raw>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Self::remaining(value)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &CacheValue<Raw>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        // The new value's expiry always wins over the old one.
        Self::remaining(value)
    }
}

impl Expiration {
    fn remaining(value: &CacheValue<Raw>) -> Option<Duration> {
        value.expire().map(|expiration| {
            let millis = (expiration - Utc::now()).num_milliseconds();
            if millis <= 0 {
                Duration::ZERO
            } else {
                Duration::from_millis(millis as u64)
            }
        })
    }
}

/// Marker type: capacity has not been configured yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapacity;

/// Marker type: the cache holds at most `n` entries.
#[derive(Debug, Clone, Copy)]
pub struct EntryCapacity(pub(crate) u64);

/// Marker type: the cache holds approximately `n` bytes of keys and values.
#[derive(Debug, Clone, Copy)]
pub struct ByteCapacity(pub(crate) u64);

/// Builder for a [`MokaBackend`].
///
/// `build()` is only available once a capacity has been chosen with
/// [`max_entries`](Self::max_entries) or [`max_bytes`](Self::max_bytes).
///
/// ```
/// use courier_moka::{EvictionPolicy, MokaBackend};
///
/// let backend = MokaBackend::builder()
///     .name("responses")
///     .max_bytes(16 * 1024 * 1024)
///     .eviction_policy(EvictionPolicy::lru())
///     .build();
/// ```
pub struct MokaBackendBuilder<Cap, S = JsonFormat>
where
    S: Format,
{
    capacity: Cap,
    serializer: S,
    name: String,
    eviction_policy: Option<EvictionPolicy>,
}

impl MokaBackendBuilder<NoCapacity, JsonFormat> {
    /// Creates a new builder with no capacity configured.
    pub fn new() -> Self {
        Self {
            capacity: NoCapacity,
            serializer: JsonFormat,
            name: "moka".to_owned(),
            eviction_policy: None,
        }
    }
}

impl Default for MokaBackendBuilder<NoCapacity, JsonFormat> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Format> MokaBackendBuilder<NoCapacity, S> {
    /// Limits the cache by entry count.
    pub fn max_entries(self, capacity: u64) -> MokaBackendBuilder<EntryCapacity, S> {
        MokaBackendBuilder {
            capacity: EntryCapacity(capacity),
            serializer: self.serializer,
            name: self.name,
            eviction_policy: self.eviction_policy,
        }
    }

    /// Limits the cache by the approximate size of stored keys and values.
    pub fn max_bytes(self, bytes: u64) -> MokaBackendBuilder<ByteCapacity, S> {
        MokaBackendBuilder {
            capacity: ByteCapacity(bytes),
            serializer: self.serializer,
            name: self.name,
            eviction_policy: self.eviction_policy,
        }
    }
}

impl<Cap, S: Format> MokaBackendBuilder<Cap, S> {
    /// Sets the name reported in traces. Default: `"moka"`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the eviction policy.
    ///
    /// Defaults to TinyLFU for entry capacity and LRU for byte capacity.
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = Some(policy);
        self
    }

    /// Sets the serialization format for cached responses.
    pub fn value_format<NewS: Format>(self, serializer: NewS) -> MokaBackendBuilder<Cap, NewS> {
        MokaBackendBuilder {
            capacity: self.capacity,
            serializer,
            name: self.name,
            eviction_policy: self.eviction_policy,
        }
    }
}

impl<S: Format> MokaBackendBuilder<EntryCapacity, S> {
    /// Builds the backend with entry-count capacity.
    pub fn build(self) -> MokaBackend<S> {
        let policy = self
            .eviction_policy
            .unwrap_or_else(EvictionPolicy::tiny_lfu);
        let cache: Cache<CacheKey, CacheValue<Raw>> = CacheBuilder::new(self.capacity.0)
            .name(&self.name)
            .eviction_policy(policy)
            .expire_after(Expiration)
            .build();

        MokaBackend {
            cache,
            serializer: self.serializer,
            name: self.name,
        }
    }
}

impl<S: Format> MokaBackendBuilder<ByteCapacity, S> {
    /// Builds the backend with byte capacity.
    pub fn build(self) -> MokaBackend<S> {
        let policy = self.eviction_policy.unwrap_or_else(EvictionPolicy::lru);
        let cache: Cache<CacheKey, CacheValue<Raw>> = CacheBuilder::new(self.capacity.0)
            .name(&self.name)
            .weigher(byte_weigher)
            .eviction_policy(policy)
            .expire_after(Expiration)
            .build();

        MokaBackend {
            cache,
            serializer: self.serializer,
            name: self.name,
        }
    }
}

fn byte_weigher(key: &CacheKey, value: &CacheValue<Raw>) -> u32 {
    let size = ENTRY_OVERHEAD + key.prefix().len() + key.digest().len() + value.data().len();
    size.min(u32::MAX as usize) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_ttl_is_zero_for_past_expiry() {
        let value = CacheValue::new(Raw::new(), Some(Utc::now() - chrono::Duration::seconds(5)));
        assert_eq!(Expiration::remaining(&value), Some(Duration::ZERO));
    }

    #[test]
    fn remaining_ttl_is_none_without_expiry() {
        let value = CacheValue::new(Raw::new(), None);
        assert_eq!(Expiration::remaining(&value), None);
    }

    #[test]
    fn weigher_counts_key_and_payload() {
        let key = CacheKey::new("abcd").with_prefix("x-");
        let value = CacheValue::new(Raw::from_static(b"0123456789"), None);
        assert_eq!(
            byte_weigher(&key, &value),
            (ENTRY_OVERHEAD + 2 + 4 + 10) as u32
        );
    }
}
