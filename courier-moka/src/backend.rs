//! Moka store implementation.

use async_trait::async_trait;
use courier_backend::format::{Format, JsonFormat};
use courier_backend::{Backend, BackendError, BackendResult, DeleteStatus, counter};
use courier_core::{CacheKey, CacheValue, Raw};
use moka::future::Cache;

use crate::builder::{MokaBackendBuilder, NoCapacity};

/// In-memory cache store powered by Moka.
///
/// Entries expire at the timestamp carried by their [`CacheValue`]; Moka
/// evicts them through a per-entry expiry policy. Hit counters are
/// incremented atomically with Moka's entry API.
///
/// # Type Parameters
///
/// * `S` - Serialization format for cached responses. Default: [`JsonFormat`].
///
/// # Caveats
///
/// - Data is **not persisted**; the cache is lost on process restart
/// - Data is **not shared** across processes
#[derive(Clone)]
pub struct MokaBackend<S = JsonFormat>
where
    S: Format,
{
    pub(crate) cache: Cache<CacheKey, CacheValue<Raw>>,
    pub(crate) serializer: S,
    pub(crate) name: String,
}

impl<S: Format> std::fmt::Debug for MokaBackend<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaBackend")
            .field("name", &self.name)
            .field("cache", &self.cache)
            .field("serializer", &self.serializer)
            .finish()
    }
}

impl MokaBackend<JsonFormat> {
    /// Creates a new builder for `MokaBackend`.
    ///
    /// Capacity must be set with
    /// [`max_entries`](MokaBackendBuilder::max_entries) or
    /// [`max_bytes`](MokaBackendBuilder::max_bytes) before building.
    pub fn builder() -> MokaBackendBuilder<NoCapacity, JsonFormat> {
        MokaBackendBuilder::new()
    }
}

impl<S: Format> MokaBackend<S> {
    /// Returns the underlying Moka cache.
    pub fn cache(&self) -> &Cache<CacheKey, CacheValue<Raw>> {
        &self.cache
    }
}

#[async_trait]
impl<S> Backend for MokaBackend<S>
where
    S: Format + Send + Sync,
{
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheValue<Raw>>> {
        Ok(self.cache.get(key).await)
    }

    async fn write(&self, key: &CacheKey, value: CacheValue<Raw>) -> BackendResult<()> {
        self.cache.insert(key.clone(), value).await;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        match self.cache.remove(key).await {
            Some(_) => Ok(DeleteStatus::Deleted(1)),
            None => Ok(DeleteStatus::Missing),
        }
    }

    async fn clear(&self) -> BackendResult<()> {
        self.cache.invalidate_all();
        tracing::debug!(backend = %self.name, "cache cleared");
        Ok(())
    }

    async fn increment(&self, key: &CacheKey) -> BackendResult<u64> {
        let mut failure: Option<BackendError> = None;
        let entry = self
            .cache
            .entry(key.clone())
            .and_upsert_with(|existing| {
                let next = match existing {
                    Some(entry) => {
                        let value = entry.into_value();
                        match counter::decode(value.data()) {
                            Ok(current) => {
                                CacheValue::new(counter::encode(current + 1), value.expire())
                            }
                            Err(error) => {
                                failure = Some(error);
                                value
                            }
                        }
                    }
                    None => CacheValue::new(counter::encode(1), None),
                };
                std::future::ready(next)
            })
            .await;
        if let Some(error) = failure {
            return Err(error);
        }
        counter::decode(entry.value().data())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn value_format(&self) -> &dyn Format {
        &self.serializer
    }
}

impl<S> courier_backend::CacheBackend for MokaBackend<S> where S: Format + Send + Sync {}
