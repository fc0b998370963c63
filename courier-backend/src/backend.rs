use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::{CacheKey, CacheValue, Raw};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    BackendError, DeleteStatus, counter,
    format::{Format, FormatExt, JsonFormat},
};

pub type BackendResult<T> = Result<T, BackendError>;

/// Raw key/value store with per-entry expiry.
///
/// Expiry is carried by the value itself ([`CacheValue::expire`]); a store
/// must stop returning an entry once it has passed.
#[async_trait]
pub trait Backend: Sync + Send {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheValue<Raw>>>;

    async fn write(&self, key: &CacheKey, value: CacheValue<Raw>) -> BackendResult<()>;

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus>;

    /// Removes every entry.
    async fn clear(&self) -> BackendResult<()>;

    /// Increments the counter stored at `key` and returns the new value.
    ///
    /// A missing counter counts from zero. The default implementation is a
    /// read followed by a write; stores with an atomic primitive override it.
    async fn increment(&self, key: &CacheKey) -> BackendResult<u64> {
        let (current, expire) = match self.read(key).await? {
            Some(value) => {
                let (meta, data) = value.into_parts();
                (counter::decode(&data)?, meta.expire)
            }
            None => (0, None),
        };
        let next = current.saturating_add(1);
        self.write(key, CacheValue::new(counter::encode(next), expire))
            .await?;
        Ok(next)
    }

    /// Returns the name of this backend, used in traces.
    fn name(&self) -> &str {
        "backend"
    }

    fn value_format(&self) -> &dyn Format {
        &JsonFormat
    }
}

#[async_trait]
impl Backend for &dyn Backend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheValue<Raw>>> {
        (*self).read(key).await
    }

    async fn write(&self, key: &CacheKey, value: CacheValue<Raw>) -> BackendResult<()> {
        (*self).write(key, value).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (*self).remove(key).await
    }

    async fn clear(&self) -> BackendResult<()> {
        (*self).clear().await
    }

    async fn increment(&self, key: &CacheKey) -> BackendResult<u64> {
        (*self).increment(key).await
    }

    fn name(&self) -> &str {
        (*self).name()
    }

    fn value_format(&self) -> &dyn Format {
        (*self).value_format()
    }
}

#[async_trait]
impl Backend for Box<dyn Backend> {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheValue<Raw>>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &CacheKey, value: CacheValue<Raw>) -> BackendResult<()> {
        (**self).write(key, value).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (**self).remove(key).await
    }

    async fn clear(&self) -> BackendResult<()> {
        (**self).clear().await
    }

    async fn increment(&self, key: &CacheKey) -> BackendResult<u64> {
        (**self).increment(key).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn value_format(&self) -> &dyn Format {
        (**self).value_format()
    }
}

#[async_trait]
impl Backend for Arc<dyn Backend + Send + 'static> {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheValue<Raw>>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &CacheKey, value: CacheValue<Raw>) -> BackendResult<()> {
        (**self).write(key, value).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (**self).remove(key).await
    }

    async fn clear(&self) -> BackendResult<()> {
        (**self).clear().await
    }

    async fn increment(&self, key: &CacheKey) -> BackendResult<u64> {
        (**self).increment(key).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn value_format(&self) -> &dyn Format {
        (**self).value_format()
    }
}

/// High-level cache backend trait with typed operations.
///
/// This trait provides typed `get`, `set`, and `delete` operations that handle
/// serialization/deserialization through the backend's value format.
pub trait CacheBackend: Backend {
    fn get<T>(
        &self,
        key: &CacheKey,
    ) -> impl Future<Output = BackendResult<Option<CacheValue<T>>>> + Send
    where
        T: DeserializeOwned + Send,
    {
        async move {
            match self.read(key).await? {
                Some(value) => {
                    let (meta, raw_data) = value.into_parts();
                    let data: T = self.value_format().deserialize(&raw_data)?;
                    tracing::trace!(backend = self.name(), %key, "cache entry decoded");
                    Ok(Some(CacheValue::new(data, meta.expire)))
                }
                None => Ok(None),
            }
        }
    }

    fn set<T>(
        &self,
        key: &CacheKey,
        value: &CacheValue<T>,
    ) -> impl Future<Output = BackendResult<()>> + Send
    where
        T: Serialize + Sync,
    {
        async move {
            let serialized_value = self.value_format().serialize(value.data())?;
            self.write(key, CacheValue::new(serialized_value, value.expire()))
                .await
        }
    }

    fn delete(&self, key: &CacheKey) -> impl Future<Output = BackendResult<DeleteStatus>> + Send {
        async move { self.remove(key).await }
    }

    /// Overwrites the counter at `key`. Later increments keep `expire`.
    fn set_counter(
        &self,
        key: &CacheKey,
        value: u64,
        expire: Option<DateTime<Utc>>,
    ) -> impl Future<Output = BackendResult<()>> + Send {
        async move {
            self.write(key, CacheValue::new(counter::encode(value), expire))
                .await
        }
    }
}

// Explicit CacheBackend implementations for trait objects
// These use the default implementations from the trait
impl CacheBackend for &dyn Backend {}

impl CacheBackend for Box<dyn Backend> {}

impl CacheBackend for Arc<dyn Backend + Send + 'static> {}
