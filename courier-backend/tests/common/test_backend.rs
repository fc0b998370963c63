//! Simple in-memory test backend implementation using DashMap.

use async_trait::async_trait;
use courier_backend::{Backend, BackendResult, CacheBackend, DeleteStatus};
use courier_core::{CacheKey, CacheValue, Raw};
use dashmap::DashMap;
use std::sync::Arc;

/// Simple in-memory backend for testing using DashMap.
///
/// This backend is thread-safe and can be cloned cheaply (Arc internally).
/// It relies on the default read+write `increment`.
#[derive(Clone)]
pub struct TestBackend {
    store: Arc<DashMap<CacheKey, CacheValue<Raw>>>,
}

impl TestBackend {
    /// Create a new empty test backend.
    pub fn new() -> Self {
        Self {
            store: Arc::new(DashMap::new()),
        }
    }

    /// Check if a key exists in the backend.
    pub fn has(&self, key: &CacheKey) -> bool {
        self.store.contains_key(key)
    }

    /// Get raw cache value with metadata for inspection.
    pub fn get_raw(&self, key: &CacheKey) -> Option<CacheValue<Raw>> {
        self.store.get(key).map(|v| v.clone())
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }
}

impl Default for TestBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for TestBackend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheValue<Raw>>> {
        Ok(self
            .store
            .get(key)
            .map(|v| v.clone())
            .filter(|value| !value.is_expired()))
    }

    async fn write(&self, key: &CacheKey, value: CacheValue<Raw>) -> BackendResult<()> {
        self.store.insert(key.clone(), value);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        let existed = self.store.remove(key).is_some();
        Ok(if existed {
            DeleteStatus::Deleted(1)
        } else {
            DeleteStatus::Missing
        })
    }

    async fn clear(&self) -> BackendResult<()> {
        self.store.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "test"
    }
}

impl CacheBackend for TestBackend {}
