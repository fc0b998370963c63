use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use courier_backend::{Backend, BackendResult, CacheBackend, DeleteStatus};
use courier_core::{CacheKey, CacheValue, Raw};
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct BackendCounters {
    pub read_count: AtomicUsize,
    pub write_count: AtomicUsize,
    pub remove_count: AtomicUsize,
    pub clear_count: AtomicUsize,
}

#[derive(Clone, Debug)]
pub struct MockBackend {
    pub cache: Arc<DashMap<CacheKey, CacheValue<Raw>>>,
    pub counters: Arc<BackendCounters>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(DashMap::new()),
            counters: Arc::new(BackendCounters::default()),
        }
    }

    pub fn read_count(&self) -> usize {
        self.counters.read_count.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.counters.write_count.load(Ordering::SeqCst)
    }

    pub fn remove_count(&self) -> usize {
        self.counters.remove_count.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> usize {
        self.counters.clear_count.load(Ordering::SeqCst)
    }

    pub fn cache_entry_count(&self) -> usize {
        self.cache.len()
    }

    pub fn raw(&self, key: &CacheKey) -> Option<CacheValue<Raw>> {
        self.cache.get(key).map(|v| v.value().clone())
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheValue<Raw>>> {
        self.counters.read_count.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .cache
            .get(key)
            .map(|v| v.value().clone())
            .filter(|value| !value.is_expired()))
    }

    async fn write(&self, key: &CacheKey, value: CacheValue<Raw>) -> BackendResult<()> {
        self.counters.write_count.fetch_add(1, Ordering::SeqCst);
        self.cache.insert(key.clone(), value);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        self.counters.remove_count.fetch_add(1, Ordering::SeqCst);
        match self.cache.remove(key) {
            Some(_) => Ok(DeleteStatus::Deleted(1)),
            None => Ok(DeleteStatus::Missing),
        }
    }

    async fn clear(&self) -> BackendResult<()> {
        self.counters.clear_count.fetch_add(1, Ordering::SeqCst);
        self.cache.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

impl CacheBackend for MockBackend {}
