use std::sync::Arc;

use courier_backend::Backend as BackendTrait;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::serialization::BackendConfig;

/// In-memory store limited by entry count or by approximate byte size.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
pub struct Moka {
    #[serde(default)]
    pub max_entries: Option<u64>,
    #[serde(default)]
    pub max_bytes: Option<u64>,
    /// Optional name for this backend (used in tracing).
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub eviction: Option<Eviction>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum Eviction {
    TinyLfu,
    Lru,
}

/// Validated store capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Entries(u64),
    Bytes(u64),
}

impl Moka {
    /// Returns the capacity, requiring exactly one non-zero limit.
    pub fn capacity(&self) -> Result<Capacity, ConfigError> {
        match (self.max_entries, self.max_bytes) {
            (Some(_), Some(_)) => Err(ConfigError::InvalidCacheConfiguration(
                "max_entries and max_bytes are mutually exclusive".to_owned(),
            )),
            (None, None) => Err(ConfigError::InvalidCacheConfiguration(
                "one of max_entries or max_bytes is required".to_owned(),
            )),
            (Some(0), None) | (None, Some(0)) => Err(ConfigError::InvalidCacheConfiguration(
                "capacity must be greater than zero".to_owned(),
            )),
            (Some(entries), None) => Ok(Capacity::Entries(entries)),
            (None, Some(bytes)) => Ok(Capacity::Bytes(bytes)),
        }
    }
}

impl BackendConfig<Moka> {
    #[cfg(feature = "moka")]
    pub fn into_backend(self) -> Result<Arc<dyn BackendTrait + Send + 'static>, ConfigError> {
        use courier_moka::{EvictionPolicy, MokaBackend};

        let capacity = self.backend.capacity()?;
        let serializer = self.value.format.to_serializer();
        let eviction = self.backend.eviction.map(|eviction| match eviction {
            Eviction::TinyLfu => EvictionPolicy::tiny_lfu(),
            Eviction::Lru => EvictionPolicy::lru(),
        });

        let mut builder = MokaBackend::builder().value_format(serializer);
        if let Some(name) = self.backend.name {
            builder = builder.name(name);
        }
        if let Some(policy) = eviction {
            builder = builder.eviction_policy(policy);
        }

        let backend: Arc<dyn BackendTrait + Send + 'static> = match capacity {
            Capacity::Entries(entries) => Arc::new(builder.max_entries(entries).build()),
            Capacity::Bytes(bytes) => Arc::new(builder.max_bytes(bytes).build()),
        };
        Ok(backend)
    }

    #[cfg(not(feature = "moka"))]
    pub fn into_backend(self) -> Result<Arc<dyn BackendTrait + Send + 'static>, ConfigError> {
        self.backend.capacity()?;
        Err(ConfigError::BackendNotAvailable("Moka".to_string()))
    }
}
