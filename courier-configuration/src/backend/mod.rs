//! Backend selection.
//!
//! ```yaml
//! type: Moka
//! max_entries: 10000
//! value:
//!   format: Ron
//! ```

use std::sync::Arc;

use courier_backend::Backend as BackendTrait;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

mod moka;
mod serialization;

pub use moka::{Capacity, Eviction, Moka};
pub use serialization::{BackendConfig, ValueFormat, ValueSerialization};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Backend {
    Moka(BackendConfig<Moka>),
}

impl Backend {
    pub fn into_backend(self) -> Result<Arc<dyn BackendTrait + Send + 'static>, ConfigError> {
        match self {
            Backend::Moka(config) => config.into_backend(),
        }
    }
}
