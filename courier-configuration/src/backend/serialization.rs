use courier_backend::format::{Format, JsonFormat, RonFormat};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct BackendConfig<T> {
    #[serde(default)]
    pub value: ValueFormat,
    #[serde(flatten)]
    pub backend: T,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
pub struct ValueFormat {
    #[serde(default)]
    pub format: ValueSerialization,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
pub enum ValueSerialization {
    #[default]
    Json,
    Ron,
}

impl ValueSerialization {
    /// Convert the configured value format into a backend serializer
    pub fn to_serializer(self) -> Box<dyn Format> {
        match self {
            ValueSerialization::Json => Box::new(JsonFormat),
            ValueSerialization::Ron => Box::new(RonFormat),
        }
    }
}
