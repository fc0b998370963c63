use courier_core::Raw;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

mod json;
mod ron;

pub use json::JsonFormat;
pub use ron::RonFormat;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error(transparent)]
    Serialize(Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Deserialize(Box<dyn std::error::Error + Send + Sync>),
}

/// Unique identifier for format types, used to compare format equality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTypeId {
    Json,
    Ron,
    /// For user-defined custom formats. The string should be a unique identifier.
    Custom(&'static str),
}

/// Object-safe format trait (uses erased-serde for type erasure)
/// This trait can be used with `&dyn Format` for dynamic dispatch
pub trait Format: std::fmt::Debug + Send + Sync {
    /// Provides access to a serializer via a callback to avoid lifetime issues
    fn with_serializer(
        &self,
        f: &mut dyn FnMut(&mut dyn erased_serde::Serializer) -> Result<(), FormatError>,
    ) -> Result<Raw, FormatError>;

    /// Provides access to a deserializer via a callback to avoid lifetime issues
    fn with_deserializer(
        &self,
        data: &[u8],
        f: &mut dyn FnMut(&mut dyn erased_serde::Deserializer<'_>) -> Result<(), FormatError>,
    ) -> Result<(), FormatError>;

    /// Clone this format into a box (for object safety)
    fn clone_box(&self) -> Box<dyn Format>;

    /// Returns a unique identifier for this format type.
    fn format_type_id(&self) -> FormatTypeId;
}

/// Extension trait providing generic serialize/deserialize methods
/// This is automatically implemented for all Format types
pub trait FormatExt: Format {
    fn serialize<T>(&self, value: &T) -> Result<Raw, FormatError>
    where
        T: Serialize,
    {
        self.with_serializer(&mut |serializer| {
            let erased_value = value as &dyn erased_serde::Serialize;
            erased_value
                .erased_serialize(serializer)
                .map_err(|e| FormatError::Serialize(Box::new(e)))
        })
    }

    fn deserialize<T>(&self, data: &[u8]) -> Result<T, FormatError>
    where
        T: DeserializeOwned,
    {
        let mut result: Option<T> = None;
        self.with_deserializer(data, &mut |deserializer| {
            let value: T = erased_serde::deserialize(deserializer)
                .map_err(|e| FormatError::Deserialize(Box::new(e)))?;
            result = Some(value);
            Ok(())
        })?;

        result.ok_or_else(|| {
            FormatError::Deserialize(Box::new(std::io::Error::other(
                "deserialization produced no result",
            )))
        })
    }
}

// Blanket implementation: all Formats automatically get generic methods
impl<T: Format + ?Sized> FormatExt for T {}

impl Clone for Box<dyn Format> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl Format for Box<dyn Format> {
    fn with_serializer(
        &self,
        f: &mut dyn FnMut(&mut dyn erased_serde::Serializer) -> Result<(), FormatError>,
    ) -> Result<Raw, FormatError> {
        (**self).with_serializer(f)
    }

    fn with_deserializer(
        &self,
        data: &[u8],
        f: &mut dyn FnMut(&mut dyn erased_serde::Deserializer<'_>) -> Result<(), FormatError>,
    ) -> Result<(), FormatError> {
        (**self).with_deserializer(data, f)
    }

    fn clone_box(&self) -> Box<dyn Format> {
        (**self).clone_box()
    }

    fn format_type_id(&self) -> FormatTypeId {
        (**self).format_type_id()
    }
}
