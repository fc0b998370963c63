use bytes::Bytes;
use courier_core::Raw;

use super::{Format, FormatError, FormatTypeId};

/// RON (Rusty Object Notation) format - human-readable alternative to JSON
#[derive(Debug, Clone, Copy)]
pub struct RonFormat;

impl Format for RonFormat {
    fn with_serializer(
        &self,
        f: &mut dyn FnMut(&mut dyn erased_serde::Serializer) -> Result<(), FormatError>,
    ) -> Result<Raw, FormatError> {
        // RON writes to std::fmt::Write (String), JSON to std::io::Write (Vec<u8>)
        let mut buf = String::new();
        {
            let mut ser = ron::ser::Serializer::new(&mut buf, None)
                .map_err(|error| FormatError::Serialize(Box::new(error)))?;
            let mut erased = <dyn erased_serde::Serializer>::erase(&mut ser);
            f(&mut erased)?;
        }
        Ok(Bytes::from(buf.into_bytes()))
    }

    fn with_deserializer(
        &self,
        data: &[u8],
        f: &mut dyn FnMut(&mut dyn erased_serde::Deserializer<'_>) -> Result<(), FormatError>,
    ) -> Result<(), FormatError> {
        let s = std::str::from_utf8(data).map_err(|e| FormatError::Deserialize(Box::new(e)))?;
        let mut deser = ron::de::Deserializer::from_str(s)
            .map_err(|e| FormatError::Deserialize(Box::new(e)))?;
        let mut erased = <dyn erased_serde::Deserializer>::erase(&mut deser);
        f(&mut erased)?;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn Format> {
        Box::new(*self)
    }

    fn format_type_id(&self) -> FormatTypeId {
        FormatTypeId::Ron
    }
}
