use bytes::Bytes;
use courier_core::Raw;

use super::{Format, FormatError, FormatTypeId};

/// JSON format (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn with_serializer(
        &self,
        f: &mut dyn FnMut(&mut dyn erased_serde::Serializer) -> Result<(), FormatError>,
    ) -> Result<Raw, FormatError> {
        let mut buf = Vec::new();
        {
            let mut ser = serde_json::Serializer::new(&mut buf);
            let mut erased = <dyn erased_serde::Serializer>::erase(&mut ser);
            f(&mut erased)?;
        }
        Ok(Bytes::from(buf))
    }

    fn with_deserializer(
        &self,
        data: &[u8],
        f: &mut dyn FnMut(&mut dyn erased_serde::Deserializer<'_>) -> Result<(), FormatError>,
    ) -> Result<(), FormatError> {
        let mut deser = serde_json::Deserializer::from_slice(data);
        let mut erased = <dyn erased_serde::Deserializer>::erase(&mut deser);
        f(&mut erased)?;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn Format> {
        Box::new(*self)
    }

    fn format_type_id(&self) -> FormatTypeId {
        FormatTypeId::Json
    }
}
