//! Encoding of hit counters.
//!
//! Counters are stored as ASCII decimal bytes, independent of the store's
//! value format, so any store can increment them without knowing the format.

use courier_core::Raw;

use crate::BackendError;

/// Encodes a counter value.
pub fn encode(value: u64) -> Raw {
    Raw::from(value.to_string())
}

/// Decodes a counter value.
pub fn decode(data: &[u8]) -> Result<u64, BackendError> {
    std::str::from_utf8(data)
        .map_err(|error| BackendError::InternalError(Box::new(error)))?
        .trim()
        .parse::<u64>()
        .map_err(|error| BackendError::InternalError(Box::new(error)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_roundtrip() {
        assert_eq!(&encode(42)[..], b"42");
        assert_eq!(decode(b"42").unwrap(), 42);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(decode(b"forty-two").is_err());
    }
}
