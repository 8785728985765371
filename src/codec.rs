//! Codec Module
//!
//! Pluggable serialization of cached values to bytes.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Converts values to and from the bytes handed to the key-value store.
pub trait Codec: Send + Sync + 'static {
    /// Encodes a value.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Decodes a value previously produced by [`Codec::encode`].
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// JSON encoding via serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use serde_json::{json, Value};

    #[test]
    fn test_json_codec_encodes_compact_json() {
        let bytes = JsonCodec.encode(&json!({"x": 1})).unwrap();
        assert_eq!(bytes, br#"{"x":1}"#);
    }

    #[test]
    fn test_json_codec_decode_error() {
        let result: Result<Value> = JsonCodec.decode(b"{broken");
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_json_codec_type_mismatch() {
        let bytes = JsonCodec.encode(&"text").unwrap();
        let result: Result<u64> = JsonCodec.decode(&bytes);
        assert!(result.is_err());
    }
}
