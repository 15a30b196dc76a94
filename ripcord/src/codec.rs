//! Pluggable payload serialization.
//!
//! The [`PayloadCodec`] trait is the serializer port of the engine: it turns
//! call arguments into payload bytes and reply payloads back into typed
//! results. [`JsonCodec`] is the bundled default — human-readable and good
//! enough for most services; bring a binary codec for tight loops.
//!
//! Decoding must fail deterministically on malformed input: a codec never
//! guesses, it returns [`CodecError::Decode`].

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Error from a codec operation.
#[derive(Debug)]
pub enum CodecError {
    /// Failed to encode a value to payload bytes.
    Encode(Box<dyn std::error::Error + Send + Sync>),
    /// Failed to decode payload bytes to a value.
    Decode(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Encode(e) => write!(f, "encode error: {}", e),
            CodecError::Decode(e) => write!(f, "decode error: {}", e),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Encode(e) => Some(e.as_ref()),
            CodecError::Decode(e) => Some(e.as_ref()),
        }
    }
}

/// Serializer port: encodes call arguments, decodes reply payloads.
///
/// `Clone + Send + 'static` because a codec instance travels into the reply
/// callback registered on the transport, which may be invoked from whichever
/// thread drives `process`.
pub trait PayloadCodec: Clone + Send + 'static {
    /// Encode a value to payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Decode payload bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] if the payload is malformed or does
    /// not match `T`.
    fn decode<T: DeserializeOwned>(&self, buf: &[u8]) -> Result<T, CodecError>;
}

/// JSON codec over `serde_json`, the bundled default.
///
/// # Example
///
/// ```
/// use ripcord::{JsonCodec, PayloadCodec};
///
/// let bytes = JsonCodec.encode(&vec![1u32, 2, 3]).unwrap();
/// let back: Vec<u32> = JsonCodec.decode(&bytes).unwrap();
/// assert_eq!(back, vec![1, 2, 3]);
/// ```
#[derive(Clone, Copy, Default, Debug)]
pub struct JsonCodec;

impl PayloadCodec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(Box::new(e)))
    }

    fn decode<T: DeserializeOwned>(&self, buf: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(buf).map_err(|e| CodecError::Decode(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Args {
        target: String,
        attempts: u32,
    }

    #[test]
    fn test_json_round_trip() {
        let args = Args {
            target: "relay-7".to_string(),
            attempts: 3,
        };
        let bytes = JsonCodec.encode(&args).expect("encode");
        let decoded: Args = JsonCodec.decode(&bytes).expect("decode");
        assert_eq!(args, decoded);
    }

    #[test]
    fn test_decode_rejects_malformed_payload() {
        let result: Result<Args, CodecError> = JsonCodec.decode(b"{ not json");
        let err = result.expect_err("malformed payload must fail");
        assert!(matches!(err, CodecError::Decode(_)));
        assert!(err.to_string().contains("decode error"));
    }

    #[test]
    fn test_decode_rejects_type_mismatch() {
        let bytes = JsonCodec.encode(&"just a string").expect("encode");
        let result: Result<Args, CodecError> = JsonCodec.decode(&bytes);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_codec_error_source() {
        use std::error::Error;
        let err = CodecError::Encode(Box::new(std::io::Error::other("boom")));
        assert!(err.source().is_some());
    }
}
