//! Codec trait and the JSON implementation used on the gateway.
//!
//! A codec converts between Rust types and text frames. The gateway
//! client doesn't care how that happens, only that the result fits in
//! the frame budget: every outbound payload is encoded through
//! [`Codec::encode_bounded`], which refuses (rather than truncates)
//! anything larger than the given limit.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Largest outbound control payload (Identify, Resume), in bytes.
pub const MAX_PAYLOAD_LEN: usize = 4096;

/// Largest heartbeat payload, in bytes.
pub const MAX_HEARTBEAT_LEN: usize = 64;

/// A codec that encodes Rust types to text frames and decodes them back.
///
/// `Send + Sync + 'static` because the codec lives inside the gateway
/// state for the lifetime of the client and is used from whichever
/// task drives the connection.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a text frame back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the text is malformed or does
    /// not match the expected type.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError>;

    /// Serializes a value and checks it against a byte limit.
    ///
    /// # Errors
    /// Returns `ProtocolError::PayloadTooLarge` when the encoded form is
    /// longer than `max_len`.
    fn encode_bounded<T: Serialize>(
        &self,
        value: &T,
        max_len: usize,
    ) -> Result<String, ProtocolError> {
        let text = self.encode(value)?;
        if text.len() > max_len {
            return Err(ProtocolError::PayloadTooLarge {
                len: text.len(),
                max: max_len,
            });
        }
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`), the gateway's
/// `encoding=json` wire format.
///
/// ## Example
///
/// ```rust
/// use gatelink_protocol::{Codec, Heartbeat, JsonCodec, MAX_HEARTBEAT_LEN};
///
/// let codec = JsonCodec;
/// let text = codec
///     .encode_bounded(&Heartbeat::new(Some(42)).into_payload(), MAX_HEARTBEAT_LEN)
///     .unwrap();
/// assert_eq!(text, r#"{"op":1,"d":42}"#);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}
