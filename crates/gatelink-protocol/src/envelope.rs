//! The inbound frame envelope and the small control payloads it carries.
//!
//! Every frame the gateway sends has the same outer shape:
//!
//! ```text
//! {
//!   "op": 0,                 ← what kind of frame (required)
//!   "s": 42,                 ← sequence number (dispatch only, else null)
//!   "t": "MESSAGE_CREATE",   ← event name (dispatch only, else null)
//!   "d": { ... }             ← body, meaning depends on op / t
//! }
//! ```
//!
//! The envelope is decoded once per frame. The body stays an untyped
//! [`serde_json::Value`] until the router knows which record to decode
//! it into.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::{Opcode, ProtocolError};

/// One decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    /// Raw opcode. A missing or non-integer `op` fails decoding.
    pub op: u8,

    /// Sequence number as sent. Use [`Envelope::sequence`] to read it
    /// with the zero-means-absent rule applied.
    #[serde(default)]
    pub s: Option<u64>,

    /// Event name for dispatch frames.
    #[serde(default)]
    pub t: Option<String>,

    /// Frame body. `null` when the server sends none.
    #[serde(default)]
    pub d: Value,
}

impl Envelope {
    /// Parses one text frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the text is not JSON or `op`
    /// is missing or malformed.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }

    /// The opcode, if it is one the gateway defines.
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_u8(self.op)
    }

    /// The sequence number, treating `0` the same as absent.
    ///
    /// A legitimate sequence of zero would be dropped here. The gateway
    /// starts counting at 1, so this never happens in practice.
    pub fn sequence(&self) -> Option<u64> {
        self.s.filter(|&s| s != 0)
    }

    /// The event name, if present and non-empty.
    pub fn event_name(&self) -> Option<&str> {
        self.t.as_deref().filter(|t| !t.is_empty())
    }
}

/// Body of the Hello frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hello {
    /// How often the client must send a heartbeat.
    pub heartbeat_interval: Duration,
}

impl Hello {
    /// Reads `heartbeat_interval` (milliseconds) from a Hello body.
    ///
    /// # Errors
    /// - [`ProtocolError::MissingField`] if the interval is absent.
    /// - [`ProtocolError::InvalidField`] if it is zero.
    pub fn from_data(d: &Value) -> Result<Self, ProtocolError> {
        #[derive(Deserialize)]
        struct Raw {
            heartbeat_interval: Option<u64>,
        }

        let raw = Raw::deserialize(d).map_err(ProtocolError::Decode)?;
        let interval_ms = raw
            .heartbeat_interval
            .ok_or(ProtocolError::MissingField("heartbeat_interval"))?;
        if interval_ms == 0 {
            return Err(ProtocolError::InvalidField {
                field: "heartbeat_interval",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(Self {
            heartbeat_interval: Duration::from_millis(interval_ms),
        })
    }
}

/// Whether an Invalid-Session body allows resuming.
///
/// Anything other than a literal `false` counts as resumable.
pub fn invalid_session_resumable(d: &Value) -> bool {
    !matches!(d, Value::Bool(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_dispatch_frame() {
        let env = Envelope::decode(
            r#"{"op":0,"s":42,"t":"MESSAGE_CREATE","d":{"content":"hi"}}"#,
        )
        .unwrap();
        assert_eq!(env.opcode(), Some(Opcode::Dispatch));
        assert_eq!(env.sequence(), Some(42));
        assert_eq!(env.event_name(), Some("MESSAGE_CREATE"));
        assert_eq!(env.d["content"], "hi");
    }

    #[test]
    fn test_decode_control_frame_without_sequence_or_name() {
        // Control frames send `s` and `t` as null, or omit them.
        let env = Envelope::decode(r#"{"op":11,"s":null,"t":null}"#).unwrap();
        assert_eq!(env.opcode(), Some(Opcode::HeartbeatAck));
        assert_eq!(env.sequence(), None);
        assert_eq!(env.event_name(), None);
        assert!(env.d.is_null());

        let env = Envelope::decode(r#"{"op":7}"#).unwrap();
        assert_eq!(env.opcode(), Some(Opcode::Reconnect));
    }

    #[test]
    fn test_decode_zero_sequence_reads_as_absent() {
        let env = Envelope::decode(r#"{"op":0,"s":0,"t":"READY","d":{}}"#).unwrap();
        assert_eq!(env.s, Some(0));
        assert_eq!(env.sequence(), None);
    }

    #[test]
    fn test_decode_missing_opcode_fails() {
        let result = Envelope::decode(r#"{"s":1,"t":"READY","d":{}}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_malformed_opcode_fails() {
        assert!(Envelope::decode(r#"{"op":"ten"}"#).is_err());
        assert!(Envelope::decode(r#"{"op":-1}"#).is_err());
        assert!(Envelope::decode("not json at all").is_err());
    }

    #[test]
    fn test_decode_undefined_opcode_is_not_a_decode_error() {
        // The envelope parses; the opcode simply isn't one we know.
        let env = Envelope::decode(r#"{"op":5}"#).unwrap();
        assert_eq!(env.opcode(), None);
    }

    #[test]
    fn test_hello_reads_interval_in_millis() {
        let d = serde_json::json!({ "heartbeat_interval": 41250 });
        let hello = Hello::from_data(&d).unwrap();
        assert_eq!(hello.heartbeat_interval, Duration::from_millis(41250));
    }

    #[test]
    fn test_hello_missing_interval_is_error() {
        let d = serde_json::json!({ "_trace": ["gateway-prd"] });
        assert!(matches!(
            Hello::from_data(&d),
            Err(ProtocolError::MissingField("heartbeat_interval"))
        ));
    }

    #[test]
    fn test_hello_zero_interval_is_error() {
        let d = serde_json::json!({ "heartbeat_interval": 0 });
        assert!(matches!(
            Hello::from_data(&d),
            Err(ProtocolError::InvalidField { field: "heartbeat_interval", .. })
        ));
    }

    #[test]
    fn test_invalid_session_resumable_flag() {
        assert!(!invalid_session_resumable(&Value::Bool(false)));
        assert!(invalid_session_resumable(&Value::Bool(true)));
        assert!(invalid_session_resumable(&Value::Null));
    }
}
