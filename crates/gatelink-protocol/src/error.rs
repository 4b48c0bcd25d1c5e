//! Error types for the protocol layer.
//!
//! Each crate in Gatelink defines its own error enum. When you see a
//! `ProtocolError`, the problem is in what travelled on the wire (or
//! what we were about to put on it), not in networking or session
//! bookkeeping.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into JSON).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning JSON into a Rust type).
    ///
    /// Common causes: malformed JSON, a missing or non-integer `op`,
    /// wrong data types in an event body.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A field the protocol requires was absent.
    ///
    /// For example `heartbeat_interval` in Hello or `session_id` in
    /// Ready.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A field was present but its value violates the protocol.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    /// An outbound payload did not fit its fixed-size buffer.
    ///
    /// Payloads are never truncated; the send is aborted instead.
    #[error("payload of {len} bytes exceeds the {max}-byte limit")]
    PayloadTooLarge { len: usize, max: usize },
}
