//! Outbound control payloads: Heartbeat, Identify and Resume.
//!
//! All three share the same outer shape, `{"op": <u8>, "d": <body>}`,
//! modelled by [`Payload`]. Each builder has an `into_payload` method
//! that stamps the right opcode on it.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::Opcode;

/// The `{op, d}` wrapper every client → server frame uses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload<T> {
    pub op: u8,
    pub d: T,
}

impl<T> Payload<T> {
    /// Wraps a body with the given opcode.
    pub fn new(op: Opcode, d: T) -> Self {
        Self { op: op.as_u8(), d }
    }
}

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

/// A heartbeat pulse. The body is the last sequence number seen, or
/// `null` before the first dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub seq: Option<u64>,
}

impl Heartbeat {
    pub fn new(seq: Option<u64>) -> Self {
        Self { seq }
    }

    pub fn into_payload(self) -> Payload<Option<u64>> {
        Payload::new(Opcode::Heartbeat, self.seq)
    }
}

// ---------------------------------------------------------------------------
// Intents
// ---------------------------------------------------------------------------

/// Bit set of gateway intents: which event groups the server should send.
///
/// Serialized as the plain integer the gateway expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Intents(pub u64);

impl Intents {
    pub const GUILDS: Self = Self(1 << 0);
    pub const GUILD_MEMBERS: Self = Self(1 << 1);
    pub const GUILD_MESSAGES: Self = Self(1 << 9);
    pub const GUILD_MESSAGE_REACTIONS: Self = Self(1 << 10);
    pub const DIRECT_MESSAGES: Self = Self(1 << 12);
    pub const DIRECT_MESSAGE_REACTIONS: Self = Self(1 << 13);
    pub const MESSAGE_CONTENT: Self = Self(1 << 15);

    /// No intents at all.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Whether every bit in `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u64 {
        self.0
    }
}

impl BitOr for Intents {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ---------------------------------------------------------------------------
// Identify
// ---------------------------------------------------------------------------

/// Client identity metadata sent with Identify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: "gatelink".to_string(),
            device: "gatelink".to_string(),
        }
    }
}

/// Initial presence announced with Identify.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presence {
    /// Unix time in milliseconds since the client went idle, if it did.
    pub since: Option<u64>,
    /// Activities are not modelled; always sent as an empty list.
    pub activities: Vec<serde_json::Value>,
    /// `online`, `idle`, `dnd` or `invisible`.
    pub status: String,
    pub afk: bool,
}

impl Presence {
    pub fn new(status: impl Into<String>, since: Option<u64>) -> Self {
        Self {
            since,
            activities: Vec::new(),
            status: status.into(),
            afk: false,
        }
    }
}

/// Body of an Identify frame (opcode 2).
#[derive(Clone, PartialEq, Serialize)]
pub struct Identify {
    pub token: String,
    pub properties: IdentifyProperties,
    pub intents: Intents,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<Presence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_threshold: Option<u8>,
}

impl Identify {
    pub fn into_payload(self) -> Payload<Self> {
        Payload::new(Opcode::Identify, self)
    }
}

// The token is a credential; keep it out of debug output and logs.
impl fmt::Debug for Identify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identify")
            .field("token", &"<redacted>")
            .field("properties", &self.properties)
            .field("intents", &self.intents)
            .field("presence", &self.presence)
            .field("large_threshold", &self.large_threshold)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Resume
// ---------------------------------------------------------------------------

/// Body of a Resume frame (opcode 6).
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Resume {
    pub token: String,
    pub session_id: String,
    pub seq: u64,
}

impl Resume {
    pub fn into_payload(self) -> Payload<Self> {
        Payload::new(Opcode::Resume, self)
    }
}

impl fmt::Debug for Resume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resume")
            .field("token", &"<redacted>")
            .field("session_id", &self.session_id)
            .field("seq", &self.seq)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_before_first_dispatch_sends_null() {
        let json = serde_json::to_string(&Heartbeat::new(None).into_payload()).unwrap();
        assert_eq!(json, r#"{"op":1,"d":null}"#);
    }

    #[test]
    fn test_identify_json_shape() {
        let identify = Identify {
            token: "secret".into(),
            properties: IdentifyProperties {
                os: "linux".into(),
                browser: "gatelink".into(),
                device: "gatelink".into(),
            },
            intents: Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT,
            presence: Some(Presence::new("online", Some(1_700_000_000_000))),
            large_threshold: None,
        };
        let json = serde_json::to_value(identify.into_payload()).unwrap();

        assert_eq!(json["op"], 2);
        assert_eq!(json["d"]["token"], "secret");
        assert_eq!(json["d"]["properties"]["os"], "linux");
        assert_eq!(json["d"]["intents"], (1u64 << 9) | (1 << 15));
        assert_eq!(json["d"]["presence"]["status"], "online");
        assert_eq!(json["d"]["presence"]["afk"], false);
        assert!(json["d"]["presence"]["activities"].as_array().unwrap().is_empty());
        assert!(json["d"].get("large_threshold").is_none());
    }

    #[test]
    fn test_resume_json_shape() {
        let resume = Resume {
            token: "secret".into(),
            session_id: "abc123".into(),
            seq: 1337,
        };
        let json = serde_json::to_value(resume.into_payload()).unwrap();
        assert_eq!(json["op"], 6);
        assert_eq!(json["d"]["session_id"], "abc123");
        assert_eq!(json["d"]["seq"], 1337);
    }

    #[test]
    fn test_debug_output_redacts_token() {
        let resume = Resume {
            token: "super-secret-token".into(),
            session_id: "s".into(),
            seq: 1,
        };
        let debug = format!("{resume:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_intents_combine_and_contain() {
        let intents = Intents::GUILDS | Intents::GUILD_MESSAGES;
        assert!(intents.contains(Intents::GUILDS));
        assert!(!intents.contains(Intents::MESSAGE_CONTENT));
        assert_eq!(Intents::empty().bits(), 0);
    }
}
