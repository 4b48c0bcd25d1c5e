//! Gateway opcodes.
//!
//! Every frame on the gateway carries an integer `op` that says what the
//! frame is for. Some opcodes only travel server → client (Hello,
//! Dispatch, Heartbeat-Ack, Reconnect, Invalid-Session), some only
//! client → server (Identify, Resume, Presence-Update, ...), and
//! Heartbeat goes both ways.

use std::fmt;

/// The purpose of a gateway frame.
///
/// The discriminants are the wire values, so `Opcode::Hello as u8 == 10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Server → Client: an application event with a sequence number.
    Dispatch = 0,
    /// Either direction: liveness pulse carrying the last sequence.
    Heartbeat = 1,
    /// Client → Server: start a new session.
    Identify = 2,
    /// Client → Server: update the client's presence.
    PresenceUpdate = 3,
    /// Client → Server: join/leave/move voice channels.
    VoiceStateUpdate = 4,
    /// Client → Server: reattach to a previous session.
    Resume = 6,
    /// Server → Client: reconnect and resume.
    Reconnect = 7,
    /// Client → Server: request guild member chunks.
    RequestGuildMembers = 8,
    /// Server → Client: the session is invalid; `d` says if resumable.
    InvalidSession = 9,
    /// Server → Client: first frame, carries `heartbeat_interval`.
    Hello = 10,
    /// Server → Client: acknowledges a heartbeat.
    HeartbeatAck = 11,
}

impl Opcode {
    /// Maps a wire value to an opcode. Returns `None` for values the
    /// gateway does not define (5 is unassigned).
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Dispatch,
            1 => Self::Heartbeat,
            2 => Self::Identify,
            3 => Self::PresenceUpdate,
            4 => Self::VoiceStateUpdate,
            6 => Self::Resume,
            7 => Self::Reconnect,
            8 => Self::RequestGuildMembers,
            9 => Self::InvalidSession,
            10 => Self::Hello,
            11 => Self::HeartbeatAck,
            _ => return None,
        })
    }

    /// The wire value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Upper-snake name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Dispatch => "DISPATCH",
            Self::Heartbeat => "HEARTBEAT",
            Self::Identify => "IDENTIFY",
            Self::PresenceUpdate => "PRESENCE_UPDATE",
            Self::VoiceStateUpdate => "VOICE_STATE_UPDATE",
            Self::Resume => "RESUME",
            Self::Reconnect => "RECONNECT",
            Self::RequestGuildMembers => "REQUEST_GUILD_MEMBERS",
            Self::InvalidSession => "INVALID_SESSION",
            Self::Hello => "HELLO",
            Self::HeartbeatAck => "HEARTBEAT_ACK",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8_maps_every_defined_value_back() {
        for raw in 0u8..=11 {
            if let Some(op) = Opcode::from_u8(raw) {
                assert_eq!(op.as_u8(), raw);
            }
        }
    }

    #[test]
    fn test_from_u8_rejects_unassigned_values() {
        assert_eq!(Opcode::from_u8(5), None);
        assert_eq!(Opcode::from_u8(12), None);
        assert_eq!(Opcode::from_u8(255), None);
    }

    #[test]
    fn test_display_uses_upper_snake_name() {
        assert_eq!(Opcode::HeartbeatAck.to_string(), "HEARTBEAT_ACK");
        assert_eq!(Opcode::from_u8(10).unwrap().name(), "HELLO");
    }
}
