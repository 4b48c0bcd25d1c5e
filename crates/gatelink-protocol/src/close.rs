//! Close codes and how the client reacts to them.

use std::fmt;

/// Close codes the gateway sends in the 4000 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    UnknownError = 4000,
    UnknownOpcode = 4001,
    DecodeError = 4002,
    NotAuthenticated = 4003,
    AuthenticationFailed = 4004,
    AlreadyAuthenticated = 4005,
    InvalidSequence = 4007,
    RateLimited = 4008,
    SessionTimedOut = 4009,
    InvalidShard = 4010,
    ShardingRequired = 4011,
    InvalidApiVersion = 4012,
    InvalidIntents = 4013,
    DisallowedIntents = 4014,
}

impl CloseCode {
    /// Maps a raw close code to a gateway close code.
    pub fn from_u16(code: u16) -> Option<Self> {
        Some(match code {
            4000 => Self::UnknownError,
            4001 => Self::UnknownOpcode,
            4002 => Self::DecodeError,
            4003 => Self::NotAuthenticated,
            4004 => Self::AuthenticationFailed,
            4005 => Self::AlreadyAuthenticated,
            4007 => Self::InvalidSequence,
            4008 => Self::RateLimited,
            4009 => Self::SessionTimedOut,
            4010 => Self::InvalidShard,
            4011 => Self::ShardingRequired,
            4012 => Self::InvalidApiVersion,
            4013 => Self::InvalidIntents,
            4014 => Self::DisallowedIntents,
            _ => return None,
        })
    }

    /// The wire value.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::UnknownOpcode => "UNKNOWN_OPCODE",
            Self::DecodeError => "DECODE_ERROR",
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::AlreadyAuthenticated => "ALREADY_AUTHENTICATED",
            Self::InvalidSequence => "INVALID_SEQUENCE",
            Self::RateLimited => "RATE_LIMITED",
            Self::SessionTimedOut => "SESSION_TIMED_OUT",
            Self::InvalidShard => "INVALID_SHARD",
            Self::ShardingRequired => "SHARDING_REQUIRED",
            Self::InvalidApiVersion => "INVALID_API_VERSION",
            Self::InvalidIntents => "INVALID_INTENTS",
            Self::DisallowedIntents => "DISALLOWED_INTENTS",
        }
    }

    /// What the client does after the gateway closes with this code.
    pub fn disposition(self) -> CloseDisposition {
        match self {
            Self::UnknownOpcode
            | Self::DecodeError
            | Self::NotAuthenticated
            | Self::AuthenticationFailed
            | Self::AlreadyAuthenticated
            | Self::RateLimited
            | Self::InvalidShard
            | Self::ShardingRequired
            | Self::InvalidApiVersion
            | Self::InvalidIntents
            | Self::DisallowedIntents => CloseDisposition::Terminal,
            Self::UnknownError | Self::InvalidSequence => CloseDisposition::Resume,
            Self::SessionTimedOut => CloseDisposition::Fresh,
        }
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Describes any close code, gateway-specific or standard WebSocket.
pub fn describe_close_code(code: u16) -> &'static str {
    if let Some(gateway) = CloseCode::from_u16(code) {
        return gateway.name();
    }
    match code {
        1000 => "NORMAL",
        1001 => "GOING_AWAY",
        1002 => "PROTOCOL_ERROR",
        1003 => "UNEXPECTED_DATA",
        1005 => "NO_REASON",
        1006 => "ABRUPTLY",
        1007 => "INCONSISTENT_DATA",
        1008 => "POLICY_VIOLATION",
        1009 => "TOO_BIG",
        1010 => "MISSING_EXTENSION",
        1011 => "SERVER_ERROR",
        1012..=2999 => "IANA_REGISTRY",
        3000..=3999 => "PRIVATE",
        _ => "UNKNOWN",
    }
}

/// The three ways a closed connection can continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDisposition {
    /// Stop; reconnecting would fail the same way.
    Terminal,
    /// Reconnect and resume the existing session.
    Resume,
    /// Reconnect and identify from scratch.
    Fresh,
}

impl CloseDisposition {
    /// Classifies a raw close code. A missing code (abrupt drop) and any
    /// code outside the gateway's own range restart fresh.
    pub fn classify(code: Option<u16>) -> Self {
        code.and_then(CloseCode::from_u16)
            .map_or(Self::Fresh, CloseCode::disposition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_codes_classify_as_terminal() {
        for code in [4001, 4002, 4003, 4004, 4005, 4008, 4010, 4011, 4012, 4013, 4014] {
            assert_eq!(
                CloseDisposition::classify(Some(code)),
                CloseDisposition::Terminal,
                "code {code}"
            );
        }
    }

    #[test]
    fn test_unknown_error_and_invalid_sequence_resume() {
        assert_eq!(CloseDisposition::classify(Some(4000)), CloseDisposition::Resume);
        assert_eq!(CloseDisposition::classify(Some(4007)), CloseDisposition::Resume);
    }

    #[test]
    fn test_timeout_and_unrecognized_codes_restart_fresh() {
        assert_eq!(CloseDisposition::classify(Some(4009)), CloseDisposition::Fresh);
        assert_eq!(CloseDisposition::classify(Some(1000)), CloseDisposition::Fresh);
        assert_eq!(CloseDisposition::classify(Some(1006)), CloseDisposition::Fresh);
        assert_eq!(CloseDisposition::classify(Some(4006)), CloseDisposition::Fresh);
        assert_eq!(CloseDisposition::classify(Some(4999)), CloseDisposition::Fresh);
        assert_eq!(CloseDisposition::classify(None), CloseDisposition::Fresh);
    }

    #[test]
    fn test_from_u16_round_trips_wire_value() {
        for raw in 4000u16..=4014 {
            if let Some(code) = CloseCode::from_u16(raw) {
                assert_eq!(code.as_u16(), raw);
            }
        }
        assert_eq!(CloseCode::from_u16(4006), None);
    }

    #[test]
    fn test_describe_close_code_covers_both_ranges() {
        assert_eq!(describe_close_code(4004), "AUTHENTICATION_FAILED");
        assert_eq!(describe_close_code(1001), "GOING_AWAY");
        assert_eq!(describe_close_code(3500), "PRIVATE");
        assert_eq!(describe_close_code(4500), "UNKNOWN");
    }
}
