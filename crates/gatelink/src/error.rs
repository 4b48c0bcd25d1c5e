//! Unified error type for the Gatelink client.

use std::path::PathBuf;

use gatelink_protocol::ProtocolError;
use gatelink_session::SessionError;
use gatelink_transport::TransportError;

/// Errors raised while loading a [`GatewayConfig`](crate::GatewayConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No token in the file or the environment.
    #[error("missing bot token (set `token` in the config file or GATELINK_TOKEN)")]
    MissingToken,
}

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `gatelink` crate you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates `From` impls, so `?` converts
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Connecting, sending or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be decoded, or an outbound payload was invalid.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A rate limit was exceeded or the session budget was unavailable.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The gateway closed the connection with a code that forbids
    /// reconnecting.
    #[error("gateway closed the connection with terminal code {code} ({name})")]
    Terminated { code: u16, name: &'static str },

    /// Every reconnect attempt failed.
    #[error("gave up after {attempts} reconnect attempts")]
    ReconnectsExhausted { attempts: u32 },
}
