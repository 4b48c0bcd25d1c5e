//! Transport abstraction layer for Gatelink.
//!
//! Provides the [`Connector`] and [`Connection`] traits that the gateway
//! client drives. A connection carries UTF-8 text frames in both
//! directions and reports the peer's close code when it goes away.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket client via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector};

use std::fmt;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Close status sent by the peer (or by us) when a connection ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// Numeric close code (1000 = normal, 4000–4999 = application).
    pub code: u16,
    /// Human-readable reason, possibly empty.
    pub reason: String,
}

impl CloseFrame {
    /// Close code for a normal, intentional closure.
    pub const NORMAL: u16 = 1000;

    /// Creates a close frame with the given code and reason.
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// One inbound event from a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete text frame.
    Text(String),
    /// The peer closed the connection. `None` when no status was sent
    /// (abrupt close or end of stream).
    Close(Option<CloseFrame>),
}

/// Opens outbound connections to a gateway URL.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;
    /// The error type for connect attempts.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Connects to `url` and completes any protocol upgrade.
    async fn connect(&self, url: &str) -> Result<Self::Connection, Self::Error>;
}

/// A single duplex connection that exchanges text frames.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends one text frame to the remote peer.
    async fn send_text(&self, text: &str) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Non-text control traffic (ping/pong, binary) is handled or skipped
    /// by the implementation. Once a [`Frame::Close`] has been returned the
    /// connection is finished.
    async fn recv(&self) -> Result<Frame, Self::Error>;

    /// Closes the connection with the given code and reason.
    async fn close(&self, frame: CloseFrame) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
