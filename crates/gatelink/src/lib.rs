//! # Gatelink
//!
//! Stateful client for a real-time chat gateway.
//!
//! Gatelink keeps one WebSocket connection to the gateway alive: it
//! performs the Hello → Identify/Resume handshake, sends heartbeats,
//! tracks the sequence number, honors the gateway's rate limits and
//! reconnects or resumes after closes. Applications implement
//! [`EventHandler`] and/or register prefix commands in a
//! [`CommandTable`]; the client takes care of the rest.
//!
//! ## Crate layout
//!
//! | crate | role |
//! |---|---|
//! | [`transport`] | `Connector`/`Connection` traits and the WebSocket client |
//! | [`protocol`] | opcodes, close codes, envelopes, payloads, event records |
//! | [`session`] | session state, rate limiters, session-start budget |
//! | [`tick`] | fixed-rate idle ticker |
//! | `gatelink` | state machine, router, commands, runner, config |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gatelink::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), GatewayError> {
//!     let config = GatewayConfig::from_file("gatelink.json")?;
//!
//!     let mut commands = CommandTable::with_prefix("!");
//!     commands.register("ping", |ctx, _msg, _args| {
//!         tracing::info!(ping = ?ctx.ping(), "pong");
//!     });
//!
//!     let client = GatewayClient::builder(config).commands(commands).build();
//!     let handle = client.handle();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         handle.shutdown();
//!     });
//!     client.run().await
//! }
//! ```

mod budget;
mod client;
mod config;
mod error;
mod gateway;
mod handler;
mod reconnect;
mod router;

pub use budget::{FixedBudget, HttpBudgetSource};
pub use client::{GatewayClient, GatewayClientBuilder, GatewayHandle};
pub use config::{GatewayConfig, TOKEN_ENV};
pub use error::{ConfigError, GatewayError};
pub use gateway::{FRESH_REASON, Gateway, Outbound, RESUME_REASON, SHUTDOWN_REASON};
pub use handler::{CommandFn, CommandTable, Context, EventHandler};
pub use reconnect::ReconnectPolicy;

pub use gatelink_protocol as protocol;
pub use gatelink_session as session;
pub use gatelink_tick as tick;
pub use gatelink_transport as transport;

/// Common imports for building a bot.
pub mod prelude {
    pub use crate::{
        CommandTable, ConfigError, Context, EventHandler, FixedBudget, GatewayClient,
        GatewayConfig, GatewayError, GatewayHandle,
    };
    pub use gatelink_protocol::{
        GuildMemberEvent, GuildMemberRemove, Intents, Message, MessageDelete, MessageDeleteBulk,
        ReactionAdd, ReactionRemove, ReactionRemoveAll, ReactionRemoveEmoji, Ready, Snowflake,
        User,
    };
    pub use gatelink_session::{BudgetSource, ConnectionState, SessionStartLimit};
}
