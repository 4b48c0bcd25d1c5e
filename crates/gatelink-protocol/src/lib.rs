//! Wire protocol for Gatelink.
//!
//! This crate defines the "language" the gateway and its clients speak:
//!
//! - **Framing** ([`Envelope`], [`Opcode`], [`Hello`]): the outer shape
//!   of every inbound frame and the control bodies the state machine
//!   reads directly.
//! - **Payloads** ([`Heartbeat`], [`Identify`], [`Resume`]): what the
//!   client sends back.
//! - **Events** ([`EventKind`], [`DispatchEvent`]) and the entity models
//!   they carry ([`Message`], [`User`], ...).
//! - **Close codes** ([`CloseCode`], [`CloseDisposition`]): how a closed
//!   connection should continue.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): text encoding with
//!   fixed outbound size limits.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (text frames) and the
//! session state machine. It doesn't know about sockets or timers; it
//! only knows how to turn text into typed values and back.
//!
//! ```text
//! Transport (text) → Protocol (Envelope / DispatchEvent) → Gateway (state)
//! ```

mod close;
mod codec;
mod envelope;
mod error;
mod event;
mod model;
mod opcode;
mod payload;

pub use close::{CloseCode, CloseDisposition, describe_close_code};
pub use codec::{Codec, JsonCodec, MAX_HEARTBEAT_LEN, MAX_PAYLOAD_LEN};
pub use envelope::{Envelope, Hello, invalid_session_resumable};
pub use error::ProtocolError;
pub use event::{
    DispatchEvent, EventKind, GuildMemberEvent, GuildMemberRemove, MessageDelete,
    MessageDeleteBulk, ReactionAdd, ReactionRemove, ReactionRemoveAll, ReactionRemoveEmoji,
    Ready,
};
pub use model::{Emoji, GuildMember, Message, Snowflake, User};
pub use opcode::Opcode;
pub use payload::{Heartbeat, Identify, IdentifyProperties, Intents, Payload, Presence, Resume};
