//! Gateway session state for Gatelink.
//!
//! This crate holds everything the client must remember about its
//! gateway session:
//!
//! 1. **Session state**: token, session id, sequence number, heartbeat
//!    timestamps and the [`ConnectionState`] ([`Session`]).
//! 2. **Shared access**: one lock around the session, cloneable across
//!    tasks ([`SessionStore`]).
//! 3. **Rate limits**: Identify attempts and dispatch throughput
//!    ([`IdentifyLimiter`], [`DispatchLimiter`]).
//! 4. **Session-start budget**: how many new sessions may still be
//!    opened ([`SessionStartLimit`], [`BudgetSource`] trait).
//!
//! # How it fits in the stack
//!
//! ```text
//! Gateway state machine (above)  ← reads and mutates the session per frame
//!     ↕
//! Session Layer (this crate)     ← owns session identity and counters
//!     ↕
//! Protocol Layer (below)         ← provides User and wire types
//! ```

#![allow(async_fn_in_trait)]

mod budget;
mod error;
mod limiter;
mod session;
mod store;

pub use budget::{BudgetSource, SessionStartLimit};
pub use error::SessionError;
pub use limiter::{
    DISPATCH_WINDOW, DispatchLimiter, IDENTIFY_WINDOW, IdentifyLimiter, MAX_DISPATCH_PER_WINDOW,
};
pub use session::{ConnectionState, Session};
pub use store::SessionStore;
