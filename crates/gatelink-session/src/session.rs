//! Session types: everything the client remembers about its gateway
//! session between frames and across reconnects.
//!
//! A [`Session`] is created once, before the first connection, and
//! outlives every reconnect and resume. It tracks:
//! - WHO we are (the token, and the user Ready told us about)
//! - WHERE we are in the handshake ([`ConnectionState`])
//! - HOW to resume (session id and last sequence number)
//! - WHEN we last heartbeated, and how long the ack took

use std::fmt;
use std::time::{Duration, Instant};

use gatelink_protocol::User;

use crate::{DispatchLimiter, IdentifyLimiter};

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// Where the client stands with the gateway.
///
/// ```text
///              Hello → Identify          Ready
///   Fresh ─────────────────────→ ... ─────────→ Connected
///     ↑                                            │
///     │ InvalidSession(false), 4009, other closes  │ Reconnect, InvalidSession(true),
///     │                                            │ 4000, 4007
///     └──────────── Resume ←───────────────────────┘
///                     │  Hello → Resume, Resumed
///                     └───────────────────────────→ Connected
///
///   any ──(terminal close / shutdown)──→ Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No resumable session; the next Hello sends Identify.
    #[default]
    Fresh,
    /// A session exists; the next Hello sends Resume.
    Resume,
    /// Handshake complete; dispatch events are flowing.
    Connected,
    /// Stopped for good (terminal close or shutdown).
    Disconnected,
}

impl ConnectionState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Fresh => "FRESH",
            Self::Resume => "RESUME",
            Self::Connected => "CONNECTED",
            Self::Disconnected => "DISCONNECTED",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The client's gateway session.
///
/// Mutated from both the frame path and the idle tick, so it normally
/// lives inside a [`SessionStore`](crate::SessionStore).
#[derive(Clone)]
pub struct Session {
    token: String,
    session_id: Option<String>,
    sequence: u64,
    state: ConnectionState,
    current_user: Option<User>,

    heartbeat_interval: Option<Duration>,
    heartbeat_last_sent_at: Option<Instant>,
    awaiting_ack: bool,
    ping: Option<Duration>,

    /// Identify throttle, sized from the session-start budget.
    pub identify: IdentifyLimiter,
    /// Inbound dispatch throttle.
    pub dispatch: DispatchLimiter,
}

impl Session {
    /// A fresh session for the given bot token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            session_id: None,
            sequence: 0,
            state: ConnectionState::Fresh,
            current_user: None,
            heartbeat_interval: None,
            heartbeat_last_sent_at: None,
            awaiting_ack: false,
            ping: None,
            identify: IdentifyLimiter::new(1),
            dispatch: DispatchLimiter::new(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn ping(&self) -> Option<Duration> {
        self.ping
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat_interval
    }

    /// Last sequence number seen, or `None` before the first one.
    pub fn sequence(&self) -> Option<u64> {
        (self.sequence != 0).then_some(self.sequence)
    }

    /// Raw sequence counter as sent in Resume (`0` if none yet).
    pub fn sequence_raw(&self) -> u64 {
        self.sequence
    }

    // -- Sequence / identity -------------------------------------------------

    /// Records a frame's sequence number.
    ///
    /// Zero and `None` are ignored, and the counter never moves
    /// backwards while the session lives.
    pub fn record_sequence(&mut self, seq: Option<u64>) {
        if let Some(seq) = seq.filter(|&s| s != 0) {
            self.sequence = self.sequence.max(seq);
        }
    }

    /// Stores what Ready told us and marks the session connected.
    pub fn establish(&mut self, session_id: String, user: User) {
        self.session_id = Some(session_id);
        self.current_user = Some(user);
        self.state = ConnectionState::Connected;
    }

    // -- Transitions ---------------------------------------------------------

    /// Moves to `state`. Entering [`ConnectionState::Fresh`] forgets the
    /// session id and resets the sequence counter.
    pub fn transition(&mut self, state: ConnectionState) {
        if state == ConnectionState::Fresh {
            self.session_id = None;
            self.sequence = 0;
        }
        if self.state != state {
            tracing::info!(from = %self.state, to = %state, "session state changed");
        }
        self.state = state;
    }

    // -- Heartbeat -----------------------------------------------------------

    /// Starts a heartbeat cadence for a new connection (on Hello).
    pub fn start_heartbeat(&mut self, interval: Duration, now: Instant) {
        self.heartbeat_interval = Some(interval);
        self.heartbeat_last_sent_at = Some(now);
        self.awaiting_ack = false;
    }

    /// Whether a full interval has elapsed since the last heartbeat.
    /// Always `false` before Hello.
    pub fn heartbeat_due(&self, now: Instant) -> bool {
        match (self.heartbeat_interval, self.heartbeat_last_sent_at) {
            (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
            _ => false,
        }
    }

    /// Records that a heartbeat went out at `now`.
    ///
    /// Returns `true` if the previous heartbeat was never acknowledged.
    pub fn mark_heartbeat_sent(&mut self, now: Instant) -> bool {
        let missed = self.awaiting_ack;
        self.heartbeat_last_sent_at = Some(now);
        self.awaiting_ack = true;
        missed
    }

    /// Records a Heartbeat-Ack at `now` and returns the round trip.
    pub fn record_ack(&mut self, now: Instant) -> Option<Duration> {
        self.awaiting_ack = false;
        let rtt = now.saturating_duration_since(self.heartbeat_last_sent_at?);
        self.ping = Some(rtt);
        Some(rtt)
    }

    /// Drops the cadence of a connection that has gone away.
    pub fn stop_heartbeat(&mut self) {
        self.heartbeat_interval = None;
        self.heartbeat_last_sent_at = None;
        self.awaiting_ack = false;
    }
}

// The token is a credential; never print it.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("session_id", &self.session_id)
            .field("sequence", &self.sequence)
            .field("state", &self.state)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("ping", &self.ping)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use gatelink_protocol::Snowflake;

    use super::*;

    fn connected_session() -> Session {
        let mut session = Session::new("token");
        session.establish(
            "abc".into(),
            User {
                id: Snowflake(1),
                ..User::default()
            },
        );
        session.record_sequence(Some(10));
        session
    }

    #[test]
    fn test_record_sequence_ignores_zero_and_none() {
        let mut session = Session::new("t");
        session.record_sequence(Some(5));
        session.record_sequence(Some(0));
        session.record_sequence(None);
        assert_eq!(session.sequence(), Some(5));
    }

    #[test]
    fn test_record_sequence_never_decreases() {
        let mut session = Session::new("t");
        session.record_sequence(Some(9));
        session.record_sequence(Some(3));
        assert_eq!(session.sequence(), Some(9));
        session.record_sequence(Some(11));
        assert_eq!(session.sequence(), Some(11));
    }

    #[test]
    fn test_transition_to_fresh_clears_session_id_and_sequence() {
        let mut session = connected_session();

        session.transition(ConnectionState::Fresh);

        assert_eq!(session.session_id(), None);
        assert_eq!(session.sequence(), None);
        assert_eq!(session.sequence_raw(), 0);
        assert_eq!(session.state(), ConnectionState::Fresh);
    }

    #[test]
    fn test_transition_to_resume_keeps_session_id_and_sequence() {
        let mut session = connected_session();

        session.transition(ConnectionState::Resume);

        assert_eq!(session.session_id(), Some("abc"));
        assert_eq!(session.sequence(), Some(10));
    }

    #[test]
    fn test_heartbeat_due_only_after_full_interval() {
        let t0 = Instant::now();
        let mut session = Session::new("t");
        assert!(!session.heartbeat_due(t0), "no cadence before Hello");

        session.start_heartbeat(Duration::from_millis(41250), t0);

        assert!(!session.heartbeat_due(t0 + Duration::from_millis(41249)));
        assert!(session.heartbeat_due(t0 + Duration::from_millis(41250)));
    }

    #[test]
    fn test_record_ack_measures_round_trip() {
        let t0 = Instant::now();
        let mut session = Session::new("t");
        session.start_heartbeat(Duration::from_secs(1), t0);
        session.mark_heartbeat_sent(t0 + Duration::from_secs(1));

        let rtt = session.record_ack(t0 + Duration::from_millis(1050));

        assert_eq!(rtt, Some(Duration::from_millis(50)));
        assert_eq!(session.ping(), Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_mark_heartbeat_sent_reports_missed_ack() {
        let t0 = Instant::now();
        let mut session = Session::new("t");
        session.start_heartbeat(Duration::from_secs(1), t0);

        assert!(!session.mark_heartbeat_sent(t0 + Duration::from_secs(1)));
        assert!(session.mark_heartbeat_sent(t0 + Duration::from_secs(2)));
        session.record_ack(t0 + Duration::from_secs(2));
        assert!(!session.mark_heartbeat_sent(t0 + Duration::from_secs(3)));
    }

    #[test]
    fn test_debug_output_redacts_token() {
        let session = Session::new("very-secret");
        let debug = format!("{session:?}");
        assert!(!debug.contains("very-secret"));
    }
}
