//! The connection state machine.
//!
//! [`Gateway`] turns inbound frames and idle ticks into outbound
//! actions. It does no I/O and never reads the clock: the runner passes
//! in each frame's text and the time it arrived, then executes the
//! returned [`Outbound`] actions on the connection. That keeps every
//! protocol rule testable with plain `Instant` arithmetic.
//!
//! ```text
//!  frame text ──→ Envelope ──┬─ Hello ──────────→ Identify / Resume
//!                            ├─ Dispatch ───────→ limiter → decode → Router
//!                            ├─ Heartbeat-Ack ──→ ping
//!                            ├─ Heartbeat ──────→ Heartbeat
//!                            ├─ Reconnect ──────→ RESUME + close
//!                            └─ Invalid-Session → RESUME / FRESH + close
//!  idle tick ──→ heartbeat due? → Heartbeat, then on_idle
//! ```

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use gatelink_protocol::{
    CloseDisposition, Codec, DispatchEvent, Envelope, EventKind, Heartbeat, Hello,
    Identify, IdentifyProperties, Intents, JsonCodec, MAX_HEARTBEAT_LEN, MAX_PAYLOAD_LEN, Opcode,
    Presence, Resume, describe_close_code, invalid_session_resumable,
};
use gatelink_session::{ConnectionState, Session, SessionError, SessionStore};
use gatelink_transport::CloseFrame;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::router::Router;
use crate::{CommandTable, Context, EventHandler, GatewayConfig, GatewayError};

/// Reason sent when we close to resume the current session.
pub const RESUME_REASON: &str = "Attempting to session resume";

/// Reason sent when we close to start over with a new session.
pub const FRESH_REASON: &str = "Attempting to start a fresh new session";

/// Reason sent when the application shuts the client down.
pub const SHUTDOWN_REASON: &str = "Shutdown gracefully";

/// An action the runner must perform on the current connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Send this text frame.
    Send(String),
    /// Close the connection with this frame. The session state has
    /// already been updated; the runner reconnects unless the state is
    /// [`ConnectionState::Disconnected`].
    Close(CloseFrame),
}

/// The gateway protocol state machine for one client.
pub struct Gateway<H> {
    store: SessionStore,
    codec: JsonCodec,
    properties: IdentifyProperties,
    intents: Intents,
    presence: Presence,
    large_threshold: Option<u8>,
    router: Router<H>,
}

impl<H: EventHandler> Gateway<H> {
    pub fn new(config: &GatewayConfig, handler: H, commands: CommandTable) -> Self {
        let started_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64);

        Self {
            store: SessionStore::new(Session::new(config.token.clone())),
            codec: JsonCodec,
            properties: config.properties.clone(),
            intents: config.intents,
            presence: Presence::new(config.presence_status.clone(), Some(started_ms)),
            large_threshold: config.large_threshold,
            router: Router::new(handler, commands),
        }
    }

    /// The shared session this gateway mutates.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn handler(&self) -> &H {
        &self.router.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.router.handler
    }

    /// Sizes the Identify limiter from the session-start budget.
    pub fn set_identify_concurrency(&self, max_concurrency: u32) {
        self.store
            .with(|s| s.identify.set_max_concurrency(max_concurrency));
    }

    // -----------------------------------------------------------------------
    // Inbound frames
    // -----------------------------------------------------------------------

    /// Processes one inbound text frame received at `now`.
    ///
    /// # Errors
    /// Any error is fatal for the current connection attempt:
    /// - [`GatewayError::Protocol`] for undecodable frames, a bad Hello,
    ///   a malformed recognized event or an oversized outbound payload.
    /// - [`GatewayError::Session`] when a rate limit is exceeded.
    pub fn handle_frame(&mut self, text: &str, now: Instant) -> Result<Vec<Outbound>, GatewayError> {
        let envelope = Envelope::decode(text)?;
        let seq = envelope.sequence();
        self.store.with(|s| s.record_sequence(seq));

        let Some(op) = envelope.opcode() else {
            debug!(op = envelope.op, raw = text, "unknown opcode, ignoring frame");
            return Ok(Vec::new());
        };
        debug!(
            op = op.name(),
            seq,
            event = envelope.event_name(),
            "frame received"
        );

        match op {
            Opcode::Hello => self.on_hello(&envelope.d, now),
            Opcode::Dispatch => self.on_dispatch(&envelope, now),
            Opcode::HeartbeatAck => {
                let rtt = self.store.with(|s| s.record_ack(now));
                debug!(ping_ms = rtt.map(|d| d.as_millis() as u64), "heartbeat acknowledged");
                Ok(Vec::new())
            }
            Opcode::Heartbeat => {
                // The gateway may ask for an immediate heartbeat.
                let text = self.heartbeat(now)?;
                Ok(vec![Outbound::Send(text)])
            }
            Opcode::Reconnect => {
                info!("gateway requested reconnect");
                self.store.with(|s| {
                    s.transition(ConnectionState::Resume);
                    s.stop_heartbeat();
                });
                Ok(vec![close_normal(RESUME_REASON)])
            }
            Opcode::InvalidSession => {
                let resumable = invalid_session_resumable(&envelope.d);
                let (next, reason) = if resumable {
                    (ConnectionState::Resume, RESUME_REASON)
                } else {
                    (ConnectionState::Fresh, FRESH_REASON)
                };
                warn!(resumable, "session invalidated");
                self.store.with(|s| {
                    s.transition(next);
                    s.stop_heartbeat();
                });
                Ok(vec![close_normal(reason)])
            }
            Opcode::Identify
            | Opcode::PresenceUpdate
            | Opcode::VoiceStateUpdate
            | Opcode::Resume
            | Opcode::RequestGuildMembers => {
                warn!(op = op.name(), "received client-only opcode, ignoring");
                Ok(Vec::new())
            }
        }
    }

    fn on_hello(&mut self, d: &Value, now: Instant) -> Result<Vec<Outbound>, GatewayError> {
        let hello = Hello::from_data(d)?;
        info!(
            heartbeat_interval_ms = hello.heartbeat_interval.as_millis() as u64,
            "hello received"
        );

        let payload = self.store.with(|s| -> Result<Handshake, SessionError> {
            s.start_heartbeat(hello.heartbeat_interval, now);

            if s.state() == ConnectionState::Resume {
                match resume_body(s) {
                    Ok(resume) => return Ok(Handshake::Resume(resume)),
                    Err(e) => {
                        warn!(error = %e, "cannot resume, identifying instead");
                    }
                }
            }
            if s.state() != ConnectionState::Fresh {
                s.transition(ConnectionState::Fresh);
            }
            s.identify.try_acquire(now)?;
            Ok(Handshake::Identify(s.token().to_owned()))
        })?;

        let text = match payload {
            Handshake::Resume(resume) => {
                info!(seq = resume.seq, "resuming session");
                self.codec
                    .encode_bounded(&resume.into_payload(), MAX_PAYLOAD_LEN)?
            }
            Handshake::Identify(token) => {
                info!(intents = self.intents.bits(), "identifying");
                let identify = Identify {
                    token,
                    properties: self.properties.clone(),
                    intents: self.intents,
                    presence: Some(self.presence.clone()),
                    large_threshold: self.large_threshold,
                };
                self.codec
                    .encode_bounded(&identify.into_payload(), MAX_PAYLOAD_LEN)?
            }
        };
        Ok(vec![Outbound::Send(text)])
    }

    fn on_dispatch(&mut self, envelope: &Envelope, now: Instant) -> Result<Vec<Outbound>, GatewayError> {
        self.store.with(|s| s.dispatch.try_acquire(now))?;

        let Some(name) = envelope.event_name() else {
            warn!("dispatch frame without event name, ignoring");
            return Ok(Vec::new());
        };
        let Some(kind) = EventKind::from_name(name) else {
            debug!(event = name, "unknown dispatch event, ignoring");
            return Ok(Vec::new());
        };

        let event = DispatchEvent::decode(kind, &envelope.d)?;
        match &event {
            DispatchEvent::Ready(ready) => {
                info!(
                    session_id = %ready.session_id,
                    user = %ready.user.username,
                    "session ready"
                );
                self.store
                    .with(|s| s.establish(ready.session_id.clone(), ready.user.clone()));
            }
            DispatchEvent::Resumed => {
                info!("session resumed");
                self.store.with(|s| s.transition(ConnectionState::Connected));
            }
            _ => {}
        }

        let ctx = Context::snapshot(&self.store);
        self.router.route(&ctx, &event);
        Ok(Vec::new())
    }

    // -----------------------------------------------------------------------
    // Idle tick
    // -----------------------------------------------------------------------

    /// Runs one idle tick at `now`: sends a heartbeat if a full interval
    /// has passed, then calls the application's `on_idle`.
    ///
    /// # Errors
    /// [`GatewayError::Protocol`] if the heartbeat doesn't fit its buffer.
    pub fn on_idle(&mut self, now: Instant) -> Result<Vec<Outbound>, GatewayError> {
        let mut out = Vec::new();
        if self.store.with(|s| s.heartbeat_due(now)) {
            out.push(Outbound::Send(self.heartbeat(now)?));
        }

        let ctx = Context::snapshot(&self.store);
        self.router.handler.on_idle(&ctx);
        Ok(out)
    }

    fn heartbeat(&mut self, now: Instant) -> Result<String, GatewayError> {
        let (seq, missed) = self.store.with(|s| {
            let missed = s.mark_heartbeat_sent(now);
            (s.sequence(), missed)
        });
        if missed {
            warn!("previous heartbeat was not acknowledged");
        }
        let text = self
            .codec
            .encode_bounded(&Heartbeat::new(seq).into_payload(), MAX_HEARTBEAT_LEN)?;
        debug!(seq, "heartbeat sent");
        Ok(text)
    }

    // -----------------------------------------------------------------------
    // Close / shutdown
    // -----------------------------------------------------------------------

    /// Applies a peer close (or abrupt drop when `frame` is `None`) to
    /// the session and says how the runner should continue.
    pub fn on_close(&mut self, frame: Option<&CloseFrame>) -> CloseDisposition {
        let code = frame.map(|f| f.code);
        let disposition = CloseDisposition::classify(code);
        let name = code.map_or("NO_STATUS", describe_close_code);
        let reason = frame.map_or("", |f| f.reason.as_str());

        let next = match disposition {
            CloseDisposition::Terminal => {
                error!(code, name, reason, "connection closed, not reconnecting");
                ConnectionState::Disconnected
            }
            CloseDisposition::Resume => {
                warn!(code, name, reason, "connection closed, will resume");
                ConnectionState::Resume
            }
            CloseDisposition::Fresh => {
                warn!(code, name, reason, "connection closed, will reconnect fresh");
                ConnectionState::Fresh
            }
        };
        self.store.with(|s| {
            s.transition(next);
            s.stop_heartbeat();
        });
        disposition
    }

    /// Gives up on the current connection after a fatal error. The
    /// session is dropped, so the next Hello sends Identify.
    pub fn abandon(&mut self, err: &GatewayError) -> CloseFrame {
        error!(error = %err, "fatal error, dropping session");
        self.store.with(|s| {
            s.transition(ConnectionState::Fresh);
            s.stop_heartbeat();
        });
        CloseFrame::new(CloseFrame::NORMAL, FRESH_REASON)
    }

    /// Marks the client as stopped and returns the close frame to send.
    pub fn shutdown(&mut self) -> CloseFrame {
        info!("shutting down");
        self.store.with(|s| {
            s.transition(ConnectionState::Disconnected);
            s.stop_heartbeat();
        });
        CloseFrame::new(CloseFrame::NORMAL, SHUTDOWN_REASON)
    }
}

enum Handshake {
    Resume(Resume),
    Identify(String),
}

fn resume_body(session: &Session) -> Result<Resume, SessionError> {
    let session_id = session.session_id().ok_or(SessionError::MissingSessionId)?;
    Ok(Resume {
        token: session.token().to_owned(),
        session_id: session_id.to_owned(),
        seq: session.sequence_raw(),
    })
}

fn close_normal(reason: &str) -> Outbound {
    Outbound::Close(CloseFrame::new(CloseFrame::NORMAL, reason))
}
