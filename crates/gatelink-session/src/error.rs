//! Error types for the session layer.

/// Errors raised by session bookkeeping.
///
/// These are about *our* side of the contract with the gateway: sending
/// too much, too fast, or without the state a step requires.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// More Identify attempts inside one 5-second window than the
    /// session-start budget allows.
    #[error("identify rate limit exceeded: more than {max} attempts in 5s")]
    IdentifyRateLimited { max: u32 },

    /// More dispatch events inside one 60-second window than allowed.
    #[error("dispatch rate limit exceeded: more than {max} events in 60s")]
    DispatchRateLimited { max: u32 },

    /// A Resume was requested but no session id was ever assigned.
    #[error("cannot resume without a session id")]
    MissingSessionId,

    /// The session-start budget could not be fetched.
    #[error("session-start budget unavailable: {0}")]
    BudgetUnavailable(String),
}
