//! Fixed-window rate limiters for Identify and dispatch traffic.
//!
//! Both limiters take the current time as an argument instead of
//! reading the clock, so the caller decides what "now" is (the frame's
//! receive time, a paused test clock, ...).
//!
//! They are fixed-window approximations: a burst straddling a window
//! boundary can pass up to twice the limit. The gateway tolerates this.

use std::time::{Duration, Instant};

use crate::SessionError;

/// Length of the Identify window.
pub const IDENTIFY_WINDOW: Duration = Duration::from_secs(5);

/// Length of the dispatch window.
pub const DISPATCH_WINDOW: Duration = Duration::from_secs(60);

/// Most dispatch events accepted in one [`DISPATCH_WINDOW`].
pub const MAX_DISPATCH_PER_WINDOW: u32 = 120;

// ---------------------------------------------------------------------------
// IdentifyLimiter
// ---------------------------------------------------------------------------

/// Caps Identify attempts at `max_concurrency` per 5 seconds.
#[derive(Debug, Clone)]
pub struct IdentifyLimiter {
    max_concurrency: u32,
    last_at: Option<Instant>,
    attempts: u32,
}

impl IdentifyLimiter {
    /// `max_concurrency` comes from the session-start budget. Zero is
    /// treated as one so that a single Identify is always possible.
    pub fn new(max_concurrency: u32) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            last_at: None,
            attempts: 0,
        }
    }

    /// Replaces the cap, keeping the current window.
    pub fn set_max_concurrency(&mut self, max_concurrency: u32) {
        self.max_concurrency = max_concurrency.max(1);
    }

    pub fn max_concurrency(&self) -> u32 {
        self.max_concurrency
    }

    /// Records an Identify attempt at `now`.
    ///
    /// An attempt 5 seconds or more after the last successful one starts
    /// a new window. A rejected attempt does not move the window.
    ///
    /// # Errors
    /// [`SessionError::IdentifyRateLimited`] when this attempt would be
    /// number `max_concurrency + 1` in the current window.
    pub fn try_acquire(&mut self, now: Instant) -> Result<(), SessionError> {
        let window_elapsed = self
            .last_at
            .is_none_or(|last| now.saturating_duration_since(last) >= IDENTIFY_WINDOW);

        if window_elapsed {
            self.attempts = 1;
        } else {
            self.attempts += 1;
            if self.attempts > self.max_concurrency {
                return Err(SessionError::IdentifyRateLimited {
                    max: self.max_concurrency,
                });
            }
        }

        self.last_at = Some(now);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DispatchLimiter
// ---------------------------------------------------------------------------

/// Caps inbound dispatch events at 120 per 60 seconds.
///
/// The window opens on the first event and runs for a fixed 60 seconds;
/// the next event after that opens a fresh one.
#[derive(Debug, Clone, Default)]
pub struct DispatchLimiter {
    window_start: Option<Instant>,
    count: u32,
}

impl DispatchLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one dispatch event at `now`.
    ///
    /// # Errors
    /// [`SessionError::DispatchRateLimited`] for the 121st event inside
    /// one window.
    pub fn try_acquire(&mut self, now: Instant) -> Result<(), SessionError> {
        let window_elapsed = self
            .window_start
            .is_none_or(|start| now.saturating_duration_since(start) >= DISPATCH_WINDOW);

        if window_elapsed {
            self.window_start = Some(now);
            self.count = 1;
            return Ok(());
        }

        self.count += 1;
        if self.count > MAX_DISPATCH_PER_WINDOW {
            return Err(SessionError::DispatchRateLimited {
                max: MAX_DISPATCH_PER_WINDOW,
            });
        }
        Ok(())
    }

    /// Events counted in the current window.
    pub fn count(&self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // IdentifyLimiter
    // =====================================================================

    #[test]
    fn test_identify_within_window_fails_on_max_plus_one() {
        let t0 = Instant::now();
        let mut limiter = IdentifyLimiter::new(2);

        limiter.try_acquire(t0).expect("first");
        limiter.try_acquire(t0 + Duration::from_secs(1)).expect("second");
        let result = limiter.try_acquire(t0 + Duration::from_secs(2));

        assert!(
            matches!(result, Err(SessionError::IdentifyRateLimited { max: 2 })),
            "third attempt inside 5s should be rejected, got {result:?}"
        );
    }

    #[test]
    fn test_identify_after_five_seconds_resets_window() {
        let t0 = Instant::now();
        let mut limiter = IdentifyLimiter::new(1);

        limiter.try_acquire(t0).expect("first");
        assert!(limiter.try_acquire(t0 + Duration::from_millis(4999)).is_err());
        limiter
            .try_acquire(t0 + Duration::from_secs(5))
            .expect("window should reset at exactly 5s");
    }

    #[test]
    fn test_identify_rejection_does_not_move_window() {
        let t0 = Instant::now();
        let mut limiter = IdentifyLimiter::new(1);

        limiter.try_acquire(t0).unwrap();
        assert!(limiter.try_acquire(t0 + Duration::from_secs(4)).is_err());
        // Measured from t0, not from the rejected attempt at t0+4s.
        assert!(limiter.try_acquire(t0 + Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_identify_zero_concurrency_allows_one_attempt() {
        let mut limiter = IdentifyLimiter::new(0);
        assert_eq!(limiter.max_concurrency(), 1);
        assert!(limiter.try_acquire(Instant::now()).is_ok());
    }

    // =====================================================================
    // DispatchLimiter
    // =====================================================================

    #[test]
    fn test_dispatch_121st_event_in_window_fails() {
        let t0 = Instant::now();
        let mut limiter = DispatchLimiter::new();

        for i in 0..MAX_DISPATCH_PER_WINDOW {
            let now = t0 + Duration::from_millis(u64::from(i) * 100);
            limiter.try_acquire(now).expect("within limit");
        }
        assert_eq!(limiter.count(), 120);

        let result = limiter.try_acquire(t0 + Duration::from_secs(30));
        assert!(matches!(
            result,
            Err(SessionError::DispatchRateLimited { max: 120 })
        ));
    }

    #[test]
    fn test_dispatch_new_window_accepts_again() {
        let t0 = Instant::now();
        let mut limiter = DispatchLimiter::new();

        for _ in 0..MAX_DISPATCH_PER_WINDOW {
            limiter.try_acquire(t0).unwrap();
        }
        limiter
            .try_acquire(t0 + DISPATCH_WINDOW)
            .expect("first event of a new window");
        assert_eq!(limiter.count(), 1);
    }
}
