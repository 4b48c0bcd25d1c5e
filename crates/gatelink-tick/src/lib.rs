//! Fixed-rate idle tick scheduler for Gatelink.
//!
//! The gateway client has two sources of work: frames arriving on the
//! socket, and time passing. This crate covers the second one. An
//! [`IdleTicker`] fires at a fixed rate; on every tick the client checks
//! whether a heartbeat is due and then runs the application's idle hook.
//!
//! Ticks are never batched. If the runner falls behind (a slow idle
//! hook, a stalled executor), the missed ticks are skipped and the
//! schedule restarts from "now", so a late wakeup produces exactly one
//! heartbeat check, not a burst.
//!
//! # Disabled mode
//!
//! When `tick_rate_hz` is 0, [`IdleTicker::wait_for_tick`] pends
//! forever. The same happens while the ticker is paused (between
//! connections).
//!
//! # Integration
//!
//! The ticker sits inside the runner's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         frame = conn.recv() => { /* handle frame */ }
//!         tick = ticker.wait_for_tick() => {
//!             gateway.on_idle(tick.at);
//!             ticker.finish_tick();
//!         }
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the idle ticker.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Tick rate in Hz. 0 disables the ticker.
    pub tick_rate_hz: u32,
    /// Random delay (0..max ms) added before the *first* tick, so that
    /// several clients started together don't heartbeat in lockstep.
    pub initial_jitter_ms: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 10,
            initial_jitter_ms: 0,
        }
    }
}

impl TickConfig {
    /// Maximum supported tick rate.
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    /// A config for a specific rate, no jitter.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values. Called by [`IdleTicker::new`].
    pub fn validated(mut self) -> Self {
        if self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            warn!(
                rate = self.tick_rate_hz,
                max = Self::MAX_TICK_RATE_HZ,
                "tick_rate_hz exceeds maximum, clamping"
            );
            self.tick_rate_hz = Self::MAX_TICK_RATE_HZ;
        }
        self
    }

    /// Time between ticks, or `None` when disabled.
    pub fn tick_duration(&self) -> Option<Duration> {
        if self.tick_rate_hz == 0 {
            None
        } else {
            Some(Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz)))
        }
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// One fired tick, returned by [`IdleTicker::wait_for_tick`].
#[derive(Debug, Clone, Copy)]
pub struct IdleTick {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// When the tick fired. Taken from the Tokio clock, so it follows
    /// paused test time.
    pub at: Instant,
    /// `true` if the tick fired more than 10% late.
    pub overrun: bool,
    /// Ticks dropped because of the overrun.
    pub ticks_skipped: u64,
}

/// Counters kept by the ticker.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    /// Longest time between a tick firing and [`IdleTicker::finish_tick`].
    pub max_idle_work: Duration,
}

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// Fixed-rate ticker driving heartbeats and the idle hook.
pub struct IdleTicker {
    config: TickConfig,
    tick_duration: Option<Duration>,
    tick_count: u64,
    next_tick: Option<TokioInstant>,
    /// Set when a tick fires, consumed by `finish_tick`.
    tick_start: Option<TokioInstant>,
    paused: bool,
    metrics: TickMetrics,
}

impl IdleTicker {
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();

        let next_tick = tick_duration.map(|d| {
            let jitter = if config.initial_jitter_ms > 0 {
                Duration::from_millis(rand::rng().random_range(0..config.initial_jitter_ms))
            } else {
                Duration::ZERO
            };
            TokioInstant::now() + d + jitter
        });

        match tick_duration {
            None => debug!("idle ticker disabled (rate 0)"),
            Some(period) => debug!(
                rate_hz = config.tick_rate_hz,
                period_ms = period.as_secs_f64() * 1000.0,
                "idle ticker created"
            ),
        }

        Self {
            config,
            tick_duration,
            tick_count: 0,
            next_tick,
            tick_start: None,
            paused: false,
            metrics: TickMetrics::default(),
        }
    }

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Waits until the next tick is due.
    ///
    /// Pends forever when disabled or paused; `tokio::select!` keeps
    /// polling its other branches.
    pub async fn wait_for_tick(&mut self) -> IdleTick {
        let (next, period) = match (self.next_tick, self.tick_duration) {
            (Some(next), Some(period)) if !self.paused => (next, period),
            _ => std::future::pending().await,
        };

        time::sleep_until(next).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(now);

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > period / 10;
        let mut ticks_skipped = 0;
        if overrun {
            ticks_skipped = (late_by.as_nanos() / period.as_nanos()) as u64;
            if ticks_skipped > 0 {
                warn!(
                    tick = self.tick_count,
                    skipped = ticks_skipped,
                    late_ms = late_by.as_secs_f64() * 1000.0,
                    "idle tick overrun, skipping ahead"
                );
            }
            self.metrics.total_overruns += 1;
        }
        // Always schedule from now, not from the missed deadline.
        self.next_tick = Some(now + period);

        self.metrics.total_ticks += 1;
        self.metrics.total_skipped += ticks_skipped;
        trace!(tick = self.tick_count, overrun, "idle tick fired");

        IdleTick {
            tick: self.tick_count,
            at: now.into_std(),
            overrun,
            ticks_skipped,
        }
    }

    /// Marks the work for the current tick as done.
    ///
    /// Warns when the idle work took longer than one tick period, which
    /// delays both frame handling and the next heartbeat check.
    pub fn finish_tick(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = TokioInstant::now().saturating_duration_since(start);
        self.metrics.max_idle_work = self.metrics.max_idle_work.max(elapsed);

        if let Some(period) = self.tick_duration {
            if elapsed >= period {
                warn!(
                    tick = self.tick_count,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    period_ms = period.as_secs_f64() * 1000.0,
                    "idle work exceeded tick period"
                );
            }
        }
    }

    /// Stops ticking until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "idle ticker paused");
        }
    }

    /// Restarts ticking one full period from now, so the time spent
    /// paused doesn't count as an overrun.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            if let Some(period) = self.tick_duration {
                self.next_tick = Some(TokioInstant::now() + period);
            }
            debug!(tick = self.tick_count, "idle ticker resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_disabled(&self) -> bool {
        self.tick_duration.is_none()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn tick_duration(&self) -> Option<Duration> {
        self.tick_duration
    }
}
