//! Periodic timer engine.
//!
//! Timer callbacks fire from the main loop, never from another thread.
//! The loop polls each timer with the current monotonic time; a timer that
//! is due reports it once and re-arms from that moment.
//!
//! ```text
//!   loop iteration ──▶ PeriodicTimer::poll(now) ──▶ due? ──▶ callback work
//!                                  │
//!                                  └── re-arm at `now` (missed periods are dropped)
//! ```
//!
//! Re-arming from the fire time rather than from the previous deadline
//! means a stalled loop never produces a burst of catch-up fires.

use log::debug;

/// Monotonic millisecond stamp supplied by the loop.
pub type Millis = u64;

/// A fixed-period timer polled from a single-threaded loop.
#[derive(Debug, Clone)]
pub struct PeriodicTimer {
    label: &'static str,
    period_ms: Millis,
    last_fire: Millis,
    enabled: bool,
    fired: u64,
    skipped_periods: u64,
}

impl PeriodicTimer {
    /// Create a timer whose first fire is one full period after `now`.
    pub fn new(label: &'static str, period_ms: Millis, now: Millis) -> Self {
        Self {
            label,
            period_ms: period_ms.max(1),
            last_fire: now,
            enabled: true,
            fired: 0,
            skipped_periods: 0,
        }
    }

    /// Returns `true` at most once per elapsed period.
    ///
    /// When more than one period has passed since the last fire, the extra
    /// periods are counted in [`skipped_periods`](Self::skipped_periods)
    /// and discarded.
    pub fn poll(&mut self, now: Millis) -> bool {
        if !self.enabled {
            return false;
        }
        let elapsed = now.saturating_sub(self.last_fire);
        if elapsed < self.period_ms {
            return false;
        }

        let missed = elapsed / self.period_ms - 1;
        if missed > 0 {
            debug!("Timer '{}': dropped {} missed period(s)", self.label, missed);
            self.skipped_periods += missed;
        }
        self.last_fire = now;
        self.fired += 1;
        true
    }

    /// Milliseconds until the next fire (0 when due).
    pub fn remaining(&self, now: Millis) -> Millis {
        self.period_ms
            .saturating_sub(now.saturating_sub(self.last_fire))
    }

    pub fn set_enabled(&mut self, enabled: bool, now: Millis) {
        if enabled && !self.enabled {
            self.last_fire = now;
        }
        self.enabled = enabled;
    }

    pub fn period_ms(&self) -> Millis {
        self.period_ms
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Total fires since creation.
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Periods that elapsed without a fire because the loop was late.
    pub fn skipped_periods(&self) -> u64 {
        self.skipped_periods
    }
}
