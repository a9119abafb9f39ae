//! Reconnect backoff schedule.
//!
//! The delay is a pure function of the consecutive-failure count, kept
//! apart from the sleep so the schedule can be tested without a clock:
//!
//! ```text
//! failures   0..=2   → 1s
//! failures   3..=29  → failures/3 + 1 seconds (2s ..= 10s)
//! failures  30..     → 10s, and the count wraps to 0 once it reaches 40
//! ```

use std::time::Duration;

/// Count at which the failure counter wraps back to zero.
pub const WRAP_AT: u32 = 40;

/// Longest delay the schedule produces.
pub const MAX_DELAY: Duration = Duration::from_secs(10);

/// Consecutive-failure counter driving the reconnect delay.
#[derive(Debug, Clone, Default)]
pub struct Backoff {
    failures: u32,
}

impl Backoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// The delay to apply after the `failures`-th consecutive failure
    /// (zero-based).
    pub fn delay_for(failures: u32) -> Duration {
        match failures {
            0..=2 => Duration::from_secs(1),
            3..=29 => Duration::from_secs(u64::from(failures / 3 + 1)),
            _ => MAX_DELAY,
        }
    }

    /// Current consecutive-failure count.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Delay for the current count, without recording a failure.
    pub fn delay(&self) -> Duration {
        Self::delay_for(self.failures)
    }

    /// Records a failed attempt and returns how long to wait before the
    /// next one.
    pub fn fail(&mut self) -> Duration {
        let delay = self.delay();
        if self.failures >= WRAP_AT {
            self.failures = 0;
        } else {
            self.failures += 1;
        }
        delay
    }

    /// Clears the counter after a successful connection.
    pub fn reset(&mut self) {
        self.failures = 0;
    }
}
