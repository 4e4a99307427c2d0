//! Cadence clock.
use std::{
    thread,
    time::{Duration, Instant},
};

use crate::constants::NANOS_IN_SECOND;

/// Number of periods a clock may fall behind before it gives up catching up.
const MAX_LAG_PERIODS: u32 = 4;

/// Timer to synchronize a driver loop with one of the machine's clocks.
///
/// It is designed to work with the yielding cooperative pattern
/// of the interpreter loop. When the VM yields control back to the
/// caller, time elapses until it is resumed. Once the interpreter
/// is resumed, the elapsed time is taken into account when determining
/// the next cycle.
#[derive(Debug)]
pub struct Clock {
    interval: Duration,
    last: Instant,
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Instant::now(),
        }
    }

    /// Creates a clock ticking at the given frequency.
    pub fn from_hz(hz: Hz) -> Self {
        Self::new(hz.into())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Set the clock state back to zero.
    pub fn reset(&mut self) {
        self.last = Instant::now()
    }

    /// Non-blocking check whether a full period has elapsed.
    ///
    /// Returns `true` at most once per period.
    pub fn tick(&mut self) -> bool {
        let elapsed = self.last.elapsed();
        if elapsed < self.interval {
            return false;
        }

        if elapsed >= self.interval * MAX_LAG_PERIODS {
            // Reset back to zero, rather than trying to catch up.
            //
            // If the VM was paused for debugging, and a large
            // amount of time has elapsed until it is resumed,
            // it should simply continue at the next cycle running
            // at its usual speed.
            self.reset();
        } else {
            // Advance by whole periods so polling latency doesn't
            // accumulate into drift.
            self.last += self.interval;
        }

        true
    }

    /// Block the current thread until the next clock cycle.
    pub fn wait(&mut self) {
        while !self.tick() {
            // Sleep does not have enough resolution, and causes
            // the clock to run at 30 FPS.
            //
            // Spinning a loop causes high CPU usage and fan madness.
            //
            // Yielding in a loop is the best alternative.
            thread::yield_now();
        }
    }
}

/// Clock frequency, in hertz (per second)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}
