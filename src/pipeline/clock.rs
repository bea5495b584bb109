//! Pacing clock for real-time delivery cadence

use std::time::Duration;
use tokio::time::Instant;

/// Absolute-deadline pacing clock shared by the stream readers and the
/// orchestrator.
///
/// The clock keeps a single next-tick deadline and advances it by one fixed
/// tick per cycle, so long-run cadence stays anchored to the cycle where
/// pacing started instead of drifting a little on every sleep. A deadline
/// that has already elapsed is reset to `now + tick`: late cycles accept the
/// drift rather than bursting to catch up, which would drain the queues in a
/// read storm after a stall.
pub struct PacingClock {
    tick: Duration,
    deadline: Instant,
}

impl PacingClock {
    /// Create a clock whose first deadline is one tick from now.
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            deadline: Instant::now() + tick,
        }
    }

    /// The nominal interval between ticks.
    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Restart pacing from now. Used when a paced loop (re)enters its
    /// steady state, e.g. after a source reopen.
    pub fn restart(&mut self) {
        self.deadline = Instant::now() + self.tick;
    }

    /// Time left until the current deadline; zero if it already passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Sleep out the remainder of the current cycle, then move the deadline
    /// one tick forward. If the deadline has already elapsed, return
    /// immediately and resynchronize to `now + tick`.
    pub async fn wait_next_tick(&mut self) {
        let now = Instant::now();
        if self.deadline > now {
            tokio::time::sleep_until(self.deadline).await;
            self.deadline += self.tick;
        } else {
            self.deadline = now + self.tick;
        }
    }
}

impl std::fmt::Debug for PacingClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacingClock")
            .field("tick", &self.tick)
            .field("remaining", &self.remaining())
            .finish()
    }
}
