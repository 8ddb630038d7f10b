//! Command-loss watchdog and status cadence timer.
//!
//! Both work on `Instant`s handed in by the caller and only ever compute
//! `saturating_duration_since`, so a timestamp refreshed after the caller
//! sampled "now" reads as zero elapsed, never as a wrapped huge value.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogStatus {
    Alive,
    Tripped,
}

/// Liveness monitor for the host command stream.
#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout: Duration,
    last_command: Instant,
    tripped: bool,
}

impl Watchdog {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_command: now,
            tripped: false,
        }
    }

    /// A command line was recognized (valid or not): the link is alive.
    pub fn feed(&mut self, now: Instant) {
        self.last_command = now;
        self.tripped = false;
    }

    /// Returns true exactly once per trip: on the first check that sees the
    /// timeout exceeded while still alive.
    pub fn check(&mut self, now: Instant) -> bool {
        if self.tripped {
            return false;
        }
        if self.elapsed(now) > self.timeout {
            self.tripped = true;
            return true;
        }
        false
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_command)
    }

    pub fn status(&self) -> WatchdogStatus {
        if self.tripped {
            WatchdogStatus::Tripped
        } else {
            WatchdogStatus::Alive
        }
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    pub fn last_command(&self) -> Instant {
        self.last_command
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Fixed-cadence trigger for status frames.
///
/// The schedule advances by whole periods so emissions do not drift with loop
/// jitter; if the loop fell behind by more than a period, it resynchronizes to
/// `now` instead of bursting out the backlog.
#[derive(Debug, Clone)]
pub struct StatusTimer {
    period: Duration,
    last: Instant,
}

impl StatusTimer {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self { period, last: now }
    }

    pub fn restart(&mut self, now: Instant) {
        self.last = now;
    }

    /// True when a frame is due at `now`.
    pub fn due(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last);
        if elapsed < self.period {
            return false;
        }
        self.last += self.period;
        if now.saturating_duration_since(self.last) >= self.period {
            self.last = now;
        }
        true
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}
