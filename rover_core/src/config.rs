//! Configuration types for the motion controller.
//!
//! These are the runtime configuration structs used by `Controller`.
//! They are separate from the TOML-deserialized config in `rover_config`.

use std::time::Duration;

/// Steering angle the servo returns to on startup and emergency stop.
pub const STEERING_CENTER_DEG: i32 = 90;
/// Lowest accepted steering angle.
pub const STEERING_MIN_DEG: i32 = 0;
/// Highest accepted steering angle.
pub const STEERING_MAX_DEG: i32 = 180;
/// Commanded speed range is symmetric around zero.
pub const SPEED_LIMIT: i32 = 100;

/// Loop timing: watchdog window, status cadence, input buffering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingCfg {
    /// Force a stop when no command has been seen for longer than this.
    pub watchdog_ms: u64,
    /// Emit one status frame per this many milliseconds.
    pub status_ms: u64,
    /// Idle sleep between main-loop iterations (runner only).
    pub loop_us: u64,
    /// Line buffer capacity in bytes, including the terminator slot.
    pub line_capacity: usize,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            watchdog_ms: 200,
            status_ms: 20,
            loop_us: 1_000,
            line_capacity: 64,
        }
    }
}

impl TimingCfg {
    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_ms)
    }

    pub fn status_period(&self) -> Duration {
        Duration::from_millis(self.status_ms)
    }

    pub fn loop_period(&self) -> Duration {
        Duration::from_micros(self.loop_us)
    }
}

/// Traction motor behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotorCfg {
    /// Full-stop hold before engaging the opposite direction (back-EMF protection).
    pub settle_ms: u64,
}

impl Default for MotorCfg {
    fn default() -> Self {
        Self { settle_ms: 30 }
    }
}

impl MotorCfg {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}
