//! State owned by the control loop.

use crate::config::STEERING_CENTER_DEG;
use crate::motor::Direction;

/// Last values actually applied to the actuators.
///
/// `direction` always matches the sign of the last speed handed to the motor
/// controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionState {
    pub speed: i32,
    pub steer: i32,
    pub direction: Direction,
}

impl Default for MotionState {
    fn default() -> Self {
        Self {
            speed: 0,
            steer: STEERING_CENTER_DEG,
            direction: Direction::Stopped,
        }
    }
}

impl MotionState {
    /// Zero the traction state, leaving steering untouched.
    pub fn halt(&mut self) {
        self.speed = 0;
        self.direction = Direction::Stopped;
    }
}

/// Running totals for `--stats` and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub applied: u64,
    pub rejected: u64,
    pub overflows: u64,
    pub watchdog_trips: u64,
    pub frames: u64,
}
