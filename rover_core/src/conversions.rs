//! `From` implementations bridging `rover_config` types to `rover_core` types.

use crate::config::{MotorCfg, TimingCfg};

impl From<&rover_config::Timing> for TimingCfg {
    fn from(c: &rover_config::Timing) -> Self {
        Self {
            watchdog_ms: c.watchdog_ms,
            status_ms: c.status_ms,
            loop_us: c.loop_us,
            line_capacity: c.line_capacity,
        }
    }
}

impl From<&rover_config::Motor> for MotorCfg {
    fn from(c: &rover_config::Motor) -> Self {
        Self {
            settle_ms: c.settle_ms,
        }
    }
}
