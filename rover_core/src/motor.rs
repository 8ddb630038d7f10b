//! Traction motor control with back-EMF protection.
//!
//! A direct Forward↔Backward reversal is always split into
//! `stop → settle delay → opposite direction`. Transitions through `Stopped`
//! apply immediately.

use std::sync::Arc;
use std::time::Duration;

use eyre::WrapErr;
use rover_traits::{Clock, DutyDriver};

use crate::config::SPEED_LIMIT;
use crate::error::Result;
use crate::hw_error::{Seam, map_hw_error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Forward,
    Backward,
    #[default]
    Stopped,
}

impl Direction {
    /// Direction implied by the sign of a speed value.
    pub fn of(speed: i32) -> Self {
        match speed.signum() {
            1 => Direction::Forward,
            -1 => Direction::Backward,
            _ => Direction::Stopped,
        }
    }

    /// True for Forward↔Backward, the only transitions that need a settle delay.
    pub fn reverses(self, next: Direction) -> bool {
        matches!(
            (self, next),
            (Direction::Forward, Direction::Backward) | (Direction::Backward, Direction::Forward)
        )
    }
}

/// Map a speed magnitude (0..=100) onto 0..=ceiling, rounding to nearest.
///
/// Any non-zero magnitude yields at least duty 1 so a small command is never
/// silently turned into a stop.
pub fn scale_duty(magnitude: u32, ceiling: u8) -> u8 {
    let limit = SPEED_LIMIT.unsigned_abs();
    let magnitude = magnitude.min(limit);
    if magnitude == 0 || ceiling == 0 {
        return 0;
    }
    let ceiling = u32::from(ceiling.min(100));
    let scaled = (magnitude * ceiling + limit / 2) / limit;
    u8::try_from(scaled.clamp(1, ceiling)).unwrap_or(u8::MAX)
}

/// Converts signed speed commands into duty + direction on a [`DutyDriver`].
pub struct MotorController<M: DutyDriver> {
    driver: M,
    settle: Duration,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl<M: DutyDriver> core::fmt::Debug for MotorController<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MotorController")
            .field("settle", &self.settle)
            .field("duty_ceiling", &self.driver.duty_ceiling())
            .finish()
    }
}

impl<M: DutyDriver> MotorController<M> {
    pub fn new(driver: M, settle: Duration, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            driver,
            settle,
            clock,
        }
    }

    /// Apply `speed` given the direction currently applied; returns the new direction.
    ///
    /// On a direct reversal the driver is stopped and the call blocks for the
    /// settle delay before the opposite direction is engaged. Nothing else can
    /// reach the driver during that window.
    pub fn apply(&mut self, current: Direction, speed: i32) -> Result<Direction> {
        let next = Direction::of(speed);

        if current.reverses(next) {
            self.stop_driver().wrap_err("stopping before reversal")?;
            tracing::debug!(settle_ms = self.settle.as_millis() as u64, "direction reversal, settling");
            self.clock.sleep(self.settle);
        }

        let duty = scale_duty(speed.unsigned_abs(), self.driver.duty_ceiling());
        match next {
            Direction::Forward => self
                .driver
                .set_forward(duty)
                .map_err(|e| eyre::Report::new(map_hw_error(&*e, Seam::Actuator)))
                .wrap_err("set_forward")?,
            Direction::Backward => self
                .driver
                .set_backward(duty)
                .map_err(|e| eyre::Report::new(map_hw_error(&*e, Seam::Actuator)))
                .wrap_err("set_backward")?,
            Direction::Stopped => self.stop_driver()?,
        }
        tracing::debug!(speed, duty, direction = ?next, "motor applied");
        Ok(next)
    }

    /// Immediate stop: no settle delay, no direction bookkeeping.
    pub fn emergency_stop(&mut self) -> Result<()> {
        self.stop_driver().wrap_err("emergency stop")
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle
    }

    pub fn driver(&self) -> &M {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut M {
        &mut self.driver
    }

    fn stop_driver(&mut self) -> Result<()> {
        self.driver
            .stop()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e, Seam::Actuator)))
            .wrap_err("motor stop")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_follows_sign() {
        assert_eq!(Direction::of(1), Direction::Forward);
        assert_eq!(Direction::of(-100), Direction::Backward);
        assert_eq!(Direction::of(0), Direction::Stopped);
    }

    #[test]
    fn only_direct_reversals_need_settling() {
        use Direction::*;
        assert!(Forward.reverses(Backward));
        assert!(Backward.reverses(Forward));
        for (a, b) in [
            (Stopped, Forward),
            (Stopped, Backward),
            (Forward, Stopped),
            (Backward, Stopped),
            (Forward, Forward),
            (Stopped, Stopped),
        ] {
            assert!(!a.reverses(b), "{a:?} -> {b:?}");
        }
    }

    #[test]
    fn duty_scales_onto_ceiling() {
        assert_eq!(scale_duty(100, 100), 100);
        assert_eq!(scale_duty(50, 100), 50);
        assert_eq!(scale_duty(100, 60), 60);
        assert_eq!(scale_duty(50, 60), 30);
        assert_eq!(scale_duty(1, 60), 1);
        assert_eq!(scale_duty(0, 60), 0);
        assert_eq!(scale_duty(250, 80), 80);
    }
}
