//! Steering servo control.

use eyre::WrapErr;
use rover_traits::ServoDriver;

use crate::config::{STEERING_CENTER_DEG, STEERING_MAX_DEG, STEERING_MIN_DEG};
use crate::error::Result;
use crate::hw_error::{Seam, map_hw_error};

/// Clamps angles into 0..=180 before they reach the servo driver.
#[derive(Debug)]
pub struct SteeringController<S: ServoDriver> {
    servo: S,
}

impl<S: ServoDriver> SteeringController<S> {
    pub fn new(servo: S) -> Self {
        Self { servo }
    }

    /// Command `angle` (clamped); returns the angle actually sent.
    pub fn set_angle(&mut self, angle: i32) -> Result<i32> {
        let angle = angle.clamp(STEERING_MIN_DEG, STEERING_MAX_DEG);
        let deg = u8::try_from(angle).unwrap_or(u8::MAX);
        self.servo
            .set_angle(deg)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e, Seam::Actuator)))
            .wrap_err("servo set_angle")?;
        tracing::debug!(angle, "steering applied");
        Ok(angle)
    }

    pub fn center(&mut self) -> Result<i32> {
        self.set_angle(STEERING_CENTER_DEG)
    }

    pub fn servo(&self) -> &S {
        &self.servo
    }
}
