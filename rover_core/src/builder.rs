//! Builders for [`Controller`].
//!
//! `ControllerBuilder` assembles a boxed-driver controller with type-state
//! markers so `build()` only exists once both actuators are set;
//! `try_build()` works in any state and reports what is missing.
//! [`build_controller`] is the statically dispatched equivalent.

use std::marker::PhantomData;
use std::sync::Arc;

use rover_traits::{Clock, DutyDriver, MonotonicClock, ServoDriver};

use crate::config::{MotorCfg, TimingCfg};
use crate::controller::Controller;
use crate::encoder::TickCounter;
use crate::error::{BuildError, Result};

/// Smallest line buffer that still fits `E`, `R` and a terminator with room to spare.
pub const MIN_LINE_CAPACITY: usize = 4;

/// Controller over boxed drivers, as produced by [`ControllerBuilder`].
pub type DynController = Controller<Box<dyn DutyDriver>, Box<dyn ServoDriver>>;

pub struct Missing;
pub struct Set;

pub struct ControllerBuilder<M, S> {
    motor: Option<Box<dyn DutyDriver>>,
    servo: Option<Box<dyn ServoDriver>>,
    timing: Option<TimingCfg>,
    motor_cfg: Option<MotorCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    ticks: Option<TickCounter>,
    _m: PhantomData<M>,
    _s: PhantomData<S>,
}

impl Default for ControllerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            motor: None,
            servo: None,
            timing: None,
            motor_cfg: None,
            clock: None,
            ticks: None,
            _m: PhantomData,
            _s: PhantomData,
        }
    }
}

impl ControllerBuilder<Missing, Missing> {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Reject timing values the loop cannot run with.
pub fn validate_timing(timing: &TimingCfg) -> Result<()> {
    if timing.watchdog_ms == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "watchdog_ms must be > 0",
        )));
    }
    if timing.status_ms == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "status_ms must be > 0",
        )));
    }
    if timing.loop_us == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "loop_us must be > 0",
        )));
    }
    if timing.line_capacity < MIN_LINE_CAPACITY {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "line_capacity must be >= 4",
        )));
    }
    Ok(())
}

/// Reject motor settings that would skip the reversal settle.
pub fn validate_motor(motor: &MotorCfg) -> Result<()> {
    if motor.settle_ms == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "settle_ms must be > 0",
        )));
    }
    Ok(())
}

impl<M, S> ControllerBuilder<M, S> {
    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<DynController> {
        let ControllerBuilder {
            motor,
            servo,
            timing,
            motor_cfg,
            clock,
            ticks,
            _m: _,
            _s: _,
        } = self;

        let motor = motor.ok_or_else(|| eyre::Report::new(BuildError::MissingMotor))?;
        let servo = servo.ok_or_else(|| eyre::Report::new(BuildError::MissingServo))?;
        let timing = timing.unwrap_or_default();
        let motor_cfg = motor_cfg.unwrap_or_default();
        validate_timing(&timing)?;
        validate_motor(&motor_cfg)?;

        let clock = clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        Ok(Controller::from_parts(
            motor,
            servo,
            &timing,
            &motor_cfg,
            ticks.unwrap_or_default(),
            clock,
        ))
    }

    // ── Chainable optional settings ──

    pub fn with_timing(mut self, timing: TimingCfg) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn with_motor_cfg(mut self, cfg: MotorCfg) -> Self {
        self.motor_cfg = Some(cfg);
        self
    }

    /// Inject a clock (tests use a manual one).
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Share an existing tick counter, e.g. one an encoder thread already writes.
    pub fn with_ticks(mut self, ticks: TickCounter) -> Self {
        self.ticks = Some(ticks);
        self
    }

    /// Apply the `[timing]` and `[motor]` sections of a loaded config.
    pub fn apply_config(self, cfg: &rover_config::Config) -> Self {
        self.with_timing(TimingCfg::from(&cfg.timing))
            .with_motor_cfg(MotorCfg::from(&cfg.motor))
    }

    fn retype<M2, S2>(self) -> ControllerBuilder<M2, S2> {
        ControllerBuilder {
            motor: self.motor,
            servo: self.servo,
            timing: self.timing,
            motor_cfg: self.motor_cfg,
            clock: self.clock,
            ticks: self.ticks,
            _m: PhantomData,
            _s: PhantomData,
        }
    }
}

// ── Type-state setters ──

impl<S> ControllerBuilder<Missing, S> {
    pub fn with_motor(self, motor: impl DutyDriver + 'static) -> ControllerBuilder<Set, S> {
        let mut next = self.retype::<Set, S>();
        next.motor = Some(Box::new(motor));
        next
    }
}

impl<M> ControllerBuilder<M, Missing> {
    pub fn with_servo(self, servo: impl ServoDriver + 'static) -> ControllerBuilder<M, Set> {
        let mut next = self.retype::<M, Set>();
        next.servo = Some(Box::new(servo));
        next
    }
}

impl ControllerBuilder<Set, Set> {
    /// Validate and build. Only available once motor and servo are set.
    pub fn build(self) -> Result<DynController> {
        self.try_build()
    }
}

/// Build a statically dispatched controller from concrete drivers.
pub fn build_controller<M, S>(
    motor: M,
    servo: S,
    timing: TimingCfg,
    motor_cfg: MotorCfg,
    ticks: TickCounter,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
) -> Result<Controller<M, S>>
where
    M: DutyDriver,
    S: ServoDriver,
{
    validate_timing(&timing)?;
    validate_motor(&motor_cfg)?;
    let clock = clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));
    Ok(Controller::from_parts(
        motor, servo, &timing, &motor_cfg, ticks, clock,
    ))
}
