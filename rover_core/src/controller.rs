//! The motion control loop (`Controller`).
//!
//! Owns every piece of main-loop state: the line buffer, the applied motion
//! values, the watchdog and the status cadence. The only datum shared with the
//! edge context is the [`TickCounter`], which is atomic.

use std::sync::Arc;
use std::time::Instant;

use eyre::WrapErr;
use rover_traits::{Clock, DutyDriver, HostLink, ServoDriver};

use crate::config::{MotorCfg, TimingCfg};
use crate::encoder::{QuadratureDecoder, TickCounter};
use crate::error::Result;
use crate::hw_error::{Seam, map_hw_error};
use crate::motor::MotorController;
use crate::protocol::{Command, LineBuffer, StatusFrame};
use crate::state::{Counters, MotionState};
use crate::status::Dispatch;
use crate::steering::SteeringController;
use crate::watchdog::{StatusTimer, Watchdog, WatchdogStatus};

/// Upper bound on bytes consumed by a single [`Controller::poll`], so a
/// flooding host cannot starve the watchdog and status timer.
pub const MAX_BYTES_PER_POLL: usize = 512;

pub struct Controller<M: DutyDriver, S: ServoDriver> {
    pub(crate) motor: MotorController<M>,
    pub(crate) steering: SteeringController<S>,
    pub(crate) ticks: TickCounter,
    pub(crate) line: LineBuffer,
    pub(crate) motion: MotionState,
    pub(crate) watchdog: Watchdog,
    pub(crate) status: StatusTimer,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) counters: Counters,
}

impl<M: DutyDriver, S: ServoDriver> core::fmt::Debug for Controller<M, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Controller")
            .field("motion", &self.motion)
            .field("ticks", &self.ticks.read())
            .field("watchdog", &self.watchdog.status())
            .finish()
    }
}

impl<M: DutyDriver, S: ServoDriver> Controller<M, S> {
    pub(crate) fn from_parts(
        motor: M,
        servo: S,
        timing: &TimingCfg,
        motor_cfg: &MotorCfg,
        ticks: TickCounter,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let now = clock.now();
        Self {
            motor: MotorController::new(motor, motor_cfg.settle_delay(), clock.clone()),
            steering: SteeringController::new(servo),
            ticks,
            line: LineBuffer::with_capacity(timing.line_capacity),
            motion: MotionState::default(),
            watchdog: Watchdog::new(timing.watchdog_timeout(), now),
            status: StatusTimer::new(timing.status_period(), now),
            clock,
            counters: Counters::default(),
        }
    }

    /// Startup sequence: motor off, steering centered, timers armed from now.
    pub fn begin(&mut self) -> Result<()> {
        self.motor.emergency_stop().wrap_err("begin")?;
        self.steering.center().wrap_err("begin")?;
        self.motion = MotionState::default();
        let now = self.clock.now();
        self.watchdog.feed(now);
        self.status.restart(now);
        tracing::info!(
            watchdog_ms = self.watchdog.timeout().as_millis() as u64,
            status_ms = self.status.period().as_millis() as u64,
            "controller ready"
        );
        Ok(())
    }

    /// Feed one received byte; a completed line is dispatched immediately.
    ///
    /// Overflowed lines are dropped silently and do not touch the watchdog.
    pub fn feed_byte(&mut self, byte: u8) -> Result<Option<Dispatch>> {
        match self.line.feed(byte) {
            Some(line) => self.dispatch_line(line.as_str()).map(Some),
            None => Ok(None),
        }
    }

    /// Refresh the watchdog, then parse and execute one line.
    ///
    /// A malformed line is reported on the diagnostic target and otherwise
    /// ignored. Actuator failures are propagated after a best-effort stop.
    pub fn dispatch_line(&mut self, line: &str) -> Result<Dispatch> {
        let now = self.clock.now();
        if self.watchdog.is_tripped() {
            tracing::info!(target: "rover::watchdog", "command link restored");
        }
        self.watchdog.feed(now);

        match line.parse::<Command>() {
            Ok(cmd) => {
                self.execute(cmd)?;
                self.counters.applied += 1;
                Ok(Dispatch::Applied(cmd))
            }
            Err(e) => {
                self.counters.rejected += 1;
                tracing::warn!(target: "rover::diag", error = %e, "command rejected");
                Ok(Dispatch::Rejected(e))
            }
        }
    }

    fn execute(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::Drive { speed, steer } => self.drive(speed, steer),
            Command::EmergencyStop => self.emergency_stop(),
            Command::ResetEncoder => {
                self.reset_encoder();
                Ok(())
            }
        }
    }

    fn drive(&mut self, speed: i32, steer: i32) -> Result<()> {
        if speed != self.motion.speed {
            match self.motor.apply(self.motion.direction, speed) {
                Ok(direction) => {
                    self.motion.speed = speed;
                    self.motion.direction = direction;
                }
                Err(e) => {
                    if let Err(stop_err) = self.motor.emergency_stop() {
                        tracing::warn!(error = %stop_err, "motor stop failed after apply error");
                    }
                    self.motion.halt();
                    return Err(e.wrap_err(format!("drive speed {speed}")));
                }
            }
        }
        if steer != self.motion.steer {
            self.motion.steer = self
                .steering
                .set_angle(steer)
                .wrap_err_with(|| format!("drive steer {steer}"))?;
        }
        Ok(())
    }

    /// Motor off with no settle delay, steering centered, motion state zeroed.
    pub fn emergency_stop(&mut self) -> Result<()> {
        self.motion = MotionState::default();
        let stopped = self.motor.emergency_stop();
        let centered = self.steering.center();
        tracing::warn!(target: "rover::diag", "emergency stop");
        stopped?;
        centered.map(|_| ())
    }

    /// Zero the tick count; commanded speed and steer are untouched.
    pub fn reset_encoder(&mut self) {
        self.ticks.reset();
        tracing::debug!(target: "rover::diag", "encoder reset");
    }

    /// Watchdog check then status cadence, against a freshly sampled `now`.
    ///
    /// Returns the frame to emit, if one is due.
    pub fn service(&mut self) -> Result<Option<StatusFrame>> {
        let now = self.clock.now();
        self.check_watchdog(now);
        if self.status.due(now) {
            self.counters.frames += 1;
            return Ok(Some(self.status_frame()));
        }
        Ok(None)
    }

    fn check_watchdog(&mut self, now: Instant) {
        if !self.watchdog.check(now) {
            return;
        }
        self.counters.watchdog_trips += 1;
        if let Err(e) = self.motor.emergency_stop() {
            tracing::warn!(error = %e, "motor stop failed on watchdog trip");
        }
        self.motion.halt();
        tracing::warn!(
            target: "rover::watchdog",
            elapsed_ms = self.watchdog.elapsed(now).as_millis() as u64,
            "command timeout, motor stopped"
        );
    }

    /// One main-loop iteration: drain the link, dispatch, service, report.
    pub fn poll<L: HostLink + ?Sized>(&mut self, link: &mut L) -> Result<()> {
        let mut dispatch_err = None;
        for _ in 0..MAX_BYTES_PER_POLL {
            let byte = match link.read_byte() {
                Ok(Some(b)) => b,
                Ok(None) => break,
                Err(e) => {
                    dispatch_err = Some(
                        eyre::Report::new(map_hw_error(&*e, Seam::Link)).wrap_err("link read"),
                    );
                    break;
                }
            };
            if let Err(e) = self.feed_byte(byte) {
                dispatch_err = Some(e);
                break;
            }
        }

        if let Some(frame) = self.service()? {
            link.write_line(&frame.to_string())
                .map_err(|e| eyre::Report::new(map_hw_error(&*e, Seam::Link)))
                .wrap_err("status write")?;
        }

        match dispatch_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Snapshot of the values reported to the host.
    pub fn status_frame(&self) -> StatusFrame {
        StatusFrame {
            ticks: self.ticks.read(),
            speed: self.motion.speed,
            steer: self.motion.steer,
        }
    }

    /// Edge-context decoder writing into this controller's tick count.
    pub fn decoder(&self) -> QuadratureDecoder {
        QuadratureDecoder::new(self.ticks.clone())
    }

    pub fn tick_counter(&self) -> TickCounter {
        self.ticks.clone()
    }

    pub fn motion(&self) -> MotionState {
        self.motion
    }

    pub fn watchdog_status(&self) -> WatchdogStatus {
        self.watchdog.status()
    }

    pub fn watchdog_tripped(&self) -> bool {
        self.watchdog.is_tripped()
    }

    pub fn ticks(&self) -> i64 {
        self.ticks.read()
    }

    pub fn counters(&self) -> Counters {
        Counters {
            overflows: self.line.overflows(),
            ..self.counters
        }
    }

    pub fn motor_driver(&self) -> &M {
        self.motor.driver()
    }

    pub fn servo(&self) -> &S {
        self.steering.servo()
    }
}

