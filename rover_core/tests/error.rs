use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rover_core::error::RoverError;
use rover_core::mocks::ScriptedLink;
use rover_core::{Direction, MotorCfg, TickCounter, TimingCfg, build_controller};
use rover_traits::clock::manual::ManualClock;
use rover_traits::{DriverError, DutyDriver, HostLink, ServoDriver};

/// Motor whose drive calls fail once `broken` is set; stops always succeed.
#[derive(Clone, Default)]
struct FlakyMotor {
    broken: Arc<AtomicBool>,
    stops: Arc<AtomicUsize>,
}
impl DutyDriver for FlakyMotor {
    fn set_forward(&mut self, _duty: u8) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.broken.load(Ordering::Relaxed) {
            return Err("pwm channel fault".into());
        }
        Ok(())
    }
    fn set_backward(&mut self, duty: u8) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.set_forward(duty)
    }
    fn stop(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.stops.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

struct NopServo;
impl ServoDriver for NopServo {
    fn set_angle(&mut self, _deg: u8) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

struct DeadLink;
impl HostLink for DeadLink {
    fn read_byte(&mut self) -> Result<Option<u8>, DriverError> {
        Err("port vanished".into())
    }
    fn write_line(&mut self, _line: &str) -> Result<(), DriverError> {
        Ok(())
    }
}

fn controller(motor: FlakyMotor) -> rover_core::Controller<FlakyMotor, NopServo> {
    let clock = ManualClock::new();
    let mut ctl = build_controller(
        motor,
        NopServo,
        TimingCfg::default(),
        MotorCfg::default(),
        TickCounter::new(),
        Some(Arc::new(clock)),
    )
    .unwrap();
    ctl.begin().unwrap();
    ctl
}

#[test]
fn actuator_errors_map_to_rover_error_hardware() {
    let motor = FlakyMotor::default();
    let mut ctl = controller(motor.clone());
    ctl.dispatch_line("C:30,90").unwrap();
    let stops_before = motor.stops.load(Ordering::Relaxed);

    motor.broken.store(true, Ordering::Relaxed);
    let err = ctl.dispatch_line("C:60,90").expect_err("expected hardware error");
    match err.downcast_ref::<RoverError>() {
        Some(RoverError::Hardware(msg)) => assert!(msg.contains("pwm channel fault")),
        other => panic!("unexpected error variant: {other:?}"),
    }

    // Failed apply leaves the motor stopped and the state consistent with it.
    assert_eq!(motor.stops.load(Ordering::Relaxed), stops_before + 1);
    assert_eq!(ctl.motion().speed, 0);
    assert_eq!(ctl.motion().direction, Direction::Stopped);
}

#[test]
fn link_errors_map_to_rover_error_link() {
    let mut ctl = controller(FlakyMotor::default());
    let err = ctl.poll(&mut DeadLink).expect_err("expected link error");
    assert!(matches!(
        err.downcast_ref::<RoverError>(),
        Some(RoverError::Link(_))
    ));
}

#[test]
fn runner_stops_the_motor_when_poll_fails() {
    let motor = FlakyMotor::default();
    let mut ctl = controller(motor.clone());
    let mut link = ScriptedLink::new();
    link.push(b"C:40,90\n");
    ctl.poll(&mut link).unwrap();
    let stops_before = motor.stops.load(Ordering::Relaxed);

    let err = rover_core::runner::run(
        &mut ctl,
        &mut DeadLink,
        &AtomicBool::new(false),
        &rover_core::runner::RunParams::default(),
    )
    .expect_err("dead link ends the run");
    assert!(err.downcast_ref::<RoverError>().is_some());
    assert_eq!(motor.stops.load(Ordering::Relaxed), stops_before + 1);
    assert_eq!(ctl.motion().speed, 0);
}

/// Fails the first read, then behaves like an idle link.
struct HiccupLink {
    failed: bool,
    lines: Vec<String>,
}
impl HostLink for HiccupLink {
    fn read_byte(&mut self) -> Result<Option<u8>, DriverError> {
        if !self.failed {
            self.failed = true;
            return Err("framing error".into());
        }
        Ok(None)
    }
    fn write_line(&mut self, line: &str) -> Result<(), DriverError> {
        self.lines.push(line.to_owned());
        Ok(())
    }
}

#[test]
fn runner_survives_a_transient_link_error() {
    let mut ctl = controller(FlakyMotor::default());
    let mut link = HiccupLink {
        failed: false,
        lines: Vec::new(),
    };
    let params = rover_core::runner::RunParams {
        max_runtime: Some(std::time::Duration::from_millis(60)),
        ..rover_core::runner::RunParams::default()
    };
    let summary =
        rover_core::runner::run(&mut ctl, &mut link, &AtomicBool::new(false), &params).unwrap();
    assert_eq!(summary.poll_errors, 1);
    assert_eq!(summary.iterations, 60);
    assert!(!link.lines.is_empty());
}
