use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use rover_hardware::error::HwError;
use rover_hardware::util::{duty_fraction, servo_pulse_us, wait_until};
use rstest::rstest;

#[test]
fn wait_until_success_path() {
    let ready = Arc::new(AtomicBool::new(false));
    let ready_bg = ready.clone();
    // Flip after a short delay
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        ready_bg.store(true, Ordering::Relaxed);
    });

    let res = wait_until(
        || ready.load(Ordering::Relaxed),
        Duration::from_millis(500),
        Duration::from_micros(200),
    );
    assert!(res.is_ok(), "expected success, got {res:?}");
}

#[test]
fn wait_until_timeout_path() {
    let err = wait_until(
        || false,
        Duration::from_millis(5),
        Duration::from_micros(200),
    )
    .expect_err("expected timeout error");

    match err {
        HwError::Timeout => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[rstest]
#[case(0, 500)]
#[case(90, 1500)]
#[case(180, 2500)]
#[case(255, 2500)]
fn servo_pulse_is_linear_over_the_range(#[case] deg: u8, #[case] pulse: u32) {
    assert_eq!(servo_pulse_us(deg, 500, 2500), pulse);
}

#[rstest]
#[case(50, 100, 0.5)]
#[case(100, 60, 0.6)]
#[case(0, 60, 0.0)]
fn duty_fraction_respects_ceiling(#[case] duty: u8, #[case] ceiling: u8, #[case] expected: f64) {
    assert!((duty_fraction(duty, ceiling) - expected).abs() < 1e-9);
}
