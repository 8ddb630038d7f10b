use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Servo refresh period (50 Hz).
pub const SERVO_PERIOD: Duration = Duration::from_millis(20);

/// Pulse width for `deg` (clamped to 0..=180), linear between `min_us` and `max_us`.
pub fn servo_pulse_us(deg: u8, min_us: u32, max_us: u32) -> u32 {
    let deg = u32::from(deg.min(180));
    let span = max_us.saturating_sub(min_us);
    min_us + (span * deg + 90) / 180
}

/// PWM duty fraction (0.0..=1.0) for a percentage, capped at `ceiling_pct`.
pub fn duty_fraction(duty_pct: u8, ceiling_pct: u8) -> f64 {
    f64::from(duty_pct.min(ceiling_pct).min(100)) / 100.0
}

/// Wait until `done` returns true, or a timeout expires.
/// Sleeps in small intervals to avoid CPU spinning.
pub fn wait_until(
    mut done: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while !done() {
        if Instant::now() >= deadline {
            return Err(HwError::Timeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}
