use rover_config::{load_file, load_toml};
use rstest::rstest;

const PINS: &str = r#"
[pins]
motor_pwm = 12
motor_dir = 13
encoder_a = 5
encoder_b = 6
servo = 18
"#;

fn with_pins(extra: &str) -> String {
    format!("{PINS}\n{extra}")
}

#[test]
fn pins_only_config_gets_reference_defaults() {
    let cfg = load_toml(PINS).expect("parse TOML");
    cfg.validate().expect("defaults are valid");
    assert_eq!(cfg.link.port, "/dev/serial0");
    assert_eq!(cfg.link.baud, 115_200);
    assert_eq!(cfg.motor.duty_ceiling_pct, 100);
    assert_eq!(cfg.motor.settle_ms, 30);
    assert_eq!(cfg.steering.min_pulse_us, 500);
    assert_eq!(cfg.steering.max_pulse_us, 2_500);
    assert_eq!(cfg.timing.watchdog_ms, 200);
    assert_eq!(cfg.timing.status_ms, 20);
    assert_eq!(cfg.timing.line_capacity, 64);
    assert!(cfg.logging.file.is_none());
}

#[test]
fn missing_pins_section_is_a_parse_error() {
    let err = load_toml("[timing]\nwatchdog_ms = 200\n").expect_err("pins are required");
    assert!(format!("{err}").contains("pins"));
}

#[test]
fn full_config_round_trips_values() {
    let toml = with_pins(
        r#"
[link]
port = "/dev/ttyAMA0"
baud = 57600

[motor]
duty_ceiling_pct = 60
pwm_hz = 2000
settle_ms = 40

[steering]
min_pulse_us = 1000
max_pulse_us = 2000

[timing]
watchdog_ms = 300
status_ms = 50
loop_us = 500
line_capacity = 32

[logging]
file = "rover.log"
level = "debug"
rotation = "daily"
"#,
    );
    let cfg = load_toml(&toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.link.port, "/dev/ttyAMA0");
    assert_eq!(cfg.motor.duty_ceiling_pct, 60);
    assert_eq!(cfg.timing.line_capacity, 32);
    assert_eq!(cfg.logging.rotation.as_deref(), Some("daily"));
}

#[rstest]
#[case("[timing]\nwatchdog_ms = 0", "timing.watchdog_ms")]
#[case("[timing]\nstatus_ms = 0", "timing.status_ms")]
#[case("[timing]\nloop_us = 0", "timing.loop_us")]
#[case("[timing]\nline_capacity = 3", "timing.line_capacity")]
#[case("[motor]\nduty_ceiling_pct = 0", "motor.duty_ceiling_pct")]
#[case("[motor]\nduty_ceiling_pct = 101", "motor.duty_ceiling_pct")]
#[case("[motor]\npwm_hz = 0", "motor.pwm_hz")]
#[case("[motor]\nsettle_ms = 0", "motor.settle_ms")]
#[case("[steering]\nmin_pulse_us = 2500\nmax_pulse_us = 500", "steering.min_pulse_us")]
#[case("[steering]\nmin_pulse_us = 1500\nmax_pulse_us = 1500", "steering.min_pulse_us")]
#[case("[link]\nbaud = 0", "link.baud")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation")]
fn rejects_invalid_values(#[case] extra: &str, #[case] needle: &str) {
    let cfg = load_toml(&with_pins(extra)).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(format!("{err}").contains(needle), "{err}");
}

#[test]
fn rejects_duplicate_pins() {
    let toml = r#"
[pins]
motor_pwm = 12
motor_dir = 13
encoder_a = 5
encoder_b = 5
servo = 18
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("duplicate GPIO");
    let msg = format!("{err}");
    assert!(msg.contains("encoder_a") && msg.contains("encoder_b"), "{msg}");
}

#[test]
fn rotation_is_case_insensitive() {
    let cfg = load_toml(&with_pins("[logging]\nrotation = \"Hourly\"")).expect("parse TOML");
    cfg.validate().expect("Hourly is accepted");
}

#[test]
fn load_file_reads_parses_and_validates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let good = dir.path().join("good.toml");
    std::fs::write(&good, PINS).expect("write");
    assert_eq!(load_file(&good).expect("load").pins.servo, 18);

    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, with_pins("[timing]\nstatus_ms = 0")).expect("write");
    assert!(format!("{}", load_file(&bad).expect_err("invalid")).contains("status_ms"));

    let missing = dir.path().join("missing.toml");
    assert!(format!("{}", load_file(&missing).expect_err("missing")).contains("read config"));
}

#[test]
fn built_in_default_is_valid_reference_wiring() {
    let cfg = rover_config::Config::default();
    cfg.validate().expect("default config validates");
    assert_eq!(cfg.pins.motor_pwm, 12);
    assert_eq!(cfg.timing.watchdog_ms, 200);
}
