use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

const PINS: &str = "[pins]\nmotor_pwm = 12\nmotor_dir = 13\nencoder_a = 5\nencoder_b = 6\nservo = 18\n";

fn rover() -> Command {
    let mut cmd = Command::cargo_bin("rover").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[rstest]
#[case("[timing]\nwatchdog_ms = 0\n", "watchdog_ms")]
#[case("[motor]\nduty_ceiling_pct = 0\n", "duty_ceiling_pct")]
#[case("[steering]\nmin_pulse_us = 2500\nmax_pulse_us = 500\n", "min_pulse_us")]
#[case("[logging]\nrotation = \"weekly\"\n", "rotation")]
fn invalid_config_exits_with_config_code(#[case] extra: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, format!("{PINS}\n{extra}")).unwrap();
    rover()
        .args(["--config", path.to_str().unwrap(), "self-check"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.toml");
    rover()
        .args(["--config", path.to_str().unwrap(), "self-check"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("read config"));
}

#[test]
fn missing_pins_section_is_a_config_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nopins.toml");
    fs::write(&path, "[timing]\nstatus_ms = 20\n").unwrap();
    rover()
        .args(["--config", path.to_str().unwrap(), "run", "--duration-ms", "10"])
        .assert()
        .code(3);
}

#[test]
fn json_mode_emits_a_structured_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, format!("{PINS}\n[timing]\nstatus_ms = 0\n")).unwrap();
    let out = rover()
        .args(["--json", "--config", path.to_str().unwrap(), "self-check"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));

    let stderr = String::from_utf8_lossy(&out.stderr);
    let line = stderr
        .lines()
        .rev()
        .find(|l| l.trim_start().starts_with('{'))
        .expect("json error line");
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "Config");
    assert_eq!(v["exit_code"], 3);
    assert!(v["error"].as_str().unwrap().contains("status_ms"));
    assert!(v["message"].as_str().unwrap().starts_with("What happened"));
}
