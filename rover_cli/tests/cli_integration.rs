use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use assert_cmd::Command;
use tempfile::tempdir;

// Minimal valid TOML config for the simulated backend
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[pins]
# pins are unused by the simulated backend but must be present
motor_pwm = 12
motor_dir = 13
encoder_a = 5
encoder_b = 6
servo = 18

[timing]
watchdog_ms = 200
status_ms = 20
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn rover() -> Command {
    let mut cmd = Command::cargo_bin("rover").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "self-check ok", "stdout")]
#[case(&["run", "--duration-ms", "abc"], 2, "invalid value", "stderr")]
#[case(&["fly"], 2, "unrecognized subcommand", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let out = rover().args(args).output().unwrap();
    assert_eq!(out.status.code(), Some(code), "args {args:?}");
    let text = if stream == "stdout" {
        String::from_utf8_lossy(&out.stdout).to_string()
    } else {
        String::from_utf8_lossy(&out.stderr).to_string()
    };
    assert!(text.contains(needle), "{stream} for {args:?}: {text}");
}

#[test]
fn self_check_with_config_file() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    rover()
        .args(["--config", cfg.to_str().unwrap(), "self-check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("self-check ok"));
}

#[test]
fn run_streams_status_frames_for_commands_on_stdin() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let out = rover()
        .args([
            "--config",
            cfg.to_str().unwrap(),
            "run",
            "--duration-ms",
            "400",
        ])
        .write_stdin("C:50,120\n")
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8_lossy(&out.stdout);
    let frames: Vec<&str> = stdout.lines().filter(|l| l.starts_with("S:")).collect();
    assert!(frames.len() >= 5, "expected a steady frame stream, got {frames:?}");
    assert!(
        frames.iter().any(|f| f.ends_with(",50,120")),
        "command never reflected in a frame: {frames:?}"
    );
    // Nothing but status frames on the host channel.
    assert!(stdout.lines().all(|l| l.starts_with("S:")), "{stdout}");
}

#[test]
fn silent_host_trips_the_watchdog_back_to_rest() {
    let out = rover()
        .args(["run", "--duration-ms", "600"])
        .write_stdin("C:80,30\n")
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    let last = stdout.lines().filter(|l| l.starts_with("S:")).last().unwrap();
    // Speed zeroed by the watchdog; steering left where it was.
    assert!(last.ends_with(",0,30"), "last frame {last}");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("watchdog"), "stderr: {stderr}");
}

#[test]
fn malformed_commands_go_to_diagnostics_not_the_host_link() {
    let out = rover()
        .args(["run", "--duration-ms", "200"])
        .write_stdin("C:abc\nX\n")
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.lines().all(|l| l.starts_with("S:")), "{stdout}");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("bad C cmd"), "stderr: {stderr}");
    assert!(stderr.contains("unknown cmd"), "stderr: {stderr}");
}

#[test]
fn stats_are_printed_on_request() {
    rover()
        .args(["run", "--duration-ms", "100", "--stats"])
        .write_stdin("")
        .assert()
        .success()
        .stderr(predicate::str::contains("--- Rover Stats ---"))
        .stderr(predicate::str::contains("Status frames:"));
}
