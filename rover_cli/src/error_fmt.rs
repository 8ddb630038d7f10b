//! Human-readable error descriptions, exit codes and structured JSON errors.

use rover_core::error::{BuildError, RoverError};

/// Exit code for configuration problems (bad file, invalid values).
pub const EXIT_CONFIG: i32 = 3;
/// Exit code for hardware or host link failures.
pub const EXIT_HARDWARE: i32 = 4;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingMotor => {
                "What happened: No motor driver was provided to the controller.\nLikely causes: The motor failed to initialize or was not wired into the builder.\nHow to fix: Ensure the motor is created successfully and passed via with_motor(...).".to_string()
            }
            BuildError::MissingServo => {
                "What happened: No steering servo was provided to the controller.\nLikely causes: The servo failed to initialize or was not wired into the builder.\nHow to fix: Ensure the servo is created successfully and passed via with_servo(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the [timing] section of the config file, then rerun."
            ),
        };
    }

    if let Some(re) = err.downcast_ref::<RoverError>() {
        return match re {
            RoverError::Config(msg) => format!(
                "What happened: Configuration could not be loaded ({msg}).\nLikely causes: Wrong --config path, TOML syntax error, or out-of-range values.\nHow to fix: Fix the file (see etc/rover_config.toml for a reference) and rerun."
            ),
            RoverError::Hardware(msg) | RoverError::HardwareFault(msg) => format!(
                "What happened: A motor, servo or encoder pin failed ({msg}).\nLikely causes: Incorrect [pins] numbers, missing GPIO permissions, or a wiring/power problem.\nHow to fix: Check the [pins] section and wiring; ensure the process may access /dev/gpiomem."
            ),
            RoverError::Link(msg) => format!(
                "What happened: The host link failed ({msg}).\nLikely causes: Wrong serial port, port busy, or the host closed the connection.\nHow to fix: Check [link].port or --port and that no other process holds the port."
            ),
            RoverError::State(msg) => format!(
                "What happened: Controller reached an invalid state ({msg}).\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 configuration, 4 hardware/link, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(BuildError::InvalidConfig(_)) = err.downcast_ref::<BuildError>() {
        return EXIT_CONFIG;
    }
    match err.downcast_ref::<RoverError>() {
        Some(RoverError::Config(_)) => EXIT_CONFIG,
        Some(RoverError::Hardware(_) | RoverError::HardwareFault(_) | RoverError::Link(_)) => {
            EXIT_HARDWARE
        }
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingMotor => "MissingMotor",
            BuildError::MissingServo => "MissingServo",
            BuildError::InvalidConfig(_) => "InvalidConfig",
        };
    }
    match err.downcast_ref::<RoverError>() {
        Some(RoverError::Config(_)) => "Config",
        Some(RoverError::Hardware(_)) => "Hardware",
        Some(RoverError::HardwareFault(_)) => "HardwareFault",
        Some(RoverError::Link(_)) => "Link",
        Some(RoverError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
        "error": format!("{err:#}"),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn wrapped_errors_keep_their_exit_code() {
        let err: eyre::Result<()> = Err(eyre::Report::new(RoverError::Link("port busy".into())));
        let err = err.wrap_err("open host link /dev/serial0").unwrap_err();
        assert_eq!(exit_code_for_error(&err), EXIT_HARDWARE);
        assert!(humanize(&err).contains("host link failed"));
    }

    #[test]
    fn build_config_errors_map_to_config_exit() {
        let err = eyre::Report::new(BuildError::InvalidConfig("status_ms must be > 0"));
        assert_eq!(exit_code_for_error(&err), EXIT_CONFIG);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "InvalidConfig");
        assert_eq!(v["exit_code"], 3);
    }

    #[test]
    fn untyped_errors_are_generic() {
        let err = eyre::eyre!("something odd");
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).contains("something odd"));
    }
}
