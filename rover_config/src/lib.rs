#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the rover controller.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Every section except `[pins]` falls back to the reference values.
use serde::Deserialize;

/// Host transport.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Link {
    /// Serial device used by the `hardware` backend.
    pub port: String,
    pub baud: u32,
}

impl Default for Link {
    fn default() -> Self {
        Self {
            port: "/dev/serial0".to_owned(),
            baud: 115_200,
        }
    }
}

/// BCM pin numbers, only consulted by the `hardware` backend.
#[derive(Debug, Deserialize, Clone)]
pub struct Pins {
    pub motor_pwm: u8,
    pub motor_dir: u8,
    pub encoder_a: u8,
    pub encoder_b: u8,
    pub servo: u8,
}

/// Reference wiring, used when the CLI runs without a config file.
impl Default for Pins {
    fn default() -> Self {
        Self {
            motor_pwm: 12,
            motor_dir: 13,
            encoder_a: 5,
            encoder_b: 6,
            servo: 18,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Motor {
    /// Highest duty (percent) the supply tolerates; 1..=100.
    pub duty_ceiling_pct: u8,
    pub pwm_hz: u32,
    /// Back-EMF settle delay between a stop and the opposite direction.
    pub settle_ms: u64,
}

impl Default for Motor {
    fn default() -> Self {
        Self {
            duty_ceiling_pct: 100,
            pwm_hz: 1_000,
            settle_ms: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Steering {
    /// Pulse width at 0 degrees.
    pub min_pulse_us: u32,
    /// Pulse width at 180 degrees.
    pub max_pulse_us: u32,
}

impl Default for Steering {
    fn default() -> Self {
        Self {
            min_pulse_us: 500,
            max_pulse_us: 2_500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Timing {
    pub watchdog_ms: u64,
    pub status_ms: u64,
    pub loop_us: u64,
    /// Line buffer capacity including the terminator slot.
    pub line_capacity: usize,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            watchdog_ms: 200,
            status_ms: 20,
            loop_us: 1_000,
            line_capacity: 64,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub link: Link,
    pub pins: Pins,
    #[serde(default)]
    pub motor: Motor,
    #[serde(default)]
    pub steering: Steering,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

const ROTATIONS: [&str; 3] = ["never", "daily", "hourly"];

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Timing
        if self.timing.watchdog_ms == 0 {
            eyre::bail!("timing.watchdog_ms must be >= 1");
        }
        if self.timing.status_ms == 0 {
            eyre::bail!("timing.status_ms must be >= 1");
        }
        if self.timing.loop_us == 0 {
            eyre::bail!("timing.loop_us must be >= 1");
        }
        if self.timing.line_capacity < 4 {
            eyre::bail!("timing.line_capacity must be >= 4");
        }

        // Motor
        if !(1..=100).contains(&self.motor.duty_ceiling_pct) {
            eyre::bail!("motor.duty_ceiling_pct must be in [1, 100]");
        }
        if self.motor.settle_ms == 0 {
            eyre::bail!("motor.settle_ms must be >= 1");
        }
        if self.motor.pwm_hz == 0 {
            eyre::bail!("motor.pwm_hz must be > 0");
        }

        // Steering
        if self.steering.min_pulse_us >= self.steering.max_pulse_us {
            eyre::bail!("steering.min_pulse_us must be < steering.max_pulse_us");
        }

        // Link
        if self.link.baud == 0 {
            eyre::bail!("link.baud must be > 0");
        }

        // Pins: each signal needs its own GPIO
        let pins = [
            ("motor_pwm", self.pins.motor_pwm),
            ("motor_dir", self.pins.motor_dir),
            ("encoder_a", self.pins.encoder_a),
            ("encoder_b", self.pins.encoder_b),
            ("servo", self.pins.servo),
        ];
        for (i, (name, pin)) in pins.iter().enumerate() {
            if let Some((other, _)) = pins[i + 1..].iter().find(|(_, p)| p == pin) {
                eyre::bail!("pins.{name} and pins.{other} both use GPIO {pin}");
            }
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !ROTATIONS.contains(&rotation.to_ascii_lowercase().as_str())
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rotation:?}");
        }

        Ok(())
    }
}
