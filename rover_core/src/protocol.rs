//! Line-oriented host protocol.
//!
//! Host → device, one command per line, terminated by `\n` or `\r`:
//!
//! | Line | Meaning |
//! |---|---|
//! | `C:<speed>,<steer>` | drive; speed clamped to -100..=100, steer to 0..=180 |
//! | `E` | emergency stop |
//! | `R` | reset encoder ticks |
//!
//! Device → host, periodic: `S:<ticks>,<speed>,<steer>`.

use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

use crate::config::{SPEED_LIMIT, STEERING_MAX_DEG, STEERING_MIN_DEG};
use crate::error::CommandError;

/// Default line buffer capacity, terminator slot included.
pub const LINE_CAPACITY: usize = 64;

/// A complete, terminator-free line handed out by [`LineBuffer::feed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine(String);

impl CommandLine {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn parse(&self) -> Result<Command, CommandError> {
        self.0.parse()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed-capacity accumulator for incoming bytes.
///
/// A line holds at most `capacity - 1` bytes. When one more non-terminator byte
/// arrives, the whole pending line (and that byte) is dropped and accumulation
/// restarts from empty; no attempt is made to salvage a partial command.
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    capacity: usize,
    overflows: u64,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_capacity(LINE_CAPACITY)
    }
}

impl LineBuffer {
    /// `capacity` counts the terminator slot; values below 2 are raised to 2.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
            overflows: 0,
        }
    }

    /// Feed one byte; returns a line when a terminator completes a non-empty one.
    pub fn feed(&mut self, byte: u8) -> Option<CommandLine> {
        if byte == b'\n' || byte == b'\r' {
            if self.buf.is_empty() {
                return None;
            }
            let line = String::from_utf8_lossy(&self.buf).into_owned();
            self.buf.clear();
            return Some(CommandLine(line));
        }

        if self.buf.len() < self.capacity - 1 {
            self.buf.push(byte);
        } else {
            tracing::trace!(dropped = self.buf.len(), "line buffer overflow, discarding");
            self.buf.clear();
            self.overflows = self.overflows.saturating_add(1);
        }
        None
    }

    /// Bytes accumulated towards the current line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Lines discarded because they outgrew the buffer.
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A recognized host command. Drive values are already clamped into range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Drive { speed: i32, steer: i32 },
    EmergencyStop,
    ResetEncoder,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match line {
            "E" => Ok(Command::EmergencyStop),
            "R" => Ok(Command::ResetEncoder),
            _ => match line.strip_prefix("C:") {
                Some(args) => {
                    parse_drive(args).ok_or_else(|| CommandError::BadDrive(line.to_owned()))
                }
                None => Err(CommandError::Unknown(line.to_owned())),
            },
        }
    }
}

fn parse_drive(args: &str) -> Option<Command> {
    let (speed, steer) = args.split_once(',')?;
    let speed = parse_field(speed)?;
    let steer = parse_field(steer)?;
    Some(Command::Drive {
        speed: clamp_speed(speed),
        steer: clamp_steer(steer),
    })
}

/// Integers too large for `i64` saturate to the matching bound, so the
/// clamp still applies to them.
fn parse_field(field: &str) -> Option<i64> {
    match field.trim().parse::<i64>() {
        Ok(v) => Some(v),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

/// Clamp a requested speed into -100..=100.
pub fn clamp_speed(speed: i64) -> i32 {
    let limit = i64::from(SPEED_LIMIT);
    // In range after the clamp, so the narrowing cannot fail.
    i32::try_from(speed.clamp(-limit, limit)).unwrap_or(0)
}

/// Clamp a requested steering angle into 0..=180.
pub fn clamp_steer(steer: i64) -> i32 {
    let clamped = steer.clamp(i64::from(STEERING_MIN_DEG), i64::from(STEERING_MAX_DEG));
    i32::try_from(clamped).unwrap_or(STEERING_MIN_DEG)
}

/// One periodic status record, built fresh for each emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFrame {
    pub ticks: i64,
    pub speed: i32,
    pub steer: i32,
}

impl fmt::Display for StatusFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S:{},{},{}", self.ticks, self.speed, self.steer)
    }
}
