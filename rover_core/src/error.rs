use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoverError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("host link error: {0}")]
    Link(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

/// Why a received line was not executed. Reported on the diagnostic channel only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("bad C cmd: {0}")]
    BadDrive(String),
    #[error("unknown cmd: {0}")]
    Unknown(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing motor driver")]
    MissingMotor,
    #[error("missing steering servo")]
    MissingServo,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
