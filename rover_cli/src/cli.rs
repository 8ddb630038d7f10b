//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "rover", version, about = "Rover motion controller")]
pub struct Cli {
    /// Path to config TOML; the reference wiring is used when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

impl RtLock {
    #[inline]
    pub fn os_default() -> Self {
        if cfg!(target_os = "linux") {
            RtLock::Current
        } else {
            RtLock::None
        }
    }
}

/// Real-time knobs shared by the commands that run the control loop.
#[derive(clap::Args, Debug, Clone, Copy, Default)]
pub struct RtArgs {
    /// Enable real-time mode (SCHED_FIFO, affinity, mlockall)
    #[arg(
        long,
        action = ArgAction::SetTrue,
        long_help = "Enable real-time mode on Linux.\n\nAttempts SCHED_FIFO priority, pins the process to one CPU, and calls mlockall to keep the address space resident. This reduces page faults and jitter in the control loop but may require elevated privileges or ulimits (e.g., memlock). Each step is best-effort and logs a warning when it fails."
    )]
    pub rt: bool,
    /// Real-time priority for SCHED_FIFO (1..=max)
    #[arg(
        long,
        value_name = "PRIO",
        long_help = "SCHED_FIFO priority when --rt is enabled. Range is platform-defined (usually 1..=99); values are clamped into it. Defaults to the maximum."
    )]
    pub rt_prio: Option<i32>,
    /// Select memory locking mode for --rt: none, current, or all
    #[arg(
        long,
        value_enum,
        value_name = "MODE",
        long_help = "Select memory locking mode when --rt is enabled.\n- none: do not lock memory.\n- current: lock currently resident pages (mlockall(MCL_CURRENT)).\n- all: lock current and future pages (mlockall(MCL_CURRENT|MCL_FUTURE)).\nDefault: current on Linux, none elsewhere."
    )]
    pub rt_lock: Option<RtLock>,
    /// CPU index to pin the process to. Defaults to 0.
    #[arg(
        long,
        value_name = "CPU",
        long_help = "Select the CPU index to pin the process to when --rt is enabled. Defaults to 0. The value must be allowed by the current affinity mask; otherwise affinity is left unchanged and a warning is logged."
    )]
    pub rt_cpu: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the motion controller until Ctrl-C (or --duration-ms)
    Run {
        /// Serial device for the host link (hardware builds; overrides [link].port)
        #[arg(long, value_name = "PATH")]
        port: Option<String>,
        /// Stop after this many milliseconds
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
        /// Print control loop latency and counters on exit
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
        #[command(flatten)]
        rt: RtArgs,
    },
    /// Build the controller, run the startup sequence once and stop
    SelfCheck,
}
