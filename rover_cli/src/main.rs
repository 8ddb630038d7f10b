//! `rover`: host-commanded motion controller.

mod cli;
mod error_fmt;
mod rt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use rover_config::Config;
use rover_core::RoverError;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::RunOptions;

fn main() {
    // clap exits with code 2 on usage errors.
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("Warning: color-eyre install failed: {e}");
    }

    if let Err(err) = real_main(cli) {
        tracing::error!(error = %format!("{err:#}"), "rover exiting with error");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging)?;

    match cli.cmd {
        Commands::Run {
            port,
            duration_ms,
            stats,
            rt,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                .wrap_err("install Ctrl-C handler")?;

            let opts = RunOptions {
                port,
                duration_ms,
                stats,
                rt,
            };
            let summary = run::run_controller(&cfg, &opts, shutdown)?;
            tracing::info!(
                iterations = summary.iterations,
                applied = summary.counters.applied,
                rejected = summary.counters.rejected,
                "run finished"
            );
            Ok(())
        }
        Commands::SelfCheck => run::self_check(&cfg),
    }
}

/// Load and validate the config, or fall back to the reference wiring.
fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    rover_config::load_file(path).map_err(|e| eyre::Report::new(RoverError::Config(format!("{e:#}"))))
}

fn init_tracing(json: bool, level: &str, logging: &rover_config::Logging) -> eyre::Result<()> {
    use std::io::IsTerminal;
    use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

    // RUST_LOG wins over --log-level.
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let ansi = std::io::stderr().is_terminal();
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if json {
        layers.push(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_ansi(ansi)
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    }

    if let Some(file) = logging.file.as_deref() {
        use tracing_appender::rolling;

        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file {file:?} has no file name"))?;
        let appender = match logging
            .rotation
            .as_deref()
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("daily") => rolling::daily(dir, name),
            Some("hourly") => rolling::hourly(dir, name),
            _ => rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);

        let file_level = logging.level.as_deref().unwrap_or("info");
        let file_filter = EnvFilter::try_new(file_level)
            .wrap_err_with(|| format!("invalid logging.level {file_level:?}"))?;
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_filter)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
