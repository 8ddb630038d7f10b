//! Driver assembly and the `run` / `self-check` commands.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use eyre::WrapErr;
use rover_config::Config;
use rover_core::runner::{self, RunParams, RunSummary};
use rover_core::{ControllerBuilder, DynController};
use rover_traits::HostLink;

use crate::cli::RtArgs;
use crate::rt::setup_rt_once;

/// Options of the `run` command.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub port: Option<String>,
    pub duration_ms: Option<u64>,
    pub stats: bool,
    pub rt: RtArgs,
}

#[cfg(not(feature = "hardware"))]
type EdgeThread = rover_hardware::SimEncoder;
#[cfg(feature = "hardware")]
type EdgeThread = rover_hardware::hardware::EncoderIrq;

/// A built controller plus the edge thread feeding its tick counter.
///
/// The edge thread is stopped and joined when the rig is dropped.
pub struct Rig {
    pub controller: DynController,
    _edges: EdgeThread,
}

/// Encoder edges per second the simulation produces at full duty.
#[cfg(not(feature = "hardware"))]
const SIM_STEPS_PER_SEC: u32 = 2_000;

#[cfg(not(feature = "hardware"))]
pub fn assemble(cfg: &Config) -> eyre::Result<Rig> {
    use rover_hardware::{SimulatedMotor, SimulatedServo, spawn_simulated_encoder};

    let motor = SimulatedMotor::new(cfg.motor.duty_ceiling_pct);
    let duty = motor.duty_handle();
    let controller = ControllerBuilder::new()
        .apply_config(cfg)
        .with_motor(motor)
        .with_servo(SimulatedServo::new())
        .build()
        .wrap_err("build controller")?;
    let edges = spawn_simulated_encoder(duty, controller.decoder(), SIM_STEPS_PER_SEC);
    tracing::info!(backend = "simulated", "drivers ready");
    Ok(Rig {
        controller,
        _edges: edges,
    })
}

#[cfg(feature = "hardware")]
fn hardware_err(e: rover_hardware::error::HwError) -> eyre::Report {
    use rover_core::hw_error::{Seam, map_hw_error};
    eyre::Report::new(map_hw_error(&e, Seam::Actuator))
}

#[cfg(feature = "hardware")]
pub fn assemble(cfg: &Config) -> eyre::Result<Rig> {
    use rover_core::{QuadratureDecoder, TickCounter};
    use rover_hardware::hardware::{PwmMotor, PwmServo, spawn_encoder_irq};

    let pins = &cfg.pins;
    let motor = PwmMotor::new(
        pins.motor_pwm,
        pins.motor_dir,
        cfg.motor.pwm_hz,
        cfg.motor.duty_ceiling_pct,
    )
    .map_err(hardware_err)
    .wrap_err("open motor pins")?;
    let servo = PwmServo::new(
        pins.servo,
        cfg.steering.min_pulse_us,
        cfg.steering.max_pulse_us,
    )
    .map_err(hardware_err)
    .wrap_err("open servo pin")?;

    let ticks = TickCounter::new();
    let irq_ticks = ticks.clone();
    let edges = spawn_encoder_irq(pins.encoder_a, pins.encoder_b, move |a, b| {
        QuadratureDecoder::with_levels(irq_ticks, a, b)
    })
    .map_err(hardware_err)
    .wrap_err("arm encoder interrupts")?;

    let controller = ControllerBuilder::new()
        .apply_config(cfg)
        .with_ticks(ticks)
        .with_motor(motor)
        .with_servo(servo)
        .build()
        .wrap_err("build controller")?;
    tracing::info!(backend = "rppal", "drivers ready");
    Ok(Rig {
        controller,
        _edges: edges,
    })
}

#[cfg(not(feature = "hardware"))]
fn open_link(_cfg: &Config, port: Option<&str>) -> eyre::Result<Box<dyn HostLink>> {
    if let Some(port) = port {
        tracing::warn!(port, "--port ignored by the simulated backend; using stdin/stdout");
    }
    Ok(Box::new(rover_hardware::StdioLink::spawn()))
}

#[cfg(feature = "hardware")]
fn open_link(cfg: &Config, port: Option<&str>) -> eyre::Result<Box<dyn HostLink>> {
    let port = port.unwrap_or(&cfg.link.port);
    let link = rover_hardware::hardware::UartLink::open(port, cfg.link.baud)
        .map_err(|e| {
            use rover_core::hw_error::{Seam, map_hw_error};
            eyre::Report::new(map_hw_error(&e, Seam::Link))
        })
        .wrap_err_with(|| format!("open host link {port}"))?;
    Ok(Box::new(link))
}

/// `rover run`: start up, then loop until Ctrl-C or the duration limit.
pub fn run_controller(
    cfg: &Config,
    opts: &RunOptions,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<RunSummary> {
    setup_rt_once(&opts.rt);

    let mut rig = assemble(cfg)?;
    let mut link = open_link(cfg, opts.port.as_deref())?;
    rig.controller.begin().wrap_err("startup sequence")?;

    let params = RunParams {
        loop_period: Duration::from_micros(cfg.timing.loop_us),
        max_runtime: opts.duration_ms.map(Duration::from_millis),
        collect_latency: opts.stats,
        ..RunParams::default()
    };
    let summary = runner::run(&mut rig.controller, link.as_mut(), &shutdown, &params)?;
    if opts.stats {
        print_stats(&summary, params.loop_period);
    }
    Ok(summary)
}

/// `rover self-check`: build against the configured backend, run the startup
/// sequence once and stop again.
pub fn self_check(cfg: &Config) -> eyre::Result<()> {
    let mut rig = assemble(cfg)?;
    rig.controller.begin().wrap_err("startup sequence")?;
    rig.controller
        .emergency_stop()
        .wrap_err("emergency stop")?;
    println!("self-check ok");
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn print_stats(summary: &RunSummary, period: Duration) {
    let latencies = &summary.latencies_us;
    let min = latencies.iter().min().copied().unwrap_or(0);
    let max = latencies.iter().max().copied().unwrap_or(0);
    let avg = if latencies.is_empty() {
        0.0
    } else {
        latencies.iter().sum::<u64>() as f64 / latencies.len() as f64
    };
    let stdev = if latencies.len() > 1 {
        let var = latencies
            .iter()
            .map(|&x| (x as f64 - avg).powi(2))
            .sum::<f64>()
            / (latencies.len() as f64 - 1.0);
        var.sqrt()
    } else {
        0.0
    };
    let c = &summary.counters;
    eprintln!("\n--- Rover Stats ---");
    eprintln!("Iterations: {}", summary.iterations);
    eprintln!("Period (us): {}", period.as_micros());
    eprintln!("Latency min/avg/max/stdev (us): {min} / {avg:.1} / {max} / {stdev:.1}");
    eprintln!("Missed deadlines (> period): {}", summary.missed_deadlines);
    eprintln!("Loop errors: {}", summary.poll_errors);
    eprintln!(
        "Commands applied/rejected: {} / {}",
        c.applied, c.rejected
    );
    eprintln!("Overflowed lines: {}", c.overflows);
    eprintln!("Watchdog trips: {}", c.watchdog_trips);
    eprintln!("Status frames: {}", c.frames);
    eprintln!("-------------------\n");
}
