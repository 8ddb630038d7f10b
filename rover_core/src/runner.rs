//! Cooperative main loop around [`Controller::poll`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rover_traits::{DutyDriver, HostLink, ServoDriver};

use crate::controller::Controller;
use crate::error::Result;
use crate::state::Counters;

/// Latency samples kept per run; later iterations are counted but not stored.
pub const MAX_LATENCY_SAMPLES: usize = 100_000;

#[derive(Debug, Clone)]
pub struct RunParams {
    /// Sleep between iterations.
    pub loop_period: Duration,
    /// Stop after this long; `None` runs until shutdown.
    pub max_runtime: Option<Duration>,
    /// Record per-iteration latency for `--stats`.
    pub collect_latency: bool,
    /// Give up after this many consecutive failed iterations.
    pub max_consecutive_errors: u32,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            loop_period: Duration::from_millis(1),
            max_runtime: None,
            collect_latency: false,
            max_consecutive_errors: 50,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub counters: Counters,
    pub iterations: u64,
    /// Time spent inside `poll`, in microseconds.
    pub latencies_us: Vec<u64>,
    /// Iterations whose `poll` took longer than the loop period.
    pub missed_deadlines: u64,
    /// Iterations that returned an error and were skipped.
    pub poll_errors: u64,
}

/// Run until `shutdown` is set or `max_runtime` elapses.
///
/// A failed iteration is logged and the loop carries on; only a run of
/// `max_consecutive_errors` failures in a row ends it with that error. The
/// motor is emergency-stopped on every exit path.
pub fn run<M, S, L>(
    controller: &mut Controller<M, S>,
    link: &mut L,
    shutdown: &AtomicBool,
    params: &RunParams,
) -> Result<RunSummary>
where
    M: DutyDriver,
    S: ServoDriver,
    L: HostLink + ?Sized,
{
    let clock = controller.clock.clone();
    let start = clock.now();
    let period_us = u64::try_from(params.loop_period.as_micros()).unwrap_or(u64::MAX);
    let mut summary = RunSummary::default();
    let mut consecutive_errors = 0u32;
    tracing::info!(
        loop_us = period_us,
        max_runtime_ms = params.max_runtime.map(|d| d.as_millis() as u64),
        "control loop start"
    );

    let outcome = loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break Ok(());
        }
        if params
            .max_runtime
            .is_some_and(|max| clock.elapsed_since(start) >= max)
        {
            tracing::info!("run time limit reached");
            break Ok(());
        }

        let t_start = clock.now();
        match controller.poll(link) {
            Ok(()) => consecutive_errors = 0,
            Err(e) => {
                summary.poll_errors += 1;
                consecutive_errors += 1;
                if consecutive_errors >= params.max_consecutive_errors.max(1) {
                    tracing::error!(error = %e, consecutive_errors, "giving up on control loop");
                    break Err(e);
                }
                tracing::warn!(error = %e, "control loop iteration failed");
            }
        }
        summary.iterations += 1;

        if params.collect_latency {
            let latency = u64::try_from(clock.elapsed_since(t_start).as_micros()).unwrap_or(u64::MAX);
            if summary.latencies_us.len() < MAX_LATENCY_SAMPLES {
                summary.latencies_us.push(latency);
            }
            if latency > period_us {
                summary.missed_deadlines += 1;
            }
        }

        clock.sleep(params.loop_period);
    };

    if let Err(e) = controller.emergency_stop() {
        tracing::warn!(error = %e, "emergency stop failed on loop exit");
    }
    summary.counters = controller.counters();
    outcome?;
    tracing::info!(
        iterations = summary.iterations,
        frames = summary.counters.frames,
        watchdog_trips = summary.counters.watchdog_trips,
        "control loop stopped"
    );
    Ok(summary)
}
