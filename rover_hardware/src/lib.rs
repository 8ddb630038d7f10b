//! Concrete drivers behind the `rover_traits` seam.
//!
//! The simulated drivers and the stdio host link are always built. The
//! Raspberry Pi drivers live in [`hardware`] behind the `hardware` feature.

pub mod error;
pub mod stdio;
pub mod util;

#[cfg(feature = "hardware")]
pub mod hardware;

pub use stdio::StdioLink;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use rover_traits::{DriverError, DutyDriver, EdgeSink, ServoDriver};

/// Simulated traction motor.
///
/// Publishes the signed duty it is driven at (`+duty` forward, `-duty`
/// backward, 0 stopped) so a simulated encoder can follow it.
pub struct SimulatedMotor {
    duty: Arc<AtomicI32>,
    ceiling: u8,
}

impl SimulatedMotor {
    pub fn new(ceiling: u8) -> Self {
        SimulatedMotor {
            duty: Arc::new(AtomicI32::new(0)),
            ceiling: ceiling.clamp(1, 100),
        }
    }

    /// Shared view of the signed duty, for [`spawn_simulated_encoder`].
    pub fn duty_handle(&self) -> Arc<AtomicI32> {
        self.duty.clone()
    }

    pub fn signed_duty(&self) -> i32 {
        self.duty.load(Ordering::Relaxed)
    }
}

impl Default for SimulatedMotor {
    fn default() -> Self {
        Self::new(100)
    }
}

impl DutyDriver for SimulatedMotor {
    fn set_forward(&mut self, duty_pct: u8) -> Result<(), DriverError> {
        let duty = duty_pct.min(self.ceiling);
        self.duty.store(i32::from(duty), Ordering::Relaxed);
        tracing::trace!(duty, "sim motor forward");
        Ok(())
    }

    fn set_backward(&mut self, duty_pct: u8) -> Result<(), DriverError> {
        let duty = duty_pct.min(self.ceiling);
        self.duty.store(-i32::from(duty), Ordering::Relaxed);
        tracing::trace!(duty, "sim motor backward");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        self.duty.store(0, Ordering::Relaxed);
        tracing::trace!("sim motor stop");
        Ok(())
    }

    fn duty_ceiling(&self) -> u8 {
        self.ceiling
    }
}

/// Simulated steering servo; remembers the last angle.
#[derive(Default)]
pub struct SimulatedServo {
    angle: Arc<AtomicU8>,
}

impl SimulatedServo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn angle(&self) -> u8 {
        self.angle.load(Ordering::Relaxed)
    }

    pub fn angle_handle(&self) -> Arc<AtomicU8> {
        self.angle.clone()
    }
}

impl ServoDriver for SimulatedServo {
    fn set_angle(&mut self, deg: u8) -> Result<(), DriverError> {
        self.angle.store(deg.min(180), Ordering::Relaxed);
        tracing::trace!(deg, "sim servo angle");
        Ok(())
    }
}

/// Quadrature levels in forward order; walking the table backwards reverses.
const QUADRATURE: [(bool, bool); 4] = [(false, false), (false, true), (true, true), (true, false)];

/// Background thread turning a simulated motor's duty into quadrature edges.
///
/// The thread is the edge context for the simulation: it is the only caller of
/// the sink. It is shut down and joined on drop.
pub struct SimEncoder {
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

/// Spawn a simulated encoder producing `steps_per_sec_at_full` edges per
/// second at 100 % duty, scaled linearly and signed by direction.
pub fn spawn_simulated_encoder<E: EdgeSink + Send + 'static>(
    duty: Arc<AtomicI32>,
    mut sink: E,
    steps_per_sec_at_full: u32,
) -> SimEncoder {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    let tick = Duration::from_millis(1);

    let join_handle = std::thread::spawn(move || {
        let mut index = 0usize;
        // Edge budget in millionths of a step, so slow speeds still move.
        let mut budget: i64 = 0;
        while !shutdown_clone.load(Ordering::Relaxed) {
            let d = i64::from(duty.load(Ordering::Relaxed));
            budget += d * i64::from(steps_per_sec_at_full) * 10;
            while budget >= 1_000_000 {
                index = (index + 1) % QUADRATURE.len();
                let (a, b) = QUADRATURE[index];
                sink.on_edge(a, b);
                budget -= 1_000_000;
            }
            while budget <= -1_000_000 {
                index = (index + QUADRATURE.len() - 1) % QUADRATURE.len();
                let (a, b) = QUADRATURE[index];
                sink.on_edge(a, b);
                budget += 1_000_000;
            }
            if d == 0 {
                budget = 0;
            }
            std::thread::sleep(tick);
        }
        tracing::trace!("sim encoder thread exiting cleanly");
    });

    SimEncoder {
        shutdown,
        join_handle: Some(join_handle),
    }
}

impl Drop for SimEncoder {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take()
            && let Err(e) = handle.join()
        {
            tracing::warn!(?e, "sim encoder thread panicked during shutdown");
        }
    }
}
