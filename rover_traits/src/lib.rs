//! Capability traits at the hardware seam of the rover controller.
//!
//! The control core only ever talks to these traits, so every state machine in
//! `rover_core` runs unchanged against the simulated drivers, the Raspberry Pi
//! drivers, or a recording fake in a test.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Boxed error used across the trait seam.
pub type DriverError = Box<dyn std::error::Error + Send + Sync>;

/// PWM duty driver for the traction motor (H-bridge style: duty + direction).
pub trait DutyDriver {
    /// Drive forward at `duty_pct` percent (0..=duty_ceiling).
    fn set_forward(&mut self, duty_pct: u8) -> Result<(), DriverError>;
    /// Drive backward at `duty_pct` percent (0..=duty_ceiling).
    fn set_backward(&mut self, duty_pct: u8) -> Result<(), DriverError>;
    /// Remove drive from both outputs.
    fn stop(&mut self) -> Result<(), DriverError>;
    /// Highest duty percentage the driver passes through unmodified.
    fn duty_ceiling(&self) -> u8 {
        100
    }
}

/// Hobby servo that takes an angle in degrees.
pub trait ServoDriver {
    fn set_angle(&mut self, deg: u8) -> Result<(), DriverError>;
}

/// Byte-level transport to the host computer.
pub trait HostLink {
    /// Next pending byte, or `None` when nothing is available right now. Must not block.
    fn read_byte(&mut self) -> Result<Option<u8>, DriverError>;
    /// Write one line; the implementation appends the `\n` terminator.
    fn write_line(&mut self, line: &str) -> Result<(), DriverError>;
}

/// Receiver of quadrature channel levels, called from the edge (interrupt) context.
///
/// Implementations must return in bounded time and never block.
pub trait EdgeSink {
    fn on_edge(&mut self, a: bool, b: bool);
}

impl<T: DutyDriver + ?Sized> DutyDriver for Box<T> {
    fn set_forward(&mut self, duty_pct: u8) -> Result<(), DriverError> {
        (**self).set_forward(duty_pct)
    }
    fn set_backward(&mut self, duty_pct: u8) -> Result<(), DriverError> {
        (**self).set_backward(duty_pct)
    }
    fn stop(&mut self) -> Result<(), DriverError> {
        (**self).stop()
    }
    fn duty_ceiling(&self) -> u8 {
        (**self).duty_ceiling()
    }
}

impl<T: ServoDriver + ?Sized> ServoDriver for Box<T> {
    fn set_angle(&mut self, deg: u8) -> Result<(), DriverError> {
        (**self).set_angle(deg)
    }
}

impl<T: HostLink + ?Sized> HostLink for Box<T> {
    fn read_byte(&mut self) -> Result<Option<u8>, DriverError> {
        (**self).read_byte()
    }
    fn write_line(&mut self, line: &str) -> Result<(), DriverError> {
        (**self).write_line(line)
    }
}
