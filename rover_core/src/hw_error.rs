//! Maps `Box<dyn Error>` from trait boundaries to typed `RoverError`.
//!
//! The traits in `rover_traits` use `Box<dyn Error + Send + Sync>`; this module
//! converts those to our typed error enum, with an optional feature-gated path
//! for `rover_hardware::HwError` downcasting.

use crate::error::RoverError;

/// Which side of the trait seam produced the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seam {
    Actuator,
    Link,
}

/// Map a trait-boundary error to a typed `RoverError`.
///
/// Known hardware error types are downcast first; anything else is classified
/// by the seam it came through.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static), seam: Seam) -> RoverError {
    #[cfg(feature = "hardware-errors")]
    {
        use rover_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Uart(_) | HwError::LinkClosed => RoverError::Link(hw.to_string()),
                HwError::Io(_) if seam == Seam::Link => RoverError::Link(hw.to_string()),
                other => RoverError::HardwareFault(other.to_string()),
            };
        }
    }

    match seam {
        Seam::Actuator => RoverError::Hardware(e.to_string()),
        Seam::Link => RoverError::Link(e.to_string()),
    }
}
