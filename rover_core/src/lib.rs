#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core motion-control logic (hardware-agnostic).
//!
//! All hardware interactions go through the `rover_traits` capability traits
//! (`DutyDriver`, `ServoDriver`, `HostLink`, `EdgeSink`), so everything here
//! runs against fakes in tests.
//!
//! ## Architecture
//!
//! - **Protocol**: line buffering and command parsing (`protocol` module)
//! - **Motor**: signed speed to duty + direction with back-EMF settle (`motor`)
//! - **Steering**: clamped servo angles (`steering`)
//! - **Encoder**: lock-free quadrature decoding (`encoder`)
//! - **Watchdog**: command-loss stop and status cadence (`watchdog`)
//! - **Controller**: the main-loop state machine tying these together
//!
//! ## Contexts
//!
//! The encoder decoder runs in the edge context and is the only writer of the
//! tick count. Everything else is owned by the control loop.

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod encoder;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod motor;
pub mod protocol;
pub mod runner;
pub mod state;
pub mod status;
pub mod steering;
pub mod watchdog;

pub use builder::{ControllerBuilder, DynController, build_controller};
pub use config::{MotorCfg, TimingCfg};
pub use controller::Controller;
pub use encoder::{QuadratureDecoder, TickCounter};
pub use error::{BuildError, CommandError, RoverError};
pub use motor::Direction;
pub use protocol::{Command, LineBuffer, StatusFrame};
pub use state::{Counters, MotionState};
pub use status::Dispatch;
pub use watchdog::WatchdogStatus;
