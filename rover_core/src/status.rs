//! Outcome of dispatching one received line.

use crate::error::CommandError;
use crate::protocol::Command;

/// What the controller did with a completed line.
///
/// Either way the watchdog was refreshed: a malformed line still proves the
/// host link is alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Recognized and executed.
    Applied(Command),
    /// Not executed; the reason went to the diagnostic log.
    Rejected(CommandError),
}

impl Dispatch {
    pub fn is_applied(&self) -> bool {
        matches!(self, Dispatch::Applied(_))
    }
}
