//! Host link over the process's stdin/stdout.
//!
//! A reader thread owns stdin and forwards bytes through a channel, so
//! `read_byte` never blocks. Status frames go to stdout, one per line.

use std::io::{Read, Write};

use crossbeam_channel as xch;
use rover_traits::{DriverError, HostLink};

use crate::error::HwError;

pub struct StdioLink {
    rx: xch::Receiver<u8>,
    closed_logged: bool,
}

impl StdioLink {
    /// Start reading stdin on a background thread.
    ///
    /// The reader blocks inside `read` and is left detached; it exits on EOF,
    /// on a read error or when the link is dropped and the next byte arrives.
    pub fn spawn() -> Self {
        Self::from_reader(std::io::stdin())
    }

    /// Same as [`StdioLink::spawn`] over any byte source.
    pub fn from_reader<R: Read + Send + 'static>(mut input: R) -> Self {
        let (tx, rx) = xch::unbounded();
        std::thread::spawn(move || {
            let mut buf = [0u8; 256];
            loop {
                match input.read(&mut buf) {
                    Ok(0) => {
                        tracing::debug!("host input reached EOF");
                        break;
                    }
                    Ok(n) => {
                        if buf[..n].iter().any(|b| tx.send(*b).is_err()) {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        tracing::warn!(error = %e, "host input read failed");
                        break;
                    }
                }
            }
        });
        Self {
            rx,
            closed_logged: false,
        }
    }
}

impl HostLink for StdioLink {
    fn read_byte(&mut self) -> Result<Option<u8>, DriverError> {
        match self.rx.try_recv() {
            Ok(b) => Ok(Some(b)),
            Err(xch::TryRecvError::Empty) => Ok(None),
            // A closed input is a silent host: the watchdog handles it.
            Err(xch::TryRecvError::Disconnected) => {
                if !self.closed_logged {
                    self.closed_logged = true;
                    tracing::info!("host input closed");
                }
                Ok(None)
            }
        }
    }

    fn write_line(&mut self, line: &str) -> Result<(), DriverError> {
        let mut out = std::io::stdout().lock();
        let res = writeln!(out, "{line}").and_then(|()| out.flush());
        match res {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Err(Box::new(HwError::LinkClosed)),
            Err(e) => Err(Box::new(HwError::Io(e))),
        }
    }
}
