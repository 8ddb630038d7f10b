//! In-memory host links for tests, benches and the CLI self-check.

use std::collections::VecDeque;

use rover_traits::{DriverError, HostLink};

/// A link that never has input and discards everything written to it.
#[derive(Debug, Default)]
pub struct NullLink;

impl HostLink for NullLink {
    fn read_byte(&mut self) -> Result<Option<u8>, DriverError> {
        Ok(None)
    }

    fn write_line(&mut self, _line: &str) -> Result<(), DriverError> {
        Ok(())
    }
}

/// A link fed from a byte queue that records every line written back.
#[derive(Debug, Default)]
pub struct ScriptedLink {
    rx: VecDeque<u8>,
    sent: Vec<String>,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw bytes as if the host had sent them.
    pub fn push(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Lines written so far, terminator stripped.
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    pub fn take_sent(&mut self) -> Vec<String> {
        std::mem::take(&mut self.sent)
    }
}

impl HostLink for ScriptedLink {
    fn read_byte(&mut self) -> Result<Option<u8>, DriverError> {
        Ok(self.rx.pop_front())
    }

    fn write_line(&mut self, line: &str) -> Result<(), DriverError> {
        self.sent.push(line.to_owned());
        Ok(())
    }
}
