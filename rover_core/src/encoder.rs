//! Quadrature encoder decoding.
//!
//! The decoder runs in the edge context (a GPIO interrupt thread on the Pi, a
//! simulation thread otherwise) and is the only writer of the tick count. The
//! control loop holds a [`TickCounter`] clone and only reads or zeroes it.
//!
//! Phase is `(A << 1) | B`. The sequence 00 → 01 → 11 → 10 → 00 counts up,
//! the reverse counts down, and double steps (both channels changed) are noise.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use rover_traits::EdgeSink;

/// Tick delta for each `(last << 2) | now` transition code.
const TRANSITIONS: [i8; 16] = [
    0,  // 00 -> 00
    1,  // 00 -> 01
    -1, // 00 -> 10
    0,  // 00 -> 11 (invalid)
    -1, // 01 -> 00
    0,  // 01 -> 01
    0,  // 01 -> 10 (invalid)
    1,  // 01 -> 11
    1,  // 10 -> 00
    0,  // 10 -> 01 (invalid)
    0,  // 10 -> 10
    -1, // 10 -> 11
    0,  // 11 -> 00 (invalid)
    -1, // 11 -> 01
    1,  // 11 -> 10
    0,  // 11 -> 11
];

/// 2-bit phase from the two channel levels.
#[inline]
pub fn phase(a: bool, b: bool) -> u8 {
    (u8::from(a) << 1) | u8::from(b)
}

/// Tick delta for a phase transition; 0 for repeats and invalid double steps.
#[inline]
pub fn step(last: u8, now: u8) -> i8 {
    let code = ((last & 0b11) << 2) | (now & 0b11);
    TRANSITIONS[usize::from(code)]
}

/// Shared, lock-free tick count.
///
/// A single 64-bit atomic, so a read can never observe a torn value written
/// half-way by the edge context.
#[derive(Debug, Clone, Default)]
pub struct TickCounter(Arc<AtomicI64>);

impl TickCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count; never blocks.
    #[inline]
    pub fn read(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Zero the count unconditionally.
    #[inline]
    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }

    #[inline]
    fn add(&self, delta: i64) {
        self.0.fetch_add(delta, Ordering::Relaxed);
    }
}

/// Edge-context half of the encoder: remembers the last phase, bumps the counter.
#[derive(Debug)]
pub struct QuadratureDecoder {
    last_phase: u8,
    ticks: TickCounter,
}

impl QuadratureDecoder {
    /// Decoder starting from phase 00.
    pub fn new(ticks: TickCounter) -> Self {
        Self {
            last_phase: 0,
            ticks,
        }
    }

    /// Decoder seeded with the channel levels observed at startup, so the first
    /// real edge is not mistaken for a transition out of 00.
    pub fn with_levels(ticks: TickCounter, a: bool, b: bool) -> Self {
        Self {
            last_phase: phase(a, b),
            ticks,
        }
    }

    pub fn last_phase(&self) -> u8 {
        self.last_phase
    }

    pub fn ticks(&self) -> &TickCounter {
        &self.ticks
    }
}

impl EdgeSink for QuadratureDecoder {
    #[inline]
    fn on_edge(&mut self, a: bool, b: bool) {
        let now = phase(a, b);
        let delta = step(self.last_phase, now);
        if delta != 0 {
            self.ticks.add(i64::from(delta));
        }
        self.last_phase = now;
    }
}
