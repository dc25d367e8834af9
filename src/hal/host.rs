//! Desktop implementations of the hardware traits.
//!
//! The gateway binary runs on a PC without an IR LED; frames are logged
//! through `tracing` so the command flow can be followed with
//! `RUST_LOG=ir_trainz=debug`.

use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::traits::{Clock, DelayNs, PulseTransmitter};

/// Blocking delay backed by `std::thread::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Millisecond clock measured from construction, wrapping like a tick counter.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Start counting from now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap.
        self.start.elapsed().as_millis() as u32
    }
}

/// Transmitter that logs frames instead of driving an LED.
#[derive(Debug, Default)]
pub struct LoggingTransmitter {
    frames_sent: u64,
}

impl LoggingTransmitter {
    /// Create a transmitter with a zero frame count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames "sent" so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }
}

impl PulseTransmitter for LoggingTransmitter {
    type Error = core::convert::Infallible;

    fn transmit(&mut self, durations_us: &[u16], carrier_hz: u32) -> Result<(), Self::Error> {
        self.frames_sent += 1;
        let total_us: u32 = durations_us.iter().map(|&d| u32::from(d)).sum();
        debug!(
            frame = self.frames_sent,
            slots = durations_us.len(),
            total_us,
            carrier_hz,
            "IR frame"
        );
        Ok(())
    }
}
