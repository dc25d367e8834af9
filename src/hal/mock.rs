//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for the hardware and network traits,
//! enabling development and testing on desktop without an IR LED or a
//! second gateway on the network.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockTransmitter`] | [`PulseTransmitter`] | Records every frame |
//! | [`MockDelay`] | [`DelayNs`] | Records settle delays instead of sleeping |
//! | [`MockClock`] | [`Clock`] | Controllable wrapping time source |
//! | [`MockIrDriver`] | [`IrDriver`] | Records speed steps and function presses |
//! | [`MockPeerTransport`] | [`PeerTransport`] | Captures forwarded commands |
//!
//! # Example
//!
//! ```rust
//! use ir_trainz::hal::{MockDelay, MockTransmitter};
//! use ir_trainz::ir::{IrEncoder, LocoAddress};
//!
//! let mut encoder = IrEncoder::new(MockTransmitter::new(), MockDelay::new());
//! encoder.set_speed(LocoAddress::C, 2).unwrap();
//!
//! // Stop, Forward, Forward
//! assert_eq!(encoder.transmitter().frames.len(), 3);
//! assert_eq!(encoder.delay().total_ms(), 3 * 210);
//! ```
//!
//! [`PulseTransmitter`]: crate::traits::PulseTransmitter
//! [`DelayNs`]: crate::traits::DelayNs
//! [`Clock`]: crate::traits::Clock
//! [`IrDriver`]: crate::locos::IrDriver
//! [`PeerTransport`]: crate::traits::PeerTransport

use alloc::string::String;
use alloc::vec::Vec;

use crate::ir::{IrFunction, LocoAddress};
use crate::locos::IrDriver;
use crate::router::GatewayCommand;
use crate::traits::{Clock, DelayNs, PeerTransport, PulseTransmitter};

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Mock pulse transmitter for testing.
///
/// Records every frame for verification. Set `fail` to make the next
/// transmissions return an error.
///
/// # Example
///
/// ```rust
/// use ir_trainz::hal::MockTransmitter;
/// use ir_trainz::traits::PulseTransmitter;
///
/// let mut tx = MockTransmitter::new();
/// tx.transmit(&[4100, 550], 38_000).unwrap();
/// assert_eq!(tx.carriers, vec![38_000]);
///
/// tx.fail = true;
/// assert!(tx.transmit(&[4100], 38_000).is_err());
/// assert_eq!(tx.frames.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockTransmitter {
    /// Frames transmitted so far.
    pub frames: Vec<Vec<u16>>,
    /// Carrier frequency of each frame.
    pub carriers: Vec<u32>,
    /// When set, `transmit` fails without recording.
    pub fail: bool,
}

impl MockTransmitter {
    /// Creates a new mock transmitter with no recorded frames.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget recorded frames.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.carriers.clear();
    }
}

impl PulseTransmitter for MockTransmitter {
    type Error = ();

    fn transmit(&mut self, durations_us: &[u16], carrier_hz: u32) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.frames.push(durations_us.to_vec());
        self.carriers.push(carrier_hz);
        Ok(())
    }
}

/// Mock delay for testing.
///
/// Millisecond delays are recorded individually; finer delays only add
/// to the running total.
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Every `delay_ms` call, in order.
    pub delays_ms: Vec<u32>,
    /// Total requested delay in nanoseconds.
    pub total_ns: u64,
}

impl MockDelay {
    /// Creates a new mock delay with nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total requested delay in whole milliseconds.
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays_ms.push(ms);
        self.total_ns += u64::from(ms) * 1_000_000;
    }
}

/// Mock clock for testing.
///
/// Provides a controllable time source for testing time-dependent behavior.
/// Like a hardware tick counter, it wraps at `u32::MAX`.
///
/// # Example
///
/// ```rust
/// use ir_trainz::hal::MockClock;
/// use ir_trainz::traits::Clock;
///
/// let mut clock = MockClock::new();
/// clock.set(u32::MAX);
/// clock.advance(5);
/// assert_eq!(clock.now_ms(), 4);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_ms: u32,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u32) {
        self.current_ms = ms;
    }

    /// Advances the clock by the given duration, wrapping.
    pub fn advance(&mut self, ms: u32) {
        self.current_ms = self.current_ms.wrapping_add(ms);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u32 {
        self.current_ms
    }
}

/// One call seen by [`MockIrDriver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IrCall {
    /// `set_speed(address, step)`.
    Speed(LocoAddress, i32),
    /// `toggle_sound_light(address, function)`.
    Function(LocoAddress, IrFunction),
}

/// Mock IR driver recording what loco handlers asked for.
#[derive(Debug, Default)]
pub struct MockIrDriver {
    /// Calls in order.
    pub calls: Vec<IrCall>,
}

impl MockIrDriver {
    /// Creates a new mock driver.
    pub fn new() -> Self {
        Self::default()
    }
}

impl IrDriver for MockIrDriver {
    fn set_speed(&mut self, address: LocoAddress, step: i32) {
        self.calls.push(IrCall::Speed(address, step));
    }

    fn toggle_sound_light(&mut self, address: LocoAddress, function: IrFunction) {
        self.calls.push(IrCall::Function(address, function));
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

/// Mock peer transport for testing forwarding.
///
/// # Example
///
/// ```rust
/// use ir_trainz::hal::MockPeerTransport;
/// use ir_trainz::router::GatewayCommand;
/// use ir_trainz::traits::PeerTransport;
///
/// let mut transport = MockPeerTransport::new();
/// transport.unreachable.push("10.0.0.9".into());
///
/// let cmd = GatewayCommand::new("A", "light", "");
/// transport.forward("10.0.0.2", &cmd).unwrap();
/// assert!(transport.forward("10.0.0.9", &cmd).is_err());
/// assert_eq!(transport.sent_to("10.0.0.2").len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockPeerTransport {
    /// Commands delivered, with their destination.
    pub sent: Vec<(String, GatewayCommand)>,
    /// Peers that fail delivery.
    pub unreachable: Vec<String>,
}

impl MockPeerTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands delivered to `peer`.
    pub fn sent_to(&self, peer: &str) -> Vec<&GatewayCommand> {
        self.sent
            .iter()
            .filter(|(p, _)| p == peer)
            .map(|(_, cmd)| cmd)
            .collect()
    }
}

impl PeerTransport for MockPeerTransport {
    type Error = ();

    fn forward(&mut self, peer: &str, command: &GatewayCommand) -> Result<(), ()> {
        if self.unreachable.iter().any(|p| p == peer) {
            return Err(());
        }
        self.sent.push((peer.into(), command.clone()));
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
