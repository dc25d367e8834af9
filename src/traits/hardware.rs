//! Hardware abstraction traits for IR transmission and timekeeping.
//!
//! This module defines the hardware interfaces that allow ir-trainz to
//! work across different platforms (a GPIO/RMT peripheral, desktop mocks, etc.).
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`PulseTransmitter`] | Emits a raw mark/space pulse train on a modulated carrier |
//! | [`Clock`] | Wrapping millisecond time source for repeat scheduling |
//! | [`DelayNs`] | Blocking settle delays between frames (from `embedded-hal`) |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. The host implementations in `hal::host`
//! log pulse trains instead of driving an LED.
//!
//! # Example
//!
//! ```rust
//! use ir_trainz::traits::PulseTransmitter;
//! use ir_trainz::hal::MockTransmitter;
//!
//! let mut tx = MockTransmitter::new();
//! tx.transmit(&[5400, 600, 1700], 38_000).unwrap();
//!
//! assert_eq!(tx.frames.len(), 1);
//! assert_eq!(tx.frames[0], vec![5400, 600, 1700]);
//! ```

pub use embedded_hal::delay::DelayNs;

/// IR carrier frequency used by every supported protocol family.
pub const IR_CARRIER_HZ: u32 = 38_000;

/// Raw pulse transmitter - abstracts the IR LED driver.
///
/// Implement this trait for your transmitter hardware. The encoder hands
/// over a complete frame of alternating mark/space durations, starting
/// with a mark.
///
/// # Implementation Notes
///
/// - `transmit` is synchronous and should block for the duration of the frame
/// - Durations are in microseconds
/// - The carrier is applied to marks only
///
/// # Example Implementation
///
/// ```rust,ignore
/// use ir_trainz::traits::PulseTransmitter;
///
/// struct MyLed { /* RMT channel */ }
///
/// impl PulseTransmitter for MyLed {
///     type Error = ();
///
///     fn transmit(&mut self, durations_us: &[u16], carrier_hz: u32) -> Result<(), ()> {
///         // Load the RMT items and wait for completion...
///         Ok(())
///     }
/// }
/// ```
pub trait PulseTransmitter {
    /// Error type for transmit operations.
    type Error: core::fmt::Debug;

    /// Transmit one frame of mark/space durations on the given carrier.
    fn transmit(&mut self, durations_us: &[u16], carrier_hz: u32) -> Result<(), Self::Error>;
}

impl<T: PulseTransmitter + ?Sized> PulseTransmitter for &mut T {
    type Error = T::Error;

    fn transmit(&mut self, durations_us: &[u16], carrier_hz: u32) -> Result<(), Self::Error> {
        (**self).transmit(durations_us, carrier_hz)
    }
}

/// Time source trait for `no_std` compatibility.
///
/// Provides a wrapping millisecond counter, the way a microcontroller
/// `millis()` tick does. Consumers must compare timestamps with
/// [`elapsed_ms`] rather than plain subtraction.
///
/// # Example
///
/// ```rust
/// use ir_trainz::traits::Clock;
/// use ir_trainz::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// The value wraps at `u32::MAX`.
    fn now_ms(&self) -> u32;
}

/// Milliseconds elapsed between `last` and `now` on a wrapping counter.
///
/// # Examples
///
/// ```
/// use ir_trainz::traits::elapsed_ms;
///
/// assert_eq!(elapsed_ms(150, 100), 50);
/// assert_eq!(elapsed_ms(10, u32::MAX - 5), 15);
/// ```
#[inline]
pub const fn elapsed_ms(now: u32, last: u32) -> u32 {
    if now < last {
        u32::MAX - last + now
    } else {
        now - last
    }
}
