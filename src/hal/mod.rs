//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`] for various platforms.
//!
//! # Available Implementations
//!
//! - `mock`: Test implementations for desktop development
//! - `host`: Desktop delay, clock and a logging transmitter (requires `std`)

pub mod mock;

#[cfg(feature = "std")]
pub mod host;

pub use mock::*;

#[cfg(feature = "std")]
pub use host::*;
