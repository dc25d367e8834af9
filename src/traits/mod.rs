//! Trait definitions for hardware and network abstraction.
//!
//! This module defines the core abstractions that allow ir-trainz to:
//! - Run on different hardware (an IR LED peripheral, desktop mock)
//! - Discover and reach sibling gateways without tying the core to a network stack
//!
//! # Submodules
//!
//! - `hardware`: Pulse transmitter, settle delay, clock
//! - `network`: Peer discovery and forwarding transport

pub mod hardware;
pub mod network;

pub use hardware::*;
pub use network::*;
