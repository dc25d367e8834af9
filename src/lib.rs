//! # ir-trainz
//!
//! An infrared gateway for toy model trains: commands arrive over HTTP or
//! from throttle apps speaking the WiThrottle text protocol, and leave as
//! 38 kHz IR frames for the receivers in the locos.
//!
//! ## Features
//!
//! - **IR encoding**: three receiver families (channels A/B, C/D, G/H) with
//!   toggle-bit alternation and timed repeat bursts
//! - **Throttle server**: handshake, track power, loco acquisition and
//!   speed/direction/function control for up to three clients
//! - **Command routing**: `(channel, command, args)` triples from HTTP
//! - **Peer forwarding**: single-hop propagation to sibling gateways
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Pulse transmitter, clock, peer discovery and transport seams
//! - `ir` - Frame builders and the stateful [`IrEncoder`]
//! - `registry` - Locos known to the throttle protocol
//! - `locos` - Loco handlers that drive the encoder
//! - `withrottle` - Throttle line protocol
//! - `router` - Command dispatch and peer forwarding
//! - `hal` - Concrete implementations (mock for testing, host for desktop)
//!
//! ## Example
//!
//! ```rust
//! use ir_trainz::{
//!     hal::{MockDelay, MockTransmitter},
//!     CommandRouter, GatewayCommand, IrEncoder, LocoAddress,
//! };
//!
//! // Create an encoder with a mock transmitter
//! let mut encoder = IrEncoder::new(MockTransmitter::new(), MockDelay::new());
//! let mut router = CommandRouter::new(LocoAddress::A);
//!
//! // Channel G, two steps forward
//! router.dispatch(&mut encoder, &GatewayCommand::new("G", "speed", "2")).unwrap();
//! assert_eq!(encoder.transmitter().frames.len(), 1);
//!
//! // Drive timed repeats from your main loop
//! encoder.update(200).unwrap();
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Hardware abstraction layer with mock and desktop implementations.
pub mod hal;
/// Infrared frame encoding and the repeat scheduler.
pub mod ir;
/// IR-backed loco handlers and the loco factory.
pub mod locos;
/// Loco registry and handler seam.
pub mod registry;
/// Command routing and single-hop peer forwarding.
pub mod router;
/// Core traits for hardware and network abstraction.
pub mod traits;
/// WiThrottle-style line protocol.
pub mod withrottle;

/// Shared configuration system for desktop and device builds.
pub mod config;

/// Text parsing helpers for command intake.
pub mod parsing;

/// Shared message types for HTTP intake and forwarding (serde-based).
#[cfg(feature = "serde")]
pub mod messages;

/// Network services: HTTP intake, peer forwarding, throttle TCP server.
#[cfg(feature = "web")]
pub mod services;

// Re-exports for convenience
pub use ir::{Family, IrEncoder, IrFunction, LocoAddress, SpeedCode};
pub use locos::{IrDriver, IrLocoFactory, IrLocoHandler};
pub use registry::{LocoFactory, LocoHandler, LocoRecord, LocoRegistry, LocoState};
pub use router::{forward_to_peers, CommandRouter, ForwardReport, GatewayCommand, RouterAction};
pub use traits::{
    // Hardware
    Clock,
    DelayNs,
    // Network
    PeerDiscovery,
    PeerTransport,
    PulseTransmitter,
    RefreshTimer,
    StaticPeers,
};
pub use withrottle::{LineBuffer, ThrottleProtocol};

// Config re-exports
pub use config::{Config, DeviceConfig, IrConfig, PeerConfig, ThrottleServerConfig, WebConfig};

// Message re-exports (for HTTP intake and forwarding)
#[cfg(feature = "serde")]
pub use messages::CommandRequest;

// Parsing function re-exports (serde-json-core based)
#[cfg(feature = "serde-json-core")]
pub use messages::parse_command_request;
