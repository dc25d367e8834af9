//! Unified shared state for all gateway services.
//!
//! `SharedGateway` owns the IR encoder, the command router, the throttle
//! protocol state and the peer list, and hands out short-lived locks to the
//! HTTP intake, the throttle server tick and the peer forwarder.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ir_trainz::services::SharedGateway;
//!
//! let gateway = Arc::new(SharedGateway::new(encoder, transport, &config));
//!
//! // HTTP intake executes, then forwards
//! gateway.execute(&cmd)?;
//! gateway.forward(&cmd);
//!
//! // Main loop drives repeats
//! gateway.tick()?;
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::config::Config;
use crate::hal::SystemClock;
use crate::ir::IrEncoder;
use crate::locos::IrLocoFactory;
use crate::registry::LocoRegistry;
use crate::router::{forward_to_peers, CommandRouter, ForwardReport, GatewayCommand, RouterAction};
use crate::traits::{Clock, DelayNs, PeerDiscovery, PeerTransport, PulseTransmitter, StaticPeers};
use crate::withrottle::ThrottleProtocol;

use super::api::{LocoResponse, StateResponse};
use super::error::GatewayError;

// ============================================================================
// Gateway Provider Trait
// ============================================================================

/// What the HTTP intake needs from the gateway.
///
/// This abstraction keeps the route handlers independent of the
/// transmitter, delay and transport types.
pub trait GatewayProvider: Send + Sync + 'static {
    /// Milliseconds since the gateway started (wrapping).
    fn now_ms(&self) -> u32;

    /// Execute a command on the IR encoder.
    fn execute(&self, command: &GatewayCommand) -> Result<RouterAction, GatewayError>;

    /// Forward a command to the peers if it was received locally.
    fn forward(&self, command: &GatewayCommand) -> ForwardReport;

    /// Current state snapshot.
    fn state(&self) -> StateResponse;
}

/// Lock a mutex, recovering the data if a holder panicked.
fn lock<M>(mutex: &Mutex<M>) -> MutexGuard<'_, M> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Shared Gateway
// ============================================================================

/// Shared state for the HTTP intake, the throttle server and forwarding.
///
/// # Thread Safety
///
/// - The encoder sits behind an `Arc<Mutex<_>>` shared with the loco
///   handlers, so throttle changes and HTTP commands transmit through the
///   same toggle and repeat state.
/// - Lock order is router or throttle first, encoder second; nothing takes
///   the encoder lock and then another.
pub struct SharedGateway<T, D, X> {
    encoder: Arc<Mutex<IrEncoder<T, D>>>,
    router: Mutex<CommandRouter>,
    throttle: Mutex<ThrottleProtocol>,
    peers: Mutex<StaticPeers>,
    transport: Mutex<X>,
    forwarding: bool,
    clock: SystemClock,
}

impl<T, D, X> SharedGateway<T, D, X>
where
    T: PulseTransmitter + Send + 'static,
    D: DelayNs + Send + 'static,
    X: PeerTransport + Send,
{
    /// Wrap `encoder` and register the startup locos.
    pub fn new(encoder: IrEncoder<T, D>, transport: X, config: &Config) -> Self {
        let encoder = Arc::new(Mutex::new(encoder.with_carrier(config.ir.carrier_hz)));
        let factory = IrLocoFactory::new(Arc::clone(&encoder));
        let mut registry = LocoRegistry::new();
        factory.populate(&mut registry);
        let throttle = ThrottleProtocol::new(registry).with_factory(Box::new(factory));

        Self {
            encoder,
            router: Mutex::new(CommandRouter::new(config.ir.default_channel)),
            throttle: Mutex::new(throttle),
            peers: Mutex::new(StaticPeers::new(config.peers.peers())),
            transport: Mutex::new(transport),
            forwarding: config.peers.forwarding,
            clock: SystemClock::new(),
        }
    }

    /// Milliseconds since creation, wrapping like the device clock.
    #[inline]
    pub fn now_ms(&self) -> u32 {
        self.clock.now_ms()
    }

    /// Access the encoder with a mutable lock.
    pub fn with_encoder<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut IrEncoder<T, D>) -> R,
    {
        f(&mut lock(&self.encoder))
    }

    /// Access the throttle protocol with a mutable lock.
    ///
    /// The throttle server polls its clients inside this closure.
    pub fn with_throttle<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut ThrottleProtocol) -> R,
    {
        f(&mut lock(&self.throttle))
    }

    /// Access the peer transport with a mutable lock.
    pub fn with_transport<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut X) -> R,
    {
        f(&mut lock(&self.transport))
    }

    /// Replace the peer list with a fresh discovery result.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.peers).replace(peers);
    }

    /// Copy the current result of `discovery` into the peer list.
    pub fn refresh_peers<P: PeerDiscovery + ?Sized>(&self, discovery: &P) {
        let found: Vec<String> = (0..discovery.count())
            .filter_map(|i| discovery.address_at(i))
            .map(String::from)
            .collect();
        debug!(peers = found.len(), "peer list refreshed");
        self.set_peers(found);
    }

    /// Known peers.
    pub fn peers(&self) -> Vec<String> {
        lock(&self.peers).iter().map(String::from).collect()
    }

    /// Whether locally received commands are forwarded.
    pub fn forwarding(&self) -> bool {
        self.forwarding
    }

    /// Run pending IR repeats. Call every main-loop tick.
    pub fn tick(&self) -> Result<(), GatewayError> {
        let now_ms = self.now_ms();
        lock(&self.encoder)
            .update(now_ms)
            .map_err(|e| GatewayError::Transmit(format!("{:?}", e)))
    }

    /// Execute a command on the encoder.
    pub fn execute(&self, command: &GatewayCommand) -> Result<RouterAction, GatewayError> {
        let mut router = lock(&self.router);
        let mut encoder = lock(&self.encoder);
        router
            .dispatch(&mut encoder, command)
            .map_err(|e| GatewayError::Transmit(format!("{:?}", e)))
    }

    /// Forward `command` to every peer unless it is a forwarded copy.
    pub fn forward(&self, command: &GatewayCommand) -> ForwardReport {
        if !self.forwarding {
            return ForwardReport::default();
        }
        let peers = lock(&self.peers).clone();
        let mut transport = lock(&self.transport);
        forward_to_peers(command, &peers, &mut *transport)
    }

    /// Get a state snapshot.
    pub fn state(&self) -> StateResponse {
        let current_channel = lock(&self.router).current_address().channel();
        let throttle = lock(&self.throttle);
        StateResponse {
            track_power: throttle.track_power(),
            current_channel,
            locos: throttle.registry().iter().map(LocoResponse::from).collect(),
        }
    }
}

// ============================================================================
// GatewayProvider Implementation
// ============================================================================

impl<T, D, X> GatewayProvider for SharedGateway<T, D, X>
where
    T: PulseTransmitter + Send + 'static,
    D: DelayNs + Send + 'static,
    X: PeerTransport + Send + 'static,
{
    fn now_ms(&self) -> u32 {
        SharedGateway::now_ms(self)
    }

    fn execute(&self, command: &GatewayCommand) -> Result<RouterAction, GatewayError> {
        SharedGateway::execute(self, command)
    }

    fn forward(&self, command: &GatewayCommand) -> ForwardReport {
        SharedGateway::forward(self, command)
    }

    fn state(&self) -> StateResponse {
        SharedGateway::state(self)
    }
}
