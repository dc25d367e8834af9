//! Network abstraction traits for peer discovery and command forwarding.
//!
//! Sibling gateways are found out-of-band (mDNS on the device, a static
//! list on the desktop). The router only needs the resulting address list
//! and a way to post a command to one of them.
//!
//! # Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`PeerDiscovery`] | Current list of sibling gateway addresses |
//! | [`PeerTransport`] | Deliver a forwarded command to one sibling |
//!
//! # Forwarding
//!
//! Forwarded commands are posted to `http://<peer>/api/cmd` as JSON:
//!
//! ```text
//! {"channel":"A","cmd":"speed","args":"2","repeated":true}
//! ```

use alloc::string::String;
use alloc::vec::Vec;

use crate::router::GatewayCommand;
use crate::traits::hardware::elapsed_ms;

/// Maximum number of sibling gateways tracked at once.
pub const MAX_PEERS: usize = 10;

/// Source of sibling gateway addresses.
///
/// Indexing mirrors a discovery result table: `count()` entries, each
/// retrievable with `address_at(i)`.
pub trait PeerDiscovery {
    /// Number of peers currently known.
    fn count(&self) -> usize;

    /// Address (`host` or `host:port`) of peer `index`, if present.
    fn address_at(&self, index: usize) -> Option<&str>;
}

/// Delivery of a forwarded command to a single peer.
///
/// Implementations are best-effort: a failure is reported but never retried.
pub trait PeerTransport {
    /// Error type for delivery failures.
    type Error: core::fmt::Debug;

    /// Post `command` to the gateway at `peer`.
    fn forward(&mut self, peer: &str, command: &GatewayCommand) -> Result<(), Self::Error>;
}

/// A fixed peer list, e.g. from configuration.
///
/// # Example
///
/// ```
/// use ir_trainz::traits::{PeerDiscovery, StaticPeers};
///
/// let peers = StaticPeers::new(["192.168.1.20", "192.168.1.21"]);
/// assert_eq!(peers.count(), 2);
/// assert_eq!(peers.address_at(1), Some("192.168.1.21"));
/// assert_eq!(peers.address_at(2), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticPeers {
    addresses: Vec<String>,
}

impl StaticPeers {
    /// Create a peer list, keeping at most [`MAX_PEERS`] entries.
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            addresses: addresses
                .into_iter()
                .take(MAX_PEERS)
                .map(Into::into)
                .collect(),
        }
    }

    /// Replace the list with a fresh discovery result.
    pub fn replace<I, S>(&mut self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self = Self::new(addresses);
    }

    /// Iterate over the known addresses.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.addresses.iter().map(String::as_str)
    }
}

impl PeerDiscovery for StaticPeers {
    fn count(&self) -> usize {
        self.addresses.len()
    }

    fn address_at(&self, index: usize) -> Option<&str> {
        self.addresses.get(index).map(String::as_str)
    }
}

/// Paces out-of-band peer discovery on a wrapping millisecond clock.
///
/// ```
/// use ir_trainz::traits::RefreshTimer;
///
/// let mut timer = RefreshTimer::new(60_000);
/// assert!(timer.due(5));
/// assert!(!timer.due(59_000));
/// assert!(timer.due(60_005));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshTimer {
    interval_ms: u32,
    last_ms: Option<u32>,
}

impl RefreshTimer {
    /// Timer that fires on its first check, then every `interval_ms`.
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    /// True if a refresh is due at `now_ms`; restarts the interval when it is.
    pub fn due(&mut self, now_ms: u32) -> bool {
        match self.last_ms {
            Some(last) if elapsed_ms(now_ms, last) < self.interval_ms => false,
            _ => {
                self.last_ms = Some(now_ms);
                true
            }
        }
    }
}
