//! Gateway configuration shared by the device and desktop builds.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`.
//!
//! # Example
//!
//! ```rust
//! use ir_trainz::config::{Config, IrConfig, PeerConfig, WebConfig};
//! use ir_trainz::ir::LocoAddress;
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.throttle_server.port, 2560);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_ir(IrConfig::default().with_default_channel(LocoAddress::G))
//!     .with_web(WebConfig::default().with_port(3000))
//!     .with_peers(PeerConfig::default().with_peer("192.168.1.21"));
//! ```

use heapless::{String as HString, Vec as HVec};

use crate::ir::LocoAddress;
use crate::traits::{IR_CARRIER_HZ, MAX_PEERS};

/// Maximum length for short config strings (hostnames, device names)
pub const MAX_SHORT_STRING: usize = 64;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

/// Create a ShortString from a &str, truncating at a char boundary if too long
pub fn short_string(s: &str) -> ShortString {
    let mut end = s.len().min(MAX_SHORT_STRING);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut hs = ShortString::new();
    let _ = hs.push_str(&s[..end]);
    hs
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete gateway configuration
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// IR transmitter configuration
    pub ir: IrConfig,
    /// HTTP command intake configuration
    pub web: WebConfig,
    /// Throttle TCP server configuration
    pub throttle_server: ThrottleServerConfig,
    /// Sibling gateway forwarding
    pub peers: PeerConfig,
    /// Device identification
    pub device: DeviceConfig,
}

impl Config {
    /// Set IR configuration
    pub fn with_ir(mut self, ir: IrConfig) -> Self {
        self.ir = ir;
        self
    }

    /// Set web configuration
    pub fn with_web(mut self, web: WebConfig) -> Self {
        self.web = web;
        self
    }

    /// Set throttle server configuration
    pub fn with_throttle_server(mut self, throttle_server: ThrottleServerConfig) -> Self {
        self.throttle_server = throttle_server;
        self
    }

    /// Set peer configuration
    pub fn with_peers(mut self, peers: PeerConfig) -> Self {
        self.peers = peers;
        self
    }

    /// Set device configuration
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }
}

// ============================================================================
// IR Config
// ============================================================================

/// IR transmitter configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IrConfig {
    /// Carrier frequency in Hz
    pub carrier_hz: u32,
    /// Channel selected until a command names another
    pub default_channel: LocoAddress,
    /// Main loop tick driving repeats and throttle polling (milliseconds)
    pub tick_ms: u32,
}

impl Default for IrConfig {
    fn default() -> Self {
        Self {
            carrier_hz: IR_CARRIER_HZ,
            default_channel: LocoAddress::A,
            tick_ms: 10,
        }
    }
}

impl IrConfig {
    /// Set the carrier frequency
    pub fn with_carrier_hz(mut self, hz: u32) -> Self {
        self.carrier_hz = hz;
        self
    }

    /// Set the default channel
    pub fn with_default_channel(mut self, channel: LocoAddress) -> Self {
        self.default_channel = channel;
        self
    }

    /// Set the main loop tick (at least 1 ms)
    pub fn with_tick_ms(mut self, ms: u32) -> Self {
        self.tick_ms = ms.max(1);
        self
    }
}

// ============================================================================
// Web Config
// ============================================================================

/// HTTP command intake configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WebConfig {
    /// Port to listen on
    pub port: u16,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
    /// Whether the HTTP intake is enabled
    pub enabled: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cors_permissive: true,
            enabled: true,
        }
    }
}

impl WebConfig {
    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set CORS mode
    pub fn with_cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Enable or disable the HTTP intake
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ============================================================================
// Throttle Server Config
// ============================================================================

/// Throttle TCP server configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThrottleServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Concurrent client limit; further connections are closed on accept
    pub max_clients: usize,
    /// Whether the throttle server is enabled
    pub enabled: bool,
}

impl Default for ThrottleServerConfig {
    fn default() -> Self {
        Self {
            port: 2560,
            max_clients: 3,
            enabled: true,
        }
    }
}

impl ThrottleServerConfig {
    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the client limit
    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients;
        self
    }

    /// Enable or disable the throttle server
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ============================================================================
// Peer Config
// ============================================================================

/// Sibling gateway forwarding configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeerConfig {
    /// Whether locally received commands are forwarded
    pub forwarding: bool,
    /// Known peers (`host` or `host:port`)
    pub static_peers: HVec<ShortString, MAX_PEERS>,
    /// How often the peer list is refreshed (milliseconds)
    pub refresh_interval_ms: u32,
    /// Per-request timeout when forwarding (milliseconds)
    pub timeout_ms: u32,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            forwarding: true,
            static_peers: HVec::new(),
            refresh_interval_ms: 60_000,
            timeout_ms: 2_000,
        }
    }
}

impl PeerConfig {
    /// Enable or disable forwarding
    pub fn with_forwarding(mut self, forwarding: bool) -> Self {
        self.forwarding = forwarding;
        self
    }

    /// Add a static peer; ignored once the list is full
    pub fn with_peer(mut self, peer: &str) -> Self {
        let _ = self.static_peers.push(short_string(peer));
        self
    }

    /// Set the refresh interval
    pub fn with_refresh_interval_ms(mut self, ms: u32) -> Self {
        self.refresh_interval_ms = ms;
        self
    }

    /// Set the forwarding timeout
    pub fn with_timeout_ms(mut self, ms: u32) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Iterate over the static peers
    pub fn peers(&self) -> impl Iterator<Item = &str> {
        self.static_peers.iter().map(|p| p.as_str())
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// Device identification configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceConfig {
    /// Human-readable device name
    pub name: ShortString,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: short_string("ir-trainz"),
        }
    }
}

impl DeviceConfig {
    /// Set the device name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.ir.carrier_hz, 38_000);
        assert_eq!(config.ir.default_channel, LocoAddress::A);
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.throttle_server.port, 2560);
        assert_eq!(config.throttle_server.max_clients, 3);
        assert!(config.peers.forwarding);
        assert_eq!(config.peers.refresh_interval_ms, 60_000);
        assert_eq!(config.device.name.as_str(), "ir-trainz");
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_ir(IrConfig::default().with_carrier_hz(36_000).with_tick_ms(0))
            .with_web(WebConfig::default().with_port(3000).with_cors(false))
            .with_throttle_server(ThrottleServerConfig::default().with_max_clients(5))
            .with_device(DeviceConfig::default().with_name("Shelf Layout"));

        assert_eq!(config.ir.carrier_hz, 36_000);
        assert_eq!(config.ir.tick_ms, 1);
        assert_eq!(config.web.port, 3000);
        assert!(!config.web.cors_permissive);
        assert_eq!(config.throttle_server.max_clients, 5);
        assert_eq!(config.device.name.as_str(), "Shelf Layout");
    }

    #[test]
    fn peer_list_is_bounded() {
        let mut peers = PeerConfig::default();
        for i in 0..(MAX_PEERS + 3) {
            let mut host = ShortString::new();
            let _ = core::fmt::write(&mut host, format_args!("10.0.0.{}", i));
            peers = peers.with_peer(&host);
        }
        assert_eq!(peers.static_peers.len(), MAX_PEERS);
        assert_eq!(peers.peers().next(), Some("10.0.0.0"));
    }

    #[test]
    fn peer_builder() {
        let peers = PeerConfig::default()
            .with_forwarding(false)
            .with_peer("gw2.local:8080")
            .with_timeout_ms(500);
        assert!(!peers.forwarding);
        assert_eq!(peers.peers().collect::<Vec<_>>(), vec!["gw2.local:8080"]);
        assert_eq!(peers.timeout_ms, 500);
    }

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn short_string_utf8_boundary() {
        // 3-byte chars: 21 fit in 63 bytes, the 22nd would cross 64
        let input = "€".repeat(30);
        let s = short_string(&input);
        assert_eq!(s.len(), 63);
        assert!(core::str::from_utf8(s.as_bytes()).is_ok());
    }
}
