//! Desktop IR gateway.
//!
//! Runs the HTTP command intake, the throttle TCP server and the IR
//! encoder tick. Frames go to a [`LoggingTransmitter`], so the gateway can
//! be exercised from throttle apps and `curl` without an IR LED attached.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: HTTP on 8080, throttle server on 2560, channel A
//! ir-trainz-gateway
//!
//! # Two peers, start on channel G, verbose frames
//! RUST_LOG=ir_trainz=debug ir-trainz-gateway --peer 192.168.1.21 --peer 192.168.1.22 --channel G
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ir_trainz::config::{
    Config, DeviceConfig, IrConfig, PeerConfig, ThrottleServerConfig, WebConfig,
};
use ir_trainz::hal::{LoggingTransmitter, StdDelay};
use ir_trainz::ir::{IrEncoder, LocoAddress};
use ir_trainz::traits::{RefreshTimer, StaticPeers};
use ir_trainz::services::{
    run_server_with_state, HttpPeerForwarder, SharedGateway, ThrottleServer, WebServerConfig,
};

/// IR model-train gateway
#[derive(Parser, Debug)]
#[command(name = "ir-trainz-gateway")]
#[command(about = "IR model-train gateway with throttle server and peer forwarding")]
#[command(version)]
struct Args {
    /// HTTP intake port
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Throttle server port
    #[arg(short, long, default_value = "2560")]
    throttle_port: u16,

    /// Maximum concurrent throttle clients
    #[arg(long, default_value = "3")]
    max_clients: usize,

    /// Channel selected at startup (A-D, G-J)
    #[arg(short, long, default_value = "A")]
    channel: String,

    /// Sibling gateway (`host` or `host:port`), repeatable
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Do not forward commands to peers
    #[arg(long)]
    no_forward: bool,

    /// Forwarding timeout in milliseconds
    #[arg(long, default_value = "2000")]
    forward_timeout_ms: u32,

    /// IR carrier frequency in Hz
    #[arg(long, default_value = "38000")]
    carrier_hz: u32,

    /// Main loop tick in milliseconds
    #[arg(long, default_value = "10")]
    tick_ms: u32,

    /// Device name
    #[arg(long, default_value = "ir-trainz")]
    name: String,

    /// Disable the HTTP intake
    #[arg(long)]
    no_web: bool,

    /// Disable the throttle server
    #[arg(long)]
    no_throttle: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<Config> {
        let Some(channel) = LocoAddress::from_channel(&self.channel) else {
            bail!("unknown channel {:?}", self.channel);
        };

        let mut peers = PeerConfig::default()
            .with_forwarding(!self.no_forward)
            .with_timeout_ms(self.forward_timeout_ms);
        for peer in &self.peers {
            peers = peers.with_peer(peer);
        }
        if self.peers.len() > peers.static_peers.len() {
            warn!(
                kept = peers.static_peers.len(),
                given = self.peers.len(),
                "too many peers, extra ones ignored"
            );
        }

        Ok(Config::default()
            .with_ir(
                IrConfig::default()
                    .with_default_channel(channel)
                    .with_carrier_hz(self.carrier_hz)
                    .with_tick_ms(self.tick_ms),
            )
            .with_web(
                WebConfig::default()
                    .with_port(self.port)
                    .with_enabled(!self.no_web),
            )
            .with_throttle_server(
                ThrottleServerConfig::default()
                    .with_port(self.throttle_port)
                    .with_max_clients(self.max_clients)
                    .with_enabled(!self.no_throttle),
            )
            .with_peers(peers)
            .with_device(DeviceConfig::default().with_name(&self.name)))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Args::parse().into_config()?;
    info!(
        name = %config.device.name,
        version = env!("CARGO_PKG_VERSION"),
        channel = %config.ir.default_channel.channel(),
        "starting gateway"
    );

    let encoder = IrEncoder::new(LoggingTransmitter::new(), StdDelay);
    let forwarder = HttpPeerForwarder::new(config.peers.timeout_ms)?;
    let gateway = Arc::new(SharedGateway::new(encoder, forwarder, &config));
    info!(peers = ?gateway.peers(), forwarding = gateway.forwarding(), "peer forwarding");

    // Throttle server and IR repeats share one loop, like the device firmware.
    let mut throttle_server = if config.throttle_server.enabled {
        Some(ThrottleServer::from_config(&config.throttle_server).context("binding throttle server")?)
    } else {
        info!("throttle server disabled");
        None
    };
    let tick = Duration::from_millis(u64::from(config.ir.tick_ms));
    // mDNS browsing stays outside the gateway; the configured list stands in for it.
    let discovery = StaticPeers::new(config.peers.peers());
    let mut refresh = RefreshTimer::new(config.peers.refresh_interval_ms);
    let loop_gateway = Arc::clone(&gateway);
    let tick_thread = thread::Builder::new()
        .name("ir-tick".into())
        .spawn(move || loop {
            if refresh.due(loop_gateway.now_ms()) {
                loop_gateway.refresh_peers(&discovery);
            }
            if let Some(server) = throttle_server.as_mut() {
                if let Err(e) = loop_gateway.with_throttle(|p| server.poll(p)) {
                    warn!(error = %e, "throttle server poll failed");
                }
            }
            if let Err(e) = loop_gateway.tick() {
                warn!(error = %e, "IR repeat failed");
            }
            thread::sleep(tick);
        })
        .context("spawning tick thread")?;

    if config.web.enabled {
        run_server_with_state(gateway, WebServerConfig::from_config(&config.web))
            .await
            .context("HTTP intake")?;
    } else {
        info!("HTTP intake disabled");
        tokio::task::spawn_blocking(move || tick_thread.join())
            .await?
            .map_err(|_| anyhow!("tick thread panicked"))?;
    }
    Ok(())
}
