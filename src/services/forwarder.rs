//! HTTP delivery of forwarded commands to sibling gateways.
//!
//! Each forward posts the command as JSON to `http://<peer>/api/cmd` on a
//! spawned task, so the caller never waits on a slow or absent peer.
//! Failures are logged and dropped.

use std::time::Duration;

use tracing::{debug, warn};

use crate::messages::CommandRequest;
use crate::router::GatewayCommand;
use crate::traits::PeerTransport;

use super::error::GatewayError;

/// Build the intake URL for `peer` (`host`, `host:port` or a full URL).
///
/// ```
/// use ir_trainz::services::peer_url;
///
/// assert_eq!(peer_url("10.0.0.7"), "http://10.0.0.7/api/cmd");
/// assert_eq!(peer_url("gw2.local:8080"), "http://gw2.local:8080/api/cmd");
/// assert_eq!(peer_url("http://gw3/api/cmd"), "http://gw3/api/cmd");
/// ```
pub fn peer_url(peer: &str) -> String {
    if peer.starts_with("http://") || peer.starts_with("https://") {
        peer.to_string()
    } else {
        format!("http://{}/api/cmd", peer)
    }
}

/// Fire-and-forget HTTP forwarder.
#[derive(Clone, Debug)]
pub struct HttpPeerForwarder {
    client: reqwest::Client,
}

impl HttpPeerForwarder {
    /// Create a forwarder with a per-request timeout.
    pub fn new(timeout_ms: u32) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(u64::from(timeout_ms)))
            .build()?;
        Ok(Self { client })
    }
}

impl PeerTransport for HttpPeerForwarder {
    type Error = GatewayError;

    /// Queue the request on the current Tokio runtime.
    ///
    /// `Ok` means the request was handed off, not that the peer accepted it.
    fn forward(&mut self, peer: &str, command: &GatewayCommand) -> Result<(), GatewayError> {
        let handle =
            tokio::runtime::Handle::try_current().map_err(|_| GatewayError::NoRuntime)?;
        let url = peer_url(peer);
        let request = self.client.post(&url).json(&CommandRequest::from(command));

        handle.spawn(async move {
            match request.send().await {
                Ok(resp) if resp.status().is_success() => debug!(%url, "forwarded"),
                Ok(resp) => warn!(%url, status = %resp.status(), "peer rejected command"),
                Err(e) => warn!(%url, error = %e, "forward failed"),
            }
        });
        Ok(())
    }
}
