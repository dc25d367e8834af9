//! Error type for the gateway services.

use thiserror::Error;

/// Errors raised by the network services.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Socket setup or I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client failure while forwarding to a peer.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The IR transmitter rejected a frame.
    #[error("IR transmit failed: {0}")]
    Transmit(String),

    /// Forwarding needs a running Tokio runtime.
    #[error("no async runtime available for forwarding")]
    NoRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let e = GatewayError::Transmit("busy".into());
        assert_eq!(e.to_string(), "IR transmit failed: busy");
        let e: GatewayError = std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken").into();
        assert!(e.to_string().starts_with("I/O error"));
    }
}
