//! Network services for the desktop gateway.
//!
//! This module wires the core (encoder, router, throttle protocol) onto
//! real sockets:
//! - `web`: Axum-based HTTP command intake (`/api/cmd`, `/cmd/...`, `/api/state`)
//! - `forwarder`: reqwest-based delivery of commands to sibling gateways
//! - `withrottle_server`: poll-driven TCP server for throttle apps
//!
//! All services share a single [`SharedGateway`] wrapped in `Arc`.
//!
//! # Shared State Pattern
//!
//! ```ignore
//! use std::sync::Arc;
//! use ir_trainz::services::{build_router, HttpPeerForwarder, SharedGateway, WebServerConfig};
//!
//! let gateway = Arc::new(SharedGateway::new(encoder, HttpPeerForwarder::new(2_000)?, &config));
//!
//! // The HTTP intake and the throttle tick share the same state
//! let router = build_router(Arc::clone(&gateway), &WebServerConfig::from_config(&config.web));
//! gateway.with_throttle(|protocol| throttle_server.poll(protocol))?;
//! ```

pub mod api;
pub mod error;
pub mod forwarder;
pub mod shared;
pub mod web;
pub mod withrottle_server;

// Re-exports
pub use api::*;
pub use error::*;
pub use forwarder::*;
pub use shared::*;
pub use web::*;
pub use withrottle_server::*;
