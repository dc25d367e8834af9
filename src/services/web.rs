//! Axum-based HTTP command intake.
//!
//! Provides endpoints for:
//! - POST `/api/cmd` - JSON command; executed, then forwarded to peers
//! - GET `/cmd/{channel}/{cmd}/{args}`, `/cmd/{a}/{b}`, `/cmd/{cmd}` - path commands, never forwarded
//! - GET `/api/state` - Track power, current channel and registered locos
//!
//! IR transmission blocks for the frame settle delays, so commands run on
//! Tokio's blocking pool.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::WebConfig;
use crate::messages::parse_command_request;
use crate::parsing::split_cmd_path;
use crate::router::{GatewayCommand, RouterAction};

use super::api::{ApiResponse, StateResponse};
use super::error::GatewayError;
use super::shared::GatewayProvider;

// ============================================================================
// Helpers
// ============================================================================

async fn run_command<S: GatewayProvider>(
    gateway: &Arc<S>,
    command: GatewayCommand,
) -> Result<RouterAction, GatewayError> {
    let gw = Arc::clone(gateway);
    match tokio::task::spawn_blocking(move || gw.execute(&command)).await {
        Ok(result) => result,
        Err(e) => Err(GatewayError::Transmit(e.to_string())),
    }
}

fn transmit_failed(e: GatewayError) -> Response {
    warn!(error = %e, "command failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /api/state - Returns the gateway state
async fn get_state<S: GatewayProvider>(State(gateway): State<Arc<S>>) -> Response {
    // The tick thread holds the throttle lock while loco handlers transmit
    match tokio::task::spawn_blocking(move || gateway.state()).await {
        Ok(state) => Json(ApiResponse::ok(state)).into_response(),
        Err(e) => {
            warn!(error = %e, "state snapshot failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<StateResponse>::err(e.to_string())),
            )
                .into_response()
        }
    }
}

/// POST /api/cmd - Execute a JSON command, then forward it
///
/// Accepts JSON: `{"channel": "A", "cmd": "speed", "args": "2", "repeated": false}`
async fn post_cmd<S: GatewayProvider>(State(gateway): State<Arc<S>>, body: Bytes) -> Response {
    let Some(request) = parse_command_request(&body) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::err("Invalid command request")),
        )
            .into_response();
    };
    let command = request.into_command();

    if let Err(e) = run_command(&gateway, command.clone()).await {
        return transmit_failed(e);
    }
    gateway.forward(&command);
    "OK".into_response()
}

/// GET /api/cmd - Commands must be posted
async fn get_cmd() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Page not found.")
}

async fn path_cmd<S: GatewayProvider>(gateway: Arc<S>, segments: &[&str]) -> Response {
    let Some((channel, cmd, args)) = split_cmd_path(segments) else {
        return not_found().await.into_response();
    };
    match run_command(&gateway, GatewayCommand::new(channel, cmd, args)).await {
        // Only the bare `/cmd/keepalive` route acknowledges the keepalive
        Ok(RouterAction::KeepAlive) if segments.len() == 1 => {
            "keep alive accepted".into_response()
        }
        Ok(_) => "done".into_response(),
        Err(e) => transmit_failed(e),
    }
}

/// GET /cmd/{channel}/{cmd}/{args}
async fn path_cmd3<S: GatewayProvider>(
    State(gateway): State<Arc<S>>,
    Path((a, b, c)): Path<(String, String, String)>,
) -> Response {
    path_cmd(gateway, &[&a, &b, &c]).await
}

/// GET /cmd/{channel}/{cmd} or /cmd/{cmd}/{args}
async fn path_cmd2<S: GatewayProvider>(
    State(gateway): State<Arc<S>>,
    Path((a, b)): Path<(String, String)>,
) -> Response {
    path_cmd(gateway, &[&a, &b]).await
}

/// GET /cmd/{cmd}
async fn path_cmd1<S: GatewayProvider>(
    State(gateway): State<Arc<S>>,
    Path(a): Path<String>,
) -> Response {
    path_cmd(gateway, &[&a]).await
}

/// Fallback handler for 404
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::err("Not found")),
    )
}

// ============================================================================
// Server Builder
// ============================================================================

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    /// Address to bind to
    pub addr: SocketAddr,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_permissive: true,
        }
    }
}

impl WebServerConfig {
    /// Create a new config with the given address
    pub fn new(addr: impl Into<SocketAddr>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Set whether CORS should be permissive
    pub fn cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Create from shared WebConfig
    pub fn from_config(config: &WebConfig) -> Self {
        Self {
            addr: ([0, 0, 0, 0], config.port).into(),
            cors_permissive: config.cors_permissive,
        }
    }
}

/// Build the Axum router with all routes
pub fn build_router<S: GatewayProvider>(gateway: Arc<S>, config: &WebServerConfig) -> Router {
    let mut router = Router::new()
        .route("/api/state", get(get_state::<S>))
        .route("/api/cmd", get(get_cmd).post(post_cmd::<S>))
        .route("/cmd/:a/:b/:c", get(path_cmd3::<S>))
        .route("/cmd/:a/:b", get(path_cmd2::<S>))
        .route("/cmd/:a", get(path_cmd1::<S>))
        .fallback(not_found)
        .with_state(gateway);

    if config.cors_permissive {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

/// Start the web server with shared state
///
/// This function runs until the server is shut down.
pub async fn run_server_with_state<S: GatewayProvider>(
    gateway: Arc<S>,
    config: WebServerConfig,
) -> Result<(), GatewayError> {
    let router = build_router(gateway, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "HTTP intake listening");

    axum::serve(listener, router).await?;
    Ok(())
}
