//! HTTP server hosting the WebSocket relay endpoint.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use beacon_signal::ConnectionRegistry;
use serde_json::json;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

use crate::config::ServerConfig;

mod routes;

/// Server application state
pub struct AppState {
    /// Shared connection registry for envelope routing
    pub registry: Arc<ConnectionRegistry>,
    /// Per-connection outbound queue capacity
    pub channel_capacity: usize,
}

impl AppState {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
            channel_capacity,
        }
    }
}

/// Start the relay server.
pub async fn start(config: ServerConfig) -> Result<()> {
    let state = Arc::new(AppState::new(config.channel_capacity));

    let app = create_router(state);

    info!(addr = %config.bind, "Beacon relay listening");
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the Axum router with all routes and middleware
fn create_router(state: Arc<AppState>) -> Router {
    // The websocket router applies .with_state() itself, converting
    // Router<Arc<AppState>> to Router<()> so it can be merged here.
    let signal_router = routes::websocket::router(Arc::clone(&state));

    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
        .merge(signal_router)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// GET /health
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "beacon-server",
        "connections": state.registry.connection_count(),
    }))
}
