//! # Client Fan-out Gateway Module
//!
//! The web boundary of the bridge: serves the viewer page, a health check,
//! and the WebSocket endpoint that replays the journal to every newly
//! connected viewer and streams events from then on.
//!
//! ```text
//! gateway/
//! ├── frames.rs     - Wire frames exchanged with viewers
//! └── connection.rs - Per-viewer WebSocket loop
//! ```
//!
//! Each viewer gets its own bounded event queue from the journal; a stalled
//! viewer loses frames instead of stalling broker message processing.

pub mod connection;
pub mod frames;

use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::watch;

use crate::journal::MessageLog;
use crate::mqtt::ConnectionState;
use crate::relay::Relay;

/// Embedded viewer page; thin glue, kept out of the core.
const INDEX_HTML: &str = include_str!("index.html");

/// Shared state behind every gateway route
pub struct GatewayState {
    pub log: Arc<MessageLog>,
    pub relay: Arc<Relay>,
    pub connection: watch::Receiver<ConnectionState>,
}

/// Builds the gateway router.
pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/ws", get(connection::ws_upgrade))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check reflecting the broker connector state.
async fn health(State(state): State<Arc<GatewayState>>) -> Json<serde_json::Value> {
    let mqtt_connected = *state.connection.borrow() == ConnectionState::Connected;
    Json(health_payload(mqtt_connected))
}

fn health_payload(mqtt_connected: bool) -> serde_json::Value {
    serde_json::json!({
        "status": "ok",
        "mqtt_connected": mqtt_connected,
    })
}
