//! Per-viewer WebSocket loop.
//!
//! On upgrade the viewer gets the current journal replayed entry by entry,
//! then a live subscription. Requests from the viewer run inline; anything
//! that fails turns into an error frame on the same connection rather than
//! tearing it down.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::StreamExt;
use futures::SinkExt;
use tracing::{debug, info, warn};

use crate::journal::LogEvent;

use super::frames::{ClientRequest, ServerFrame};
use super::GatewayState;

/// Upgrades `/ws` requests into a viewer connection.
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Runs one viewer connection to completion.
async fn handle_socket(socket: WebSocket, state: Arc<GatewayState>) {
    info!("Web client connected");
    let (mut sink, mut stream) = socket.split();

    // Replay history, then go live. Snapshot and subscription are taken
    // under one lock, so the viewer sees every entry exactly once.
    let (subscriber, mut events, history) = state.log.subscribe_with_snapshot();
    for entry in history {
        if send_frame(&mut sink, &ServerFrame::NewMessage(entry))
            .await
            .is_err()
        {
            state.log.unsubscribe(subscriber);
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let frame = match event {
                    Some(LogEvent::Entry(entry)) => ServerFrame::NewMessage(entry),
                    Some(LogEvent::Cleared) => ServerFrame::MessagesCleared,
                    // Sender side gone; the log pruned this subscriber
                    None => break,
                };
                if send_frame(&mut sink, &frame).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_request(&state, text.as_str()).await {
                            if send_frame(&mut sink, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong handled by axum
                    Some(Err(e)) => {
                        debug!("Viewer socket error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    state.log.unsubscribe(subscriber);
    info!("Web client disconnected");
}

/// Handles one request text frame; returns a reply frame when one is due.
async fn handle_request(state: &GatewayState, text: &str) -> Option<ServerFrame> {
    let request: ClientRequest = match serde_json::from_str(text) {
        Ok(request) => request,
        Err(e) => {
            debug!("Unparseable viewer request: {}", e);
            return Some(ServerFrame::error("Unrecognized request"));
        }
    };
    answer_request(state, request).await
}

/// Executes a parsed viewer request.
///
/// Missing or empty send fields are rejected before the relay is invoked;
/// relay failures come back as error frames for this viewer only.
async fn answer_request(state: &GatewayState, request: ClientRequest) -> Option<ServerFrame> {
    match request {
        ClientRequest::SendMessage { device_id, message } => {
            if device_id.is_empty() || message.is_empty() {
                return Some(ServerFrame::error("Device ID and message are required"));
            }
            match state.relay.send(&device_id, &message).await {
                Ok(()) => None,
                Err(e) => Some(ServerFrame::error(e.to_string())),
            }
        }
        ClientRequest::ClearMessages => {
            // The Cleared event fans out to every viewer, this one included.
            state.log.clear();
            None
        }
    }
}

async fn send_frame(
    sink: &mut (impl futures::Sink<Message, Error = axum::Error> + Unpin),
    frame: &ServerFrame,
) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize frame: {}", e);
            return Ok(());
        }
    };
    sink.send(Message::Text(json.into())).await.map_err(|e| {
        debug!("Viewer send failed: {}", e);
    })
}
