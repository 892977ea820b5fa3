//! Signaling WebSocket endpoint.
//!
//! Each connection is handled by one task: the relay session is opened
//! (registering an identifier), the welcome envelope is written before
//! anything else, and the loop then multiplexes inbound client
//! messages with envelopes forwarded from other connections. Errors on
//! one connection never propagate past its own task.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use beacon_signal::RelaySession;

use super::super::AppState;

/// Create the WebSocket router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/signal", get(signal_handler))
        .with_state(state)
}

/// GET /signal
///
/// WebSocket endpoint for the rendezvous relay. Upgrades the HTTP
/// connection and hands the socket to the per-connection handler.
async fn signal_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    debug!("Signal WebSocket connection request");

    ws.on_upgrade(move |socket| handle_signal_socket(socket, state))
}

/// Handle a single relay connection.
async fn handle_signal_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (tx, mut rx) = mpsc::channel(state.channel_capacity);
    let (mut session, welcome) = RelaySession::open(Arc::clone(&state.registry), tx);

    // The welcome envelope goes out before anything else; if it cannot
    // be delivered the connection is torn down before activation.
    let welcome_text = match welcome.to_json() {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, "Failed to serialize welcome envelope");
            session.close();
            return;
        }
    };
    if let Err(e) = sender.send(Message::Text(welcome_text)).await {
        warn!(error = %e, "Failed to send welcome envelope");
        session.close();
        return;
    }
    session.activate();

    loop {
        tokio::select! {
            // Envelopes forwarded to this connection by other handlers.
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                if let Err(e) = sender.send(Message::Text(frame.text)).await {
                    warn!(error = %e, "Failed to deliver forwarded envelope");
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        // The only direct reply is the delivery-failure
                        // error envelope; forwards go via the registry.
                        if let Some(reply) = session.handle_text(&text).await {
                            let text = match reply.to_json() {
                                Ok(text) => text,
                                Err(e) => {
                                    error!(error = %e, "Failed to serialize error envelope");
                                    continue;
                                }
                            };
                            if let Err(e) = sender.send(Message::Text(text)).await {
                                warn!(error = %e, "Failed to send error envelope");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        warn!("Received binary WebSocket message (not supported)");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            warn!(error = %e, "Failed to send pong");
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        // Ignore pongs
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!("WebSocket close requested");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    session.close();
}
