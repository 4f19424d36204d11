//! Sensor ingest over WebSocket.
//!
//! Any path upgrades to a WebSocket. The server greets each client, then
//! treats every text or binary frame as a raw sensor payload. There is no
//! acknowledgement: invalid payloads are logged and dropped while the
//! connection stays open.

use super::RelayState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;

/// First frame sent to every sensor client.
pub const GREETING: &str = "hello from ws-server";

/// Router accepting WebSocket upgrades on every path.
pub fn router(state: Arc<RelayState>) -> Router {
    Router::new().fallback(ws_handler).with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<Arc<RelayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, remote, state))
}

/// Decode a frame into a sensor payload.
///
/// Returns `None` for control frames. Binary frames are read as UTF-8,
/// replacing invalid sequences.
fn frame_payload(msg: Message) -> Option<String> {
    match msg {
        Message::Text(text) => Some(text),
        Message::Binary(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) => None,
    }
}

async fn handle_socket(mut socket: WebSocket, remote: SocketAddr, state: Arc<RelayState>) {
    state.stats().record_connection();
    tracing::info!("Sensor client connected: {}", remote);

    if socket.send(Message::Text(GREETING.to_string())).await.is_err() {
        tracing::debug!("Sensor client {} left before greeting", remote);
        return;
    }

    let shutdown = state.shutdown_signal();

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        tracing::debug!("Sensor client {} read error: {}", remote, e);
                        break;
                    }
                    None => break,
                };
                if matches!(msg, Message::Close(_)) {
                    break;
                }
                if let Some(payload) = frame_payload(msg) {
                    tracing::debug!("Message from {}: {:?}", remote, payload);
                    // Rejections are already logged by the state.
                    let _ = state.ingest(&payload);
                }
            }
            _ = super::wait_for_shutdown(shutdown.clone()) => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        }
    }

    tracing::info!("Sensor client disconnected: {}", remote);
}
