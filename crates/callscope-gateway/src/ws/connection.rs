use axum::{
    extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use callscope_core::config::OUTBOUND_QUEUE_CAPACITY;
use callscope_registry::ConnectionId;

use crate::app::AppState;

/// Axum handler — upgrades HTTP to WebSocket at GET /ws.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| run_connection(socket, state))
}

/// Per-connection loop — lives for the entire viewer session.
///
/// Viewers are consumers only: inbound frames are ignored apart from
/// ping/close. Delivered events arrive on the outbound queue the dispatcher
/// pushes into and are pumped onto the socket here.
async fn run_connection(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = ConnectionId::new(uuid::Uuid::new_v4().to_string());
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE_CAPACITY);

    if let Err(e) = state.lifecycle.on_connect(&conn_id, outbound_tx) {
        warn!(conn_id = %conn_id, error = %e, "connection rejected: registry add failed");
        return;
    }
    info!(conn_id = %conn_id, "new viewer connection");

    let (mut tx, mut rx) = socket.split();

    loop {
        tokio::select! {
            delivery = outbound_rx.recv() => {
                match delivery {
                    Some(payload) => {
                        if tx.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    // Lifecycle dropped the sender — the connection is done.
                    None => break,
                }
            }

            msg = rx.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        let _ = tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Viewers have nothing to say; drop anything else.
                    _ => {}
                }
            }
        }
    }

    state.lifecycle.on_disconnect(&conn_id);
    info!(conn_id = %conn_id, "viewer connection closed");
}
