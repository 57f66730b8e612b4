//! WebSocket connection handler (`/parties/{party}/{room}`).

use std::sync::Arc;

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{domain::RoomName, ui::state::AppState};

/// The only party served by this relay
pub const PARTY: &str = "chat";

pub async fn websocket_handler(
    Path((party, room)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if party != PARTY {
        tracing::warn!("Rejecting connection to unknown party '{}'", party);
        return StatusCode::NOT_FOUND.into_response();
    }

    let room_name = match RoomName::new(room) {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!("Rejecting connection: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state, room_name)),
        Err(rejection) => rejection.into_response(),
    }
}

/// Spawns a task that forwards frames queued for this connection to its socket.
///
/// Room Servers push into the `rx` side through `MessagePusher`; this task is
/// the only writer of the socket.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, room_name: RoomName) {
    let (sender, mut receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();

    // Registers the connection and queues the presence snapshot for it
    let (room, connection) = state.router.connect(room_name, tx).await;

    let recv_room = room.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    recv_room.on_error(&connection, &e.to_string()).await;
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    recv_room.on_message(&connection, text.as_str()).await;
                }
                Message::Binary(_) => {
                    recv_room.on_binary(&connection).await;
                }
                Message::Close(_) => {
                    tracing::debug!("Connection '{}' requested close", connection);
                    break;
                }
                // Ping/pong is answered by the WebSocket layer
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    });

    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // No-op when the error path already detached the connection
    room.on_close(&connection).await;
}
