//! WebSocket push endpoint.
//!
//! Clients authenticate during the handshake with a `token` query
//! parameter, then drive room membership with `join-room` / `leave-room`
//! frames. The connection only ever receives server frames; it never
//! carries commands, which go over HTTP.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use boardsync_proto::push::{self, ClientFrame};

use crate::state::AppState;

/// axum handler for `GET /push`: authenticates the handshake and
/// upgrades to a WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let Some(token) = params.get("token") else {
        tracing::warn!("push handshake without token");
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let Some(account) = state.authenticate(token).await else {
        tracing::warn!("push handshake with unknown token");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    tracing::info!(user_id = %account.id, "push connection authenticated");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drives one push connection until it drops.
///
/// A writer task forwards broadcast frames from the room hub channel to
/// the socket; the reader loop handles room membership frames. On
/// disconnect the client leaves every room it joined.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let client: Uuid = Uuid::now_v7();
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let writer_client = client;
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                tracing::warn!(client = %writer_client, "push write failed");
                break;
            }
        }
    });

    let reader_state = Arc::clone(&state);
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Text(text) => match push::decode_client(&text) {
                    Ok(ClientFrame::JoinRoom { team_id }) => {
                        reader_state.rooms.join(&team_id, client, tx.clone()).await;
                    }
                    Ok(ClientFrame::LeaveRoom { team_id }) => {
                        reader_state.rooms.leave(&team_id, client).await;
                    }
                    Err(e) => {
                        tracing::warn!(client = %client, err = %e, "malformed client frame");
                    }
                },
                Message::Close(_) => {
                    tracing::info!(client = %client, "push connection closed by client");
                    break;
                }
                Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut read_task => write_task.abort(),
        _ = &mut write_task => read_task.abort(),
    }

    state.rooms.leave_all(client).await;
    tracing::info!(client = %client, "push connection cleaned up");
}
