//! Team room membership and push fan-out.
//!
//! Each push connection is a client in zero or more team rooms. A room
//! is just the set of live connections interested in one team; when a
//! mutation is accepted over HTTP, the owning team's room receives the
//! corresponding frame. Broadcast includes the originating client — the
//! server does not know (or care) which connection belongs to which HTTP
//! caller, and the client side deduplicates by task id anyway.

use std::collections::HashMap;

use axum::extract::ws::Message;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use boardsync_proto::push::{self, ServerFrame};

/// Identifier for one push connection.
pub type ClientId = Uuid;

/// Registry of team rooms and their member connections.
#[derive(Default)]
pub struct RoomHub {
    /// Team id to member connections.
    rooms: RwLock<HashMap<String, HashMap<ClientId, mpsc::UnboundedSender<Message>>>>,
}

impl RoomHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a team's room. Joining a room the client is
    /// already in replaces its sender, which is harmless.
    pub async fn join(&self, team_id: &str, client: ClientId, sender: mpsc::UnboundedSender<Message>) {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(team_id.to_string())
            .or_default()
            .insert(client, sender);
        tracing::debug!(%team_id, %client, "client joined room");
    }

    /// Removes a connection from a team's room. Leaving a room the
    /// client is not in is a no-op.
    pub async fn leave(&self, team_id: &str, client: ClientId) {
        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(team_id) {
            members.remove(&client);
            if members.is_empty() {
                rooms.remove(team_id);
            }
        }
        tracing::debug!(%team_id, %client, "client left room");
    }

    /// Removes a connection from every room it joined (disconnect).
    pub async fn leave_all(&self, client: ClientId) {
        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, members| {
            members.remove(&client);
            !members.is_empty()
        });
    }

    /// Number of connections currently in a team's room.
    pub async fn member_count(&self, team_id: &str) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(team_id).map_or(0, HashMap::len)
    }

    /// Sends a frame to every member of a team's room.
    ///
    /// An empty or missing room is fine; send failures mean the member's
    /// writer task already exited and are ignored (disconnect cleanup
    /// removes the entry).
    pub async fn broadcast(&self, team_id: &str, frame: &ServerFrame) {
        let text = match push::encode_server(frame) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(err = %e, "failed to encode push frame");
                return;
            }
        };
        let rooms = self.rooms.read().await;
        let Some(members) = rooms.get(team_id) else {
            return;
        };
        tracing::debug!(%team_id, members = members.len(), "broadcasting push frame");
        for sender in members.values() {
            let _ = sender.send(Message::Text(text.clone().into()));
        }
    }
}
