//! Push-channel frames.
//!
//! The push channel is a persistent WebSocket carrying JSON text frames
//! of the shape `{"event": "...", "data": {...}}`. Clients send room
//! control frames ([`ClientFrame`]); the server sends task-lifecycle and
//! chat notifications ([`ServerFrame`]) to every connection joined to the
//! addressed team room — including the connection whose own command
//! caused the change, which is why the client must reconcile
//! idempotently.

use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;
use crate::task::{Task, TaskId};

/// Errors from encoding or decoding push frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame could not be serialized to JSON.
    #[error("frame encode error: {0}")]
    Encode(#[source] serde_json::Error),

    /// The frame could not be parsed, or named an unknown event.
    #[error("frame decode error: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Control frames sent by the client to manage room membership.
///
/// A room is the server-side scope (a team) that push events are
/// addressed to. Membership is per connection and is lost with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    /// Join the team's room; subsequent events for the team are delivered.
    #[serde(rename = "join-room")]
    JoinRoom {
        /// Team whose room to join.
        team_id: String,
    },
    /// Leave the team's room.
    #[serde(rename = "leave-room")]
    LeaveRoom {
        /// Team whose room to leave.
        team_id: String,
    },
}

/// Notification frames pushed by the server to room members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    /// A task was created in a project belonging to the room's team.
    #[serde(rename = "task:created")]
    TaskCreated {
        /// The created task, as the server stored it.
        task: Task,
    },
    /// A task's fields were updated.
    #[serde(rename = "task:updated")]
    TaskUpdated {
        /// The full updated task (wholesale, no field-level delta).
        task: Task,
    },
    /// A task was moved to another status column.
    #[serde(rename = "task:moved")]
    TaskMoved {
        /// The full moved task.
        task: Task,
    },
    /// A task was deleted.
    #[serde(rename = "task:deleted")]
    TaskDeleted {
        /// Identifier of the deleted task.
        task_id: TaskId,
        /// Project the task belonged to.
        project_id: String,
    },
    /// A chat message was posted to the team's feed.
    #[serde(rename = "chat:new-message")]
    NewMessage {
        /// The posted message.
        message: ChatMessage,
    },
}

/// Encodes a [`ClientFrame`] as a JSON text frame.
///
/// # Errors
///
/// Returns [`FrameError::Encode`] if serialization fails.
pub fn encode_client(frame: &ClientFrame) -> Result<String, FrameError> {
    serde_json::to_string(frame).map_err(FrameError::Encode)
}

/// Decodes a [`ClientFrame`] from a JSON text frame.
///
/// # Errors
///
/// Returns [`FrameError::Decode`] on malformed JSON or an unknown event.
pub fn decode_client(text: &str) -> Result<ClientFrame, FrameError> {
    serde_json::from_str(text).map_err(FrameError::Decode)
}

/// Encodes a [`ServerFrame`] as a JSON text frame.
///
/// # Errors
///
/// Returns [`FrameError::Encode`] if serialization fails.
pub fn encode_server(frame: &ServerFrame) -> Result<String, FrameError> {
    serde_json::to_string(frame).map_err(FrameError::Encode)
}

/// Decodes a [`ServerFrame`] from a JSON text frame.
///
/// # Errors
///
/// Returns [`FrameError::Decode`] on malformed JSON or an unknown event.
pub fn decode_server(text: &str) -> Result<ServerFrame, FrameError> {
    serde_json::from_str(text).map_err(FrameError::Decode)
}
