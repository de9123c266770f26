//! Request and error payloads for the command (request/response) channel.
//!
//! The command channel is plain HTTP+JSON: one request, one reply.
//! Successful create/update/move replies carry the authoritative
//! [`crate::task::Task`]; delete replies carry no payload. Failures carry
//! an [`ErrorBody`].

use serde::{Deserialize, Serialize};

use crate::task::TaskStatus;

/// Payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Task title. Must be non-empty; the server rejects blank titles.
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional assignee user id.
    #[serde(default)]
    pub assigned_to: Option<String>,
}

/// Payload for updating a task's fields.
///
/// Only the fields present are changed; `None` means "leave unchanged".
/// Status changes go through [`MoveTaskRequest`] instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    /// New title, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New assignee user id, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

/// Payload for moving a task to another status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveTaskRequest {
    /// Destination column.
    pub status: TaskStatus,
}

/// Payload for posting a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Message body.
    pub content: String,
}

/// Error body returned by the server on command failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable reason.
    pub error: String,
}
