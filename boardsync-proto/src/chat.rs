//! Chat message types for the team message feed.
//!
//! The chat feed is the simpler sibling of the task board: the same push
//! pattern, scoped by team instead of project, with an append-only
//! message list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sender reference with a display snapshot, mirroring [`crate::task::Assignee`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    /// User identifier of the sender.
    pub id: String,
    /// Display name snapshot.
    #[serde(default)]
    pub name: Option<String>,
    /// Email snapshot.
    #[serde(default)]
    pub email: Option<String>,
}

/// A chat message in a team's feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique, server-assigned message identifier.
    pub id: String,
    /// Team whose feed this message belongs to.
    pub team_id: String,
    /// Who sent the message.
    pub sender: Sender,
    /// Message body.
    pub content: String,
    /// When the server accepted the message.
    pub created_at: DateTime<Utc>,
}
