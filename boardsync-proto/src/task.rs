//! Task model shared by the client, the push channel, and the server.
//!
//! Field names serialize in camelCase to match the JSON the dashboard
//! server speaks. A task belongs to exactly one project and exactly one
//! status column at any instant; its `id` is assigned by the server and
//! never changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique, server-assigned identifier for a task.
///
/// Opaque to the client: it is never parsed, only compared and echoed
/// back in command and push payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    /// Creates a task identifier from its string representation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation of this task ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status column a task sits in on the board.
///
/// Transitions are unordered: any column is reachable from any other,
/// subject to permission. This is not a workflow state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Not started.
    Todo,
    /// Actively being worked on.
    InProgress,
    /// Completed.
    Done,
}

impl TaskStatus {
    /// All columns, in board display order.
    pub const ALL: [Self; 3] = [Self::Todo, Self::InProgress, Self::Done];

    /// Human-readable column label for display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Todo => write!(f, "todo"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Assignment reference with a display snapshot.
///
/// The server populates `name` and `email` from the assigned user at
/// write time; the client uses `id` (with `email` as a fallback) to
/// decide whether the current user may move the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    /// User identifier of the assignee.
    pub id: String,
    /// Display name snapshot, if the server has one.
    #[serde(default)]
    pub name: Option<String>,
    /// Email snapshot, used as a matching fallback.
    #[serde(default)]
    pub email: Option<String>,
}

/// A task on a project board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique, immutable, server-assigned identifier.
    pub id: TaskId,
    /// Task title.
    pub title: String,
    /// Optional free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Status column the task currently sits in.
    pub status: TaskStatus,
    /// Ordering key within a column.
    pub position: i64,
    /// Project this task belongs to.
    pub project_id: String,
    /// Current assignment, if any.
    #[serde(default)]
    pub assigned_to: Option<Assignee>,
    /// When the task was created, per the server's clock.
    pub created_at: DateTime<Utc>,
}
