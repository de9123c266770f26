//! Client-side move validation.
//!
//! Gates drag-and-drop moves before any network call: dropping a task
//! where it already sits is a no-op, and only the task's assignee may
//! change its status. The check is advisory — it exists to avoid a round
//! trip the server would reject anyway. The server re-checks assignment
//! authoritatively on every move command, because nothing stops a client
//! from skipping this gate.

use boardsync_proto::task::{Task, TaskStatus};

use crate::session::Identity;

/// Where a dragged task was picked up or dropped: column plus index
/// within the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropSlot {
    /// The status column.
    pub status: TaskStatus,
    /// Position within the column.
    pub index: usize,
}

/// Outcome of validating a move before issuing the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDecision {
    /// Destination equals source; nothing to do, no command issued.
    NoChange,
    /// The current user is the assignee; issue the move command.
    Allowed,
    /// The task is assigned to someone else (or nobody); no command is
    /// issued and the UI surfaces a permission warning instead.
    NotAssignee,
}

/// Decides whether a drag of `task` from `source` to `dest` by `who`
/// should become a move command.
#[must_use]
pub fn validate_move(
    task: &Task,
    who: &Identity,
    source: DropSlot,
    dest: DropSlot,
) -> MoveDecision {
    if source == dest {
        return MoveDecision::NoChange;
    }
    match &task.assigned_to {
        Some(assignee) if who.matches(assignee) => MoveDecision::Allowed,
        _ => MoveDecision::NotAssignee,
    }
}
