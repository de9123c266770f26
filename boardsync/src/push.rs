//! Typed subscription layer over the push connection.
//!
//! [`PushChannel`] turns raw [`ServerFrame`]s from the
//! [`crate::conn::ConnectionManager`] into typed events scoped to the
//! currently viewed project and team. Room scoping is primarily the
//! server's responsibility; the project/team check here is a redundant
//! client-side guard so that a stale frame racing a room switch can never
//! mutate the newly viewed board.

use boardsync_proto::chat::ChatMessage;
use boardsync_proto::push::ServerFrame;
use boardsync_proto::task::{Task, TaskId};

use crate::reconcile::Mutation;

/// A task-lifecycle event for the active project.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    /// Another client (or this one, rebroadcast) created a task.
    Created(Task),
    /// A task's fields changed.
    Updated(Task),
    /// A task changed status column.
    Moved(Task),
    /// A task was deleted.
    Deleted {
        /// Project the task belonged to.
        project_id: String,
        /// The deleted task.
        task_id: TaskId,
    },
}

impl TaskEvent {
    /// The store mutation this event reduces to.
    #[must_use]
    pub fn into_mutation(self) -> Mutation {
        match self {
            Self::Created(task) | Self::Updated(task) | Self::Moved(task) => {
                Mutation::Upsert(task)
            }
            Self::Deleted {
                project_id,
                task_id,
            } => Mutation::Remove {
                project_id,
                task_id,
            },
        }
    }
}

/// A push event that passed the active-scope filter.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// Task lifecycle event for the active project.
    Task(TaskEvent),
    /// Chat message for the active team.
    Chat(ChatMessage),
}

/// Filters raw frames against the active project and team.
#[derive(Debug, Default)]
pub struct PushChannel {
    /// Project whose board is currently viewed, if any.
    active_project: Option<String>,
    /// Team whose room is currently joined, if any.
    active_team: Option<String>,
}

impl PushChannel {
    /// Creates a channel with no active scope; everything is filtered
    /// until a project/team is set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the project whose task events should pass.
    pub fn set_active_project(&mut self, project_id: Option<String>) {
        self.active_project = project_id;
    }

    /// Sets the team whose chat events should pass.
    pub fn set_active_team(&mut self, team_id: Option<String>) {
        self.active_team = team_id;
    }

    /// The currently active project, if any.
    #[must_use]
    pub fn active_project(&self) -> Option<&str> {
        self.active_project.as_deref()
    }

    /// Converts a raw frame into a typed event, or drops it if it is not
    /// addressed to the active scope.
    #[must_use]
    pub fn filter(&self, frame: ServerFrame) -> Option<PushEvent> {
        match frame {
            ServerFrame::TaskCreated { task } => self.task_event(TaskEvent::Created(task)),
            ServerFrame::TaskUpdated { task } => self.task_event(TaskEvent::Updated(task)),
            ServerFrame::TaskMoved { task } => self.task_event(TaskEvent::Moved(task)),
            ServerFrame::TaskDeleted {
                task_id,
                project_id,
            } => self.task_event(TaskEvent::Deleted {
                project_id,
                task_id,
            }),
            ServerFrame::NewMessage { message } => {
                if self.active_team.as_deref() == Some(message.team_id.as_str()) {
                    Some(PushEvent::Chat(message))
                } else {
                    tracing::debug!(team_id = %message.team_id, "chat push for inactive team, dropping");
                    None
                }
            }
        }
    }

    fn task_event(&self, event: TaskEvent) -> Option<PushEvent> {
        let project_id = match &event {
            TaskEvent::Created(t) | TaskEvent::Updated(t) | TaskEvent::Moved(t) => &t.project_id,
            TaskEvent::Deleted { project_id, .. } => project_id,
        };
        if self.active_project.as_deref() == Some(project_id.as_str()) {
            Some(PushEvent::Task(event))
        } else {
            tracing::debug!(%project_id, "task push for inactive project, dropping");
            None
        }
    }
}
