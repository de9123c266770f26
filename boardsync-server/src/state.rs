//! In-memory application state: users, tasks, and chat messages.
//!
//! State is ephemeral, lost on restart. Task ids and message ids are
//! UUIDv7, assigned at write time; within a project, the task list is
//! kept newest-first, which is the order `GET .../tasks` returns.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use boardsync_proto::api::{CreateTaskRequest, UpdateTaskRequest};
use boardsync_proto::chat::{ChatMessage, Sender};
use boardsync_proto::task::{Assignee, Task, TaskId, TaskStatus};

use crate::rooms::RoomHub;

/// Role attached to an authenticated account, controlling which task
/// operations the server accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Full control over tasks.
    Admin,
    /// May create tasks but not delete them.
    Manager,
    /// May only work with tasks assigned to them.
    Member,
}

impl Role {
    /// Whether this role may create tasks.
    #[must_use]
    pub const fn can_create_task(self) -> bool {
        matches!(self, Self::Admin | Self::Manager)
    }

    /// Whether this role may delete tasks.
    #[must_use]
    pub const fn can_delete_task(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// An account known to the server, resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// User identifier.
    pub id: String,
    /// Display name.
    pub name: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Authorization role.
    pub role: Role,
}

impl Account {
    /// Whether this account is the task's assignee.
    ///
    /// Matches by user id, falling back to email when both sides carry
    /// one. An unassigned task matches nobody.
    #[must_use]
    pub fn is_assignee(&self, task: &Task) -> bool {
        let Some(assignee) = &task.assigned_to else {
            return false;
        };
        if assignee.id == self.id {
            return true;
        }
        matches!(
            (&assignee.email, &self.email),
            (Some(a), Some(b)) if a == b
        )
    }
}

/// Failures from task write operations.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The addressed task does not exist.
    #[error("task not found")]
    NotFound,
    /// The caller may not change this task's status.
    #[error("You can't update the status of a task assigned to another user")]
    NotAssignee,
    /// The caller's role does not permit the operation.
    #[error("your role does not permit this operation")]
    RoleDenied,
    /// The payload failed validation.
    #[error("{0}")]
    Invalid(String),
}

#[derive(Default)]
struct Db {
    /// Bearer token to account.
    accounts: HashMap<String, Account>,
    /// Per-project task lists, newest first.
    tasks: HashMap<String, Vec<Task>>,
    /// Per-team chat logs, oldest first.
    messages: HashMap<String, Vec<ChatMessage>>,
}

/// Shared server state: the in-memory database plus the push room hub.
#[derive(Default)]
pub struct AppState {
    db: RwLock<Db>,
    /// Team rooms for push fan-out.
    pub rooms: RoomHub,
}

impl AppState {
    /// Creates empty state with no accounts, tasks, or messages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account under a bearer token. Replaces any existing
    /// binding for that token.
    pub async fn add_account(&self, token: &str, account: Account) {
        let mut db = self.db.write().await;
        db.accounts.insert(token.to_string(), account);
    }

    /// Resolves a bearer token to its account.
    pub async fn authenticate(&self, token: &str) -> Option<Account> {
        let db = self.db.read().await;
        db.accounts.get(token).cloned()
    }

    /// Inserts a task directly, for seeding test fixtures.
    pub async fn seed_task(&self, task: Task) {
        let mut db = self.db.write().await;
        db.tasks
            .entry(task.project_id.clone())
            .or_default()
            .insert(0, task);
    }

    /// All tasks in a project, newest first.
    pub async fn list_tasks(&self, project_id: &str) -> Vec<Task> {
        let db = self.db.read().await;
        db.tasks.get(project_id).cloned().unwrap_or_default()
    }

    /// Creates a task in a project.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::RoleDenied`] if the account may not create
    /// tasks, or [`WriteError::Invalid`] for a blank title.
    pub async fn create_task(
        &self,
        project_id: &str,
        req: CreateTaskRequest,
        by: &Account,
    ) -> Result<Task, WriteError> {
        if !by.role.can_create_task() {
            return Err(WriteError::RoleDenied);
        }
        if req.title.trim().is_empty() {
            return Err(WriteError::Invalid("title must not be empty".to_string()));
        }

        let mut db = self.db.write().await;
        let assigned_to = req.assigned_to.map(|id| resolve_assignee(&db, &id));
        let task = Task {
            id: TaskId::new(Uuid::now_v7().to_string()),
            title: req.title,
            description: req.description,
            status: TaskStatus::Todo,
            position: 0,
            project_id: project_id.to_string(),
            assigned_to,
            created_at: Utc::now(),
        };
        db.tasks
            .entry(project_id.to_string())
            .or_default()
            .insert(0, task.clone());
        Ok(task)
    }

    /// Applies a field update to a task, leaving absent fields unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::NotFound`] if no task has the given id.
    pub async fn update_task(
        &self,
        task_id: &TaskId,
        req: UpdateTaskRequest,
    ) -> Result<Task, WriteError> {
        let mut db = self.db.write().await;
        let assigned_to = req.assigned_to.map(|id| resolve_assignee(&db, &id));
        let task = find_task_mut(&mut db, task_id).ok_or(WriteError::NotFound)?;
        if let Some(title) = req.title {
            task.title = title;
        }
        if let Some(description) = req.description {
            task.description = Some(description);
        }
        if let Some(assignee) = assigned_to {
            task.assigned_to = Some(assignee);
        }
        Ok(task.clone())
    }

    /// Moves a task to another status column.
    ///
    /// The assignment rule is authoritative here, whatever the client
    /// checked: an assigned task may only be moved by its assignee.
    /// Unassigned tasks may be moved by anyone.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::NotFound`] or [`WriteError::NotAssignee`].
    pub async fn move_task(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
        by: &Account,
    ) -> Result<Task, WriteError> {
        let mut db = self.db.write().await;
        let task = find_task_mut(&mut db, task_id).ok_or(WriteError::NotFound)?;
        if task.assigned_to.is_some() && !by.is_assignee(task) {
            return Err(WriteError::NotAssignee);
        }
        task.status = status;
        Ok(task.clone())
    }

    /// Deletes a task, returning it so the caller can announce which
    /// project it belonged to.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::RoleDenied`] if the account may not delete
    /// tasks, or [`WriteError::NotFound`].
    pub async fn delete_task(&self, task_id: &TaskId, by: &Account) -> Result<Task, WriteError> {
        if !by.role.can_delete_task() {
            return Err(WriteError::RoleDenied);
        }
        let mut db = self.db.write().await;
        for tasks in db.tasks.values_mut() {
            if let Some(index) = tasks.iter().position(|t| t.id == *task_id) {
                return Ok(tasks.remove(index));
            }
        }
        Err(WriteError::NotFound)
    }

    /// A team's chat log, oldest first.
    pub async fn list_messages(&self, team_id: &str) -> Vec<ChatMessage> {
        let db = self.db.read().await;
        db.messages.get(team_id).cloned().unwrap_or_default()
    }

    /// Appends a chat message to a team's log.
    pub async fn append_message(
        &self,
        team_id: &str,
        by: &Account,
        content: String,
    ) -> ChatMessage {
        let message = ChatMessage {
            id: Uuid::now_v7().to_string(),
            team_id: team_id.to_string(),
            sender: Sender {
                id: by.id.clone(),
                name: by.name.clone(),
                email: by.email.clone(),
            },
            content,
            created_at: Utc::now(),
        };
        let mut db = self.db.write().await;
        db.messages
            .entry(team_id.to_string())
            .or_default()
            .push(message.clone());
        message
    }
}

/// Builds an assignee snapshot for a user id, filling name and email
/// from the account directory when the user is known.
fn resolve_assignee(db: &Db, user_id: &str) -> Assignee {
    db.accounts
        .values()
        .find(|a| a.id == user_id)
        .map_or_else(
            || Assignee {
                id: user_id.to_string(),
                name: None,
                email: None,
            },
            |account| Assignee {
                id: account.id.clone(),
                name: account.name.clone(),
                email: account.email.clone(),
            },
        )
}

fn find_task_mut<'a>(db: &'a mut Db, task_id: &TaskId) -> Option<&'a mut Task> {
    db.tasks
        .values_mut()
        .flat_map(|tasks| tasks.iter_mut())
        .find(|t| t.id == *task_id)
}
