//! Loopback command channel for testing.
//!
//! An in-memory [`CommandApi`] with the same semantics as the real
//! server: server-assigned ids, wholesale field updates, `NotFound` for
//! missing tasks. Every call is recorded so tests can assert that a code
//! path issued (or, for rejected moves, did not issue) outbound
//! requests, and the next call can be scripted to fail.

use parking_lot::Mutex;

use boardsync_proto::api::{CreateTaskRequest, UpdateTaskRequest};
use boardsync_proto::chat::ChatMessage;
use boardsync_proto::chat::Sender;
use boardsync_proto::task::{Assignee, Task, TaskId, TaskStatus};

use super::{ApiError, CommandApi};

/// One recorded outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    /// `list_tasks(project_id)`
    ListTasks(String),
    /// `create_task(project_id)`
    CreateTask(String),
    /// `update_task(task_id)`
    UpdateTask(TaskId),
    /// `move_task(task_id, status)`
    MoveTask(TaskId, TaskStatus),
    /// `delete_task(task_id)`
    DeleteTask(TaskId),
    /// `list_messages(team_id)`
    ListMessages(String),
    /// `send_message(team_id)`
    SendMessage(String),
}

#[derive(Default)]
struct Inner {
    tasks: Vec<Task>,
    messages: Vec<ChatMessage>,
    next_id: u64,
    requests: Vec<Recorded>,
    fail_next: Option<ApiError>,
}

/// In-process [`CommandApi`] implementation backed by a mutex-guarded map.
#[derive(Default)]
pub struct LoopbackApi {
    inner: Mutex<Inner>,
}

impl LoopbackApi {
    /// Creates an empty loopback API.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a task directly, bypassing request recording.
    pub fn seed_task(&self, task: Task) {
        self.inner.lock().tasks.push(task);
    }

    /// Scripts the next call to fail with `err` instead of executing.
    pub fn fail_next(&self, err: ApiError) {
        self.inner.lock().fail_next = Some(err);
    }

    /// All requests recorded so far, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<Recorded> {
        self.inner.lock().requests.clone()
    }

    /// Number of outbound requests recorded so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.inner.lock().requests.len()
    }

    fn begin(&self, record: Recorded) -> Result<(), ApiError> {
        let mut inner = self.inner.lock();
        inner.requests.push(record);
        match inner.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl CommandApi for LoopbackApi {
    async fn list_tasks(&self, _team_id: &str, project_id: &str) -> Result<Vec<Task>, ApiError> {
        self.begin(Recorded::ListTasks(project_id.to_string()))?;
        let inner = self.inner.lock();
        Ok(inner
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_task(
        &self,
        _team_id: &str,
        project_id: &str,
        fields: CreateTaskRequest,
    ) -> Result<Task, ApiError> {
        self.begin(Recorded::CreateTask(project_id.to_string()))?;
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let position = i64::try_from(inner.tasks.len()).unwrap_or(i64::MAX);
        let task = Task {
            id: TaskId::new(format!("task-{}", inner.next_id)),
            title: fields.title,
            description: fields.description,
            status: TaskStatus::Todo,
            position,
            project_id: project_id.to_string(),
            assigned_to: fields.assigned_to.map(|id| Assignee {
                id,
                name: None,
                email: None,
            }),
            created_at: chrono::Utc::now(),
        };
        inner.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(
        &self,
        _team_id: &str,
        task_id: &TaskId,
        fields: UpdateTaskRequest,
    ) -> Result<Task, ApiError> {
        self.begin(Recorded::UpdateTask(task_id.clone()))?;
        let mut inner = self.inner.lock();
        let task = inner
            .tasks
            .iter_mut()
            .find(|t| t.id == *task_id)
            .ok_or_else(|| ApiError::NotFound(task_id.to_string()))?;
        if let Some(title) = fields.title {
            task.title = title;
        }
        if let Some(description) = fields.description {
            task.description = Some(description);
        }
        if let Some(assignee) = fields.assigned_to {
            task.assigned_to = Some(Assignee {
                id: assignee,
                name: None,
                email: None,
            });
        }
        Ok(task.clone())
    }

    async fn move_task(
        &self,
        _team_id: &str,
        task_id: &TaskId,
        status: TaskStatus,
    ) -> Result<Task, ApiError> {
        self.begin(Recorded::MoveTask(task_id.clone(), status))?;
        let mut inner = self.inner.lock();
        let task = inner
            .tasks
            .iter_mut()
            .find(|t| t.id == *task_id)
            .ok_or_else(|| ApiError::NotFound(task_id.to_string()))?;
        task.status = status;
        Ok(task.clone())
    }

    async fn delete_task(&self, _team_id: &str, task_id: &TaskId) -> Result<(), ApiError> {
        self.begin(Recorded::DeleteTask(task_id.clone()))?;
        let mut inner = self.inner.lock();
        let before = inner.tasks.len();
        inner.tasks.retain(|t| t.id != *task_id);
        if inner.tasks.len() == before {
            return Err(ApiError::NotFound(task_id.to_string()));
        }
        Ok(())
    }

    async fn list_messages(&self, team_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        self.begin(Recorded::ListMessages(team_id.to_string()))?;
        let inner = self.inner.lock();
        Ok(inner
            .messages
            .iter()
            .filter(|m| m.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn send_message(&self, team_id: &str, content: &str) -> Result<ChatMessage, ApiError> {
        self.begin(Recorded::SendMessage(team_id.to_string()))?;
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let message = ChatMessage {
            id: format!("msg-{}", inner.next_id),
            team_id: team_id.to_string(),
            sender: Sender {
                id: "loopback".to_string(),
                name: None,
                email: None,
            },
            content: content.to_string(),
            created_at: chrono::Utc::now(),
        };
        inner.messages.push(message.clone());
        Ok(message)
    }
}
