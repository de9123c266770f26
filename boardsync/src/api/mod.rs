//! Command (request/response) channel to the authoritative server.
//!
//! Defines the [`CommandApi`] trait that command-channel implementations
//! must satisfy. Concrete implementations:
//! - [`http::HttpCommandClient`] — the real HTTP+JSON client
//! - [`loopback::LoopbackApi`] — in-process implementation for testing
//!
//! No implementation may mutate the task store directly; callers route
//! every result through the reconciler, which is the single point all
//! external mutations converge on.

pub mod http;
pub mod loopback;

use boardsync_proto::api::{CreateTaskRequest, UpdateTaskRequest};
use boardsync_proto::chat::ChatMessage;
use boardsync_proto::task::{Task, TaskId, TaskStatus};

/// Errors that can occur on the command channel.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a usable reply (network failure, 5xx).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server refused the command for this identity (403).
    ///
    /// Authoritative, independent of any client-side advisory check —
    /// the client check is bypassable, this one is not.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The addressed entity does not exist (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// The bearer credential was missing or rejected (401).
    #[error("unauthorized")]
    Unauthorized,

    /// The reply arrived but could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Async command channel: one request, one authoritative reply.
///
/// Create/update/move resolve with the entity as the server stored it;
/// delete resolves with no payload. Every failure is a typed
/// [`ApiError`] — nothing is silently retried at this layer.
pub trait CommandApi: Send + Sync {
    /// Fetch the full ordered task list for a project.
    fn list_tasks(
        &self,
        team_id: &str,
        project_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Task>, ApiError>> + Send;

    /// Create a task in a project. The server assigns the id.
    fn create_task(
        &self,
        team_id: &str,
        project_id: &str,
        fields: CreateTaskRequest,
    ) -> impl std::future::Future<Output = Result<Task, ApiError>> + Send;

    /// Update a task's fields (title, description, assignee).
    fn update_task(
        &self,
        team_id: &str,
        task_id: &TaskId,
        fields: UpdateTaskRequest,
    ) -> impl std::future::Future<Output = Result<Task, ApiError>> + Send;

    /// Move a task to another status column.
    ///
    /// The server re-checks assignment authoritatively and returns
    /// [`ApiError::PermissionDenied`] if the caller is not the assignee.
    fn move_task(
        &self,
        team_id: &str,
        task_id: &TaskId,
        status: TaskStatus,
    ) -> impl std::future::Future<Output = Result<Task, ApiError>> + Send;

    /// Delete a task. Deleting an already-deleted task is `NotFound`.
    fn delete_task(
        &self,
        team_id: &str,
        task_id: &TaskId,
    ) -> impl std::future::Future<Output = Result<(), ApiError>> + Send;

    /// Fetch the team's chat feed in server order.
    fn list_messages(
        &self,
        team_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, ApiError>> + Send;

    /// Post a message to the team's chat feed.
    fn send_message(
        &self,
        team_id: &str,
        content: &str,
    ) -> impl std::future::Future<Output = Result<ChatMessage, ApiError>> + Send;
}
