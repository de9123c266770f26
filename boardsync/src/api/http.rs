//! HTTP implementation of the [`CommandApi`] trait.
//!
//! Speaks the dashboard server's JSON API, addressed by team and
//! project/task identifiers in the path. The bearer credential is
//! attached to every request; the same credential authenticates the push
//! channel handshake.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use boardsync_proto::api::{
    CreateTaskRequest, ErrorBody, MoveTaskRequest, SendMessageRequest, UpdateTaskRequest,
};
use boardsync_proto::chat::ChatMessage;
use boardsync_proto::task::{Task, TaskId, TaskStatus};

use super::{ApiError, CommandApi};

/// HTTP+JSON command client backed by [`reqwest`].
#[derive(Debug, Clone)]
pub struct HttpCommandClient {
    /// Shared connection pool.
    http: reqwest::Client,
    /// Normalized base URL, without a trailing slash or `/api` suffix.
    base_url: String,
    /// Bearer credential for the `Authorization` header.
    token: String,
}

impl HttpCommandClient {
    /// Creates a client for the given server base URL and bearer token.
    ///
    /// The base URL is normalized: a trailing slash and a trailing `/api`
    /// segment are stripped so that configured URLs like
    /// `https://host/api/` do not produce doubled `/api/api/` paths.
    #[must_use]
    pub fn new(base_url: &str, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: normalize_base_url(base_url),
            token: token.into(),
        }
    }

    /// The normalized base URL this client addresses.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sends a request and decodes the JSON reply, mapping failures to
    /// the [`ApiError`] taxonomy.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()));
        }

        let reason = response
            .json::<ErrorBody>()
            .await
            .map_or_else(|_| status.to_string(), |body| body.error);
        Err(map_status(status, reason))
    }

    /// As [`execute`](Self::execute), for replies with no payload.
    async fn execute_empty(&self, request: reqwest::RequestBuilder) -> Result<(), ApiError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let reason = response
            .json::<ErrorBody>()
            .await
            .map_or_else(|_| status.to_string(), |body| body.error);
        Err(map_status(status, reason))
    }
}

impl CommandApi for HttpCommandClient {
    async fn list_tasks(&self, team_id: &str, project_id: &str) -> Result<Vec<Task>, ApiError> {
        let url = self.url(&format!("/api/tasks/{team_id}/projects/{project_id}/tasks"));
        self.execute(self.http.get(url)).await
    }

    async fn create_task(
        &self,
        team_id: &str,
        project_id: &str,
        fields: CreateTaskRequest,
    ) -> Result<Task, ApiError> {
        let url = self.url(&format!("/api/tasks/{team_id}/projects/{project_id}/tasks"));
        self.execute(self.http.post(url).json(&fields)).await
    }

    async fn update_task(
        &self,
        team_id: &str,
        task_id: &TaskId,
        fields: UpdateTaskRequest,
    ) -> Result<Task, ApiError> {
        let url = self.url(&format!("/api/tasks/{team_id}/tasks/{task_id}"));
        self.execute(self.http.put(url).json(&fields)).await
    }

    async fn move_task(
        &self,
        team_id: &str,
        task_id: &TaskId,
        status: TaskStatus,
    ) -> Result<Task, ApiError> {
        // Moves share the update route; the body carries only the
        // destination status.
        let url = self.url(&format!("/api/tasks/{team_id}/tasks/{task_id}"));
        self.execute(self.http.put(url).json(&MoveTaskRequest { status }))
            .await
    }

    async fn delete_task(&self, team_id: &str, task_id: &TaskId) -> Result<(), ApiError> {
        let url = self.url(&format!("/api/tasks/{team_id}/tasks/{task_id}"));
        self.execute_empty(self.http.delete(url)).await
    }

    async fn list_messages(&self, team_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        let url = self.url(&format!("/api/messages/{team_id}"));
        self.execute(self.http.get(url)).await
    }

    async fn send_message(&self, team_id: &str, content: &str) -> Result<ChatMessage, ApiError> {
        let url = self.url(&format!("/api/messages/{team_id}"));
        let body = SendMessageRequest {
            content: content.to_string(),
        };
        self.execute(self.http.post(url).json(&body)).await
    }
}

/// Strips a trailing slash and a trailing `/api` segment from a base URL.
fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim_end_matches('/');
    let trimmed = trimmed
        .strip_suffix("/api")
        .or_else(|| trimmed.strip_suffix("/API"))
        .unwrap_or(trimmed);
    trimmed.trim_end_matches('/').to_string()
}

/// Maps an HTTP error status to the [`ApiError`] taxonomy.
fn map_status(status: StatusCode, reason: String) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::FORBIDDEN => ApiError::PermissionDenied(reason),
        StatusCode::NOT_FOUND => ApiError::NotFound(reason),
        _ => ApiError::Transport(format!("{status}: {reason}")),
    }
}
