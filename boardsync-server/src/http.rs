//! HTTP command API.
//!
//! One request, one reply; every accepted mutation is also rebroadcast
//! as a push frame to the owning team's room before the reply is sent.
//! All routes require a bearer token that resolves to a known account.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;

use boardsync_proto::api::{
    CreateTaskRequest, ErrorBody, MoveTaskRequest, SendMessageRequest, UpdateTaskRequest,
};
use boardsync_proto::push::ServerFrame;
use boardsync_proto::task::TaskId;

use crate::push::ws_handler;
use crate::state::{Account, AppState, WriteError};

/// Builds the full router: command API plus the push endpoint.
pub fn router(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route(
            "/api/tasks/{team_id}/projects/{project_id}/tasks",
            get(list_tasks).post(create_task),
        )
        .route(
            "/api/tasks/{team_id}/tasks/{task_id}",
            axum::routing::put(write_task).delete(delete_task),
        )
        .route(
            "/api/messages/{team_id}",
            get(list_messages).post(send_message),
        )
        .route("/push", get(ws_handler))
        .with_state(state)
}

/// A command failure, rendered as a JSON error body.
struct Failure(StatusCode, String);

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.1 };
        (self.0, Json(body)).into_response()
    }
}

impl From<WriteError> for Failure {
    fn from(err: WriteError) -> Self {
        let status = match err {
            WriteError::NotFound => StatusCode::NOT_FOUND,
            WriteError::NotAssignee | WriteError::RoleDenied => StatusCode::FORBIDDEN,
            WriteError::Invalid(_) => StatusCode::BAD_REQUEST,
        };
        Self(status, err.to_string())
    }
}

/// Resolves the caller's account from the `Authorization` header.
async fn require_auth(state: &AppState, headers: &HeaderMap) -> Result<Account, Failure> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            Failure(
                StatusCode::UNAUTHORIZED,
                "missing bearer token".to_string(),
            )
        })?;
    state.authenticate(token).await.ok_or_else(|| {
        Failure(
            StatusCode::UNAUTHORIZED,
            "unknown bearer token".to_string(),
        )
    })
}

/// PUT body: either a column move or a field update. A move carries
/// exactly the destination status; anything else is a field update.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TaskWrite {
    Move(MoveTaskRequest),
    Update(UpdateTaskRequest),
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((_team_id, project_id)): Path<(String, String)>,
) -> Result<Response, Failure> {
    require_auth(&state, &headers).await?;
    let tasks = state.list_tasks(&project_id).await;
    Ok(Json(tasks).into_response())
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((team_id, project_id)): Path<(String, String)>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Response, Failure> {
    let account = require_auth(&state, &headers).await?;
    let task = state.create_task(&project_id, req, &account).await?;
    tracing::info!(task_id = %task.id, %project_id, "task created");
    state
        .rooms
        .broadcast(&team_id, &ServerFrame::TaskCreated { task: task.clone() })
        .await;
    Ok((StatusCode::CREATED, Json(task)).into_response())
}

async fn write_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((team_id, task_id)): Path<(String, String)>,
    Json(write): Json<TaskWrite>,
) -> Result<Response, Failure> {
    let account = require_auth(&state, &headers).await?;
    let task_id = TaskId::new(task_id);
    let (task, frame) = match write {
        TaskWrite::Move(req) => {
            let task = state.move_task(&task_id, req.status, &account).await?;
            tracing::info!(%task_id, status = %task.status, "task moved");
            let frame = ServerFrame::TaskMoved { task: task.clone() };
            (task, frame)
        }
        TaskWrite::Update(req) => {
            let task = state.update_task(&task_id, req).await?;
            tracing::info!(%task_id, "task updated");
            let frame = ServerFrame::TaskUpdated { task: task.clone() };
            (task, frame)
        }
    };
    state.rooms.broadcast(&team_id, &frame).await;
    Ok(Json(task).into_response())
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((team_id, task_id)): Path<(String, String)>,
) -> Result<Response, Failure> {
    let account = require_auth(&state, &headers).await?;
    let task_id = TaskId::new(task_id);
    let removed = state.delete_task(&task_id, &account).await?;
    tracing::info!(%task_id, project_id = %removed.project_id, "task deleted");
    state
        .rooms
        .broadcast(
            &team_id,
            &ServerFrame::TaskDeleted {
                task_id,
                project_id: removed.project_id,
            },
        )
        .await;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(team_id): Path<String>,
) -> Result<Response, Failure> {
    require_auth(&state, &headers).await?;
    let messages = state.list_messages(&team_id).await;
    Ok(Json(messages).into_response())
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(team_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Response, Failure> {
    let account = require_auth(&state, &headers).await?;
    let message = state.append_message(&team_id, &account, req.content).await;
    tracing::info!(%team_id, message_id = %message.id, "chat message posted");
    state
        .rooms
        .broadcast(
            &team_id,
            &ServerFrame::NewMessage {
                message: message.clone(),
            },
        )
        .await;
    Ok((StatusCode::CREATED, Json(message)).into_response())
}
