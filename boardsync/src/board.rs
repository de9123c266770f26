//! Board engine: wires commands, push events, and reconciliation.
//!
//! The engine is a single background task that owns the [`Reconciler`]
//! (and with it the canonical task store), the [`PushChannel`] filter,
//! and the [`ChatFeed`]. The UI sends [`BoardCommand`]s and drains
//! [`BoardEvent`]s; push frames from the shared connection arrive on the
//! same loop. Because every mutation — command result or push event —
//! is applied inside this one task, there is exactly one logical writer
//! into the store no matter how many commands are in flight.
//!
//! ```text
//! UI ── BoardCommand ──► engine loop ◄── ConnEvent ── ConnectionManager
//!            ▲                │
//!            └── BoardEvent ──┘
//! ```
//!
//! Mutations are confirmed-only: nothing is applied before the server's
//! acknowledgment (or rebroadcast), so a failed create/move/delete
//! leaves the store exactly as it was.

use std::sync::Arc;

use tokio::sync::mpsc;

use boardsync_proto::api::{CreateTaskRequest, UpdateTaskRequest};
use boardsync_proto::chat::ChatMessage;
use boardsync_proto::task::TaskId;

use crate::api::{ApiError, CommandApi};
use crate::chat::ChatFeed;
use crate::conn::{ConnEvent, ConnState, ConnectionManager};
use crate::push::{PushChannel, PushEvent};
use crate::reconcile::{Mutation, Reconciler};
use crate::session::{Identity, Role};
use crate::store::GroupedTasks;
use crate::validate::{DropSlot, MoveDecision, validate_move};

/// Default capacity for the command and event channels.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Commands sent from the UI to the board engine.
#[derive(Debug)]
pub enum BoardCommand {
    /// Switch the active view to a project: leave the previous room,
    /// join the new one, and rebuild state from a full fetch.
    OpenProject {
        /// Team the project belongs to (the push room's scope).
        team_id: String,
        /// Project whose board to show.
        project_id: String,
    },
    /// Create a task in the active project.
    CreateTask {
        /// Title, description, assignee.
        fields: CreateTaskRequest,
    },
    /// Update a task's fields.
    UpdateTask {
        /// Task to update.
        task_id: TaskId,
        /// Changed fields.
        fields: UpdateTaskRequest,
    },
    /// Move a task between columns (drag and drop).
    MoveTask {
        /// Task being dragged.
        task_id: TaskId,
        /// Where it was picked up.
        source: DropSlot,
        /// Where it was dropped.
        dest: DropSlot,
    },
    /// Delete a task in the active project.
    DeleteTask {
        /// Task to delete.
        task_id: TaskId,
    },
    /// Post a chat message to the active team's feed.
    SendChat {
        /// Message body.
        content: String,
    },
    /// Stop the engine loop.
    Shutdown,
}

/// Events emitted by the board engine for the UI to render.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    /// The active project's column partition changed; re-render.
    BoardChanged(GroupedTasks),
    /// The active team's chat feed changed; re-render.
    ChatChanged(Vec<ChatMessage>),
    /// Informational notice (success toasts and the like).
    Notice(String),
    /// The advisory move check (or the server) refused a command.
    PermissionWarning(String),
    /// A command failed; the store was left consistent.
    CommandFailed(String),
    /// The push connection changed state.
    ConnectionStatus(ConnState),
}

/// Spawns the board engine and returns its channel handles.
///
/// The engine shares `conn` with the chat subsystem but owns the
/// consumer side of its event stream; push frames and UI commands are
/// serialized onto one loop.
#[must_use]
pub fn spawn_board<A>(
    api: Arc<A>,
    conn: Arc<ConnectionManager>,
    conn_rx: mpsc::Receiver<ConnEvent>,
    identity: Identity,
    role: Role,
) -> (mpsc::Sender<BoardCommand>, mpsc::Receiver<BoardEvent>)
where
    A: CommandApi + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
    let (evt_tx, evt_rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);

    let engine = BoardEngine {
        api,
        conn,
        identity,
        role,
        reconciler: Reconciler::new(),
        push: PushChannel::new(),
        chat: ChatFeed::new(),
        active_team: None,
        active_project: None,
        events: evt_tx,
    };
    tokio::spawn(engine.run(cmd_rx, conn_rx));

    (cmd_tx, evt_rx)
}

/// The engine's state, owned entirely by its background task.
struct BoardEngine<A: CommandApi> {
    api: Arc<A>,
    conn: Arc<ConnectionManager>,
    identity: Identity,
    role: Role,
    reconciler: Reconciler,
    push: PushChannel,
    chat: ChatFeed,
    active_team: Option<String>,
    active_project: Option<String>,
    events: mpsc::Sender<BoardEvent>,
}

impl<A: CommandApi> BoardEngine<A> {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<BoardCommand>,
        mut conn_rx: mpsc::Receiver<ConnEvent>,
    ) {
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(BoardCommand::Shutdown) | None => {
                        tracing::info!("board engine shutting down");
                        return;
                    }
                    Some(cmd) => self.handle_command(cmd).await,
                },
                event = conn_rx.recv() => match event {
                    Some(ConnEvent::Frame(frame)) => self.handle_frame(frame).await,
                    Some(ConnEvent::StateChanged(state)) => {
                        let _ = self.events.send(BoardEvent::ConnectionStatus(state)).await;
                    }
                    // Connection task exited; keep serving commands.
                    None => {}
                },
            }
        }
    }

    async fn handle_command(&mut self, cmd: BoardCommand) {
        match cmd {
            BoardCommand::OpenProject {
                team_id,
                project_id,
            } => self.open_project(team_id, project_id).await,
            BoardCommand::CreateTask { fields } => self.create_task(fields).await,
            BoardCommand::UpdateTask { task_id, fields } => {
                self.update_task(&task_id, fields).await;
            }
            BoardCommand::MoveTask {
                task_id,
                source,
                dest,
            } => self.move_task(&task_id, source, dest).await,
            BoardCommand::DeleteTask { task_id } => self.delete_task(&task_id).await,
            BoardCommand::SendChat { content } => self.send_chat(&content).await,
            BoardCommand::Shutdown => unreachable!("handled in run()"),
        }
    }

    async fn handle_frame(&mut self, frame: boardsync_proto::push::ServerFrame) {
        match self.push.filter(frame) {
            Some(PushEvent::Task(event)) => {
                self.reconciler.apply(event.into_mutation());
                self.emit_board().await;
            }
            Some(PushEvent::Chat(message)) => {
                if self.chat.append(message) {
                    self.emit_chat().await;
                }
            }
            None => {}
        }
    }

    /// Leaves the previous room, joins the next, and rebuilds the board
    /// and chat feed from full fetches. Room membership is per team; a
    /// project switch within the same team only re-fetches.
    async fn open_project(&mut self, team_id: String, project_id: String) {
        if self.active_team.as_deref() != Some(team_id.as_str()) {
            if let Some(previous) = self.active_team.take() {
                if let Err(e) = self.conn.leave_room(&previous).await {
                    tracing::warn!(team_id = %previous, err = %e, "leave-room failed");
                }
            }
            if let Err(e) = self.conn.join_room(&team_id).await {
                // Dropped, not queued: push traffic for this room is
                // missed until a later switch joins again.
                tracing::warn!(%team_id, err = %e, "join-room failed");
                let _ = self
                    .events
                    .send(BoardEvent::Notice(
                        "Live updates unavailable until reconnected".to_string(),
                    ))
                    .await;
            }

            match self.api.list_messages(&team_id).await {
                Ok(messages) => {
                    self.chat.replace_all(messages);
                    self.emit_chat().await;
                }
                Err(e) => {
                    tracing::warn!(%team_id, err = %e, "chat fetch failed");
                }
            }
        }

        self.active_team = Some(team_id.clone());
        self.active_project = Some(project_id.clone());
        self.push.set_active_team(Some(team_id.clone()));
        self.push.set_active_project(Some(project_id.clone()));

        match self.api.list_tasks(&team_id, &project_id).await {
            Ok(tasks) => {
                self.reconciler.replace_project(&project_id, tasks);
            }
            Err(e) => {
                // Fail closed: render an empty board rather than stale
                // tasks from a previous view.
                self.reconciler.replace_project(&project_id, Vec::new());
                let _ = self
                    .events
                    .send(BoardEvent::CommandFailed(format!(
                        "Failed to load tasks: {e}"
                    )))
                    .await;
            }
        }
        self.emit_board().await;
    }

    async fn create_task(&mut self, fields: CreateTaskRequest) {
        let Some((team_id, project_id)) = self.active_scope() else {
            return;
        };
        match self.api.create_task(&team_id, &project_id, fields).await {
            Ok(task) => {
                self.reconciler.apply(Mutation::Upsert(task));
                self.emit_board().await;
                let _ = self
                    .events
                    .send(BoardEvent::Notice("Task created".to_string()))
                    .await;
            }
            Err(e) => self.report_failure("Failed to create task", &e).await,
        }
    }

    async fn update_task(&mut self, task_id: &TaskId, fields: UpdateTaskRequest) {
        let Some((team_id, project_id)) = self.active_scope() else {
            return;
        };
        match self.api.update_task(&team_id, task_id, fields).await {
            Ok(task) => {
                self.reconciler.apply(Mutation::Upsert(task));
                self.emit_board().await;
                let _ = self
                    .events
                    .send(BoardEvent::Notice("Task updated".to_string()))
                    .await;
            }
            Err(e) => {
                self.report_failure("Failed to update task", &e).await;
                // The server may have applied part of the edit; repair
                // divergence with a compensating full re-fetch.
                if let Err(fetch_err) = self
                    .reconciler
                    .repair(self.api.as_ref(), &team_id, &project_id)
                    .await
                {
                    tracing::warn!(err = %fetch_err, "compensating re-fetch failed");
                }
                self.emit_board().await;
            }
        }
    }

    async fn move_task(&mut self, task_id: &TaskId, source: DropSlot, dest: DropSlot) {
        let Some((team_id, project_id)) = self.active_scope() else {
            return;
        };
        let Some(task) = self
            .reconciler
            .store()
            .tasks(&project_id)
            .iter()
            .find(|t| t.id == *task_id)
            .cloned()
        else {
            tracing::warn!(%task_id, "move for unknown task, ignoring");
            return;
        };

        match validate_move(&task, &self.identity, source, dest) {
            MoveDecision::NoChange => {}
            MoveDecision::NotAssignee => {
                let _ = self
                    .events
                    .send(BoardEvent::PermissionWarning(
                        "You can't update the status of a task assigned to another user"
                            .to_string(),
                    ))
                    .await;
            }
            MoveDecision::Allowed => match self.api.move_task(&team_id, task_id, dest.status).await
            {
                Ok(moved) => {
                    self.reconciler.apply(Mutation::Upsert(moved));
                    self.emit_board().await;
                    let _ = self
                        .events
                        .send(BoardEvent::Notice(format!(
                            "Task moved to {}",
                            dest.status.label()
                        )))
                        .await;
                }
                Err(ApiError::PermissionDenied(reason)) => {
                    let _ = self
                        .events
                        .send(BoardEvent::PermissionWarning(reason))
                        .await;
                }
                Err(e) => self.report_failure("Failed to move task", &e).await,
            },
        }
    }

    async fn delete_task(&mut self, task_id: &TaskId) {
        let Some((team_id, project_id)) = self.active_scope() else {
            return;
        };
        match self.api.delete_task(&team_id, task_id).await {
            Ok(()) => {
                self.reconciler.apply(Mutation::Remove {
                    project_id,
                    task_id: task_id.clone(),
                });
                self.emit_board().await;
                let _ = self
                    .events
                    .send(BoardEvent::Notice("Task deleted".to_string()))
                    .await;
            }
            Err(e) => self.report_failure("Failed to delete task", &e).await,
        }
    }

    async fn send_chat(&mut self, content: &str) {
        let Some(team_id) = self.active_team.clone() else {
            return;
        };
        match self.api.send_message(&team_id, content).await {
            Ok(message) => {
                if self.chat.append(message) {
                    self.emit_chat().await;
                }
            }
            Err(e) => self.report_failure("Failed to send message", &e).await,
        }
    }

    fn active_scope(&self) -> Option<(String, String)> {
        match (&self.active_team, &self.active_project) {
            (Some(team), Some(project)) => Some((team.clone(), project.clone())),
            _ => {
                tracing::warn!("command issued with no active project, ignoring");
                None
            }
        }
    }

    async fn report_failure(&self, what: &str, err: &ApiError) {
        tracing::warn!(error = %err, "{what}");
        let _ = self
            .events
            .send(BoardEvent::CommandFailed(format!("{what}: {err}")))
            .await;
    }

    async fn emit_board(&self) {
        if let Some(project_id) = &self.active_project {
            let _ = self
                .events
                .send(BoardEvent::BoardChanged(self.board_view(project_id)))
                .await;
        }
    }

    /// The rendered board for a project: the user's own tasks lead each
    /// column, and a role restricted to assigned work sees nothing else.
    fn board_view(&self, project_id: &str) -> GroupedTasks {
        let mut tasks = self
            .reconciler
            .store()
            .assigned_first(project_id, &self.identity);
        if self.role.capabilities().only_assigned_tasks {
            tasks.retain(|t| {
                t.assigned_to
                    .as_ref()
                    .is_some_and(|a| self.identity.matches(a))
            });
        }
        GroupedTasks::from_tasks(tasks)
    }

    async fn emit_chat(&self) {
        let _ = self
            .events
            .send(BoardEvent::ChatChanged(self.chat.messages().to_vec()))
            .await;
    }
}
