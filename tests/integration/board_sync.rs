// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::needless_continue,
    clippy::match_same_arms,
    clippy::doc_markdown,
    clippy::future_not_send,
    clippy::missing_panics_doc,
    clippy::missing_docs_in_private_items
)]

//! End-to-end board synchronization tests against an in-process server.
//!
//! These tests run the full stack: HTTP command client, WebSocket push
//! channel, and the board engine, against `boardsync-server` bound to an
//! OS-assigned port. They validate:
//! - Opening a project renders the server's snapshot.
//! - A created task appears exactly once even though the client receives
//!   both the command reply and the push rebroadcast.
//! - A second client in the same team room sees peer mutations arrive
//!   over push without issuing any command.
//! - Deletes propagate to peers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use boardsync::api::http::HttpCommandClient;
use boardsync::board::{self, BoardCommand, BoardEvent};
use boardsync::conn::{ConnectionManager, ReconnectConfig};
use boardsync::session::{Identity, Role as UserRole};
use boardsync::store::GroupedTasks;
use boardsync_proto::api::CreateTaskRequest;
use boardsync_proto::task::{Assignee, Task, TaskId, TaskStatus};
use boardsync_server::state::{Account, AppState, Role};

const WAIT: Duration = Duration::from_secs(5);
const SETTLE: Duration = Duration::from_millis(400);

fn admin_account(id: &str) -> Account {
    Account {
        id: id.to_string(),
        name: Some(id.to_string()),
        email: Some(format!("{id}@example.com")),
        role: Role::Admin,
    }
}

fn identity(id: &str) -> Identity {
    Identity {
        id: id.to_string(),
        email: Some(format!("{id}@example.com")),
        name: None,
    }
}

fn seed(id: &str, title: &str, status: TaskStatus, project: &str) -> Task {
    Task {
        id: TaskId::new(id),
        title: title.to_string(),
        description: None,
        status,
        position: 0,
        project_id: project.to_string(),
        assigned_to: None,
        created_at: chrono::Utc::now(),
    }
}

fn seed_assigned(id: &str, title: &str, status: TaskStatus, project: &str, user: &str) -> Task {
    let mut task = seed(id, title, status, project);
    task.assigned_to = Some(Assignee {
        id: user.to_string(),
        name: None,
        email: None,
    });
    task
}

async fn start_server(state: Arc<AppState>) -> std::net::SocketAddr {
    let (addr, _handle) = boardsync_server::start_server_with_state("127.0.0.1:0", state)
        .await
        .expect("failed to start test server");
    addr
}

async fn spawn_client(
    addr: std::net::SocketAddr,
    token: &str,
    who: Identity,
    role: UserRole,
) -> (mpsc::Sender<BoardCommand>, mpsc::Receiver<BoardEvent>) {
    let api = Arc::new(HttpCommandClient::new(&format!("http://{addr}/api"), token));
    let (conn, conn_rx) =
        ConnectionManager::new(format!("ws://{addr}/push"), token, ReconnectConfig::default());
    let conn = Arc::new(conn);
    conn.connect().await.expect("push connect failed");
    board::spawn_board(api, conn, conn_rx, who, role)
}

/// Waits for the next `BoardChanged`, skipping unrelated events.
async fn next_board(rx: &mut mpsc::Receiver<BoardEvent>) -> GroupedTasks {
    loop {
        let event = timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for a board event")
            .expect("engine exited");
        if let BoardEvent::BoardChanged(board) = event {
            return board;
        }
    }
}

/// Drains board events until none arrive for `SETTLE`, returning the last
/// rendered board. Panics if no board was ever rendered.
async fn settled_board(rx: &mut mpsc::Receiver<BoardEvent>) -> GroupedTasks {
    let mut last = None;
    while let Ok(Some(event)) = timeout(SETTLE, rx.recv()).await {
        if let BoardEvent::BoardChanged(board) = event {
            last = Some(board);
        }
    }
    last.expect("no board was rendered")
}

/// Polls until a team room reaches the expected membership.
async fn wait_for_members(state: &AppState, team_id: &str, expected: usize) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while state.rooms.member_count(team_id).await != expected {
        assert!(
            tokio::time::Instant::now() < deadline,
            "room {team_id} never reached {expected} members"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn open_project_renders_server_snapshot() {
    let state = Arc::new(AppState::new());
    state.add_account("tok-a", admin_account("u-a")).await;
    state.seed_task(seed("t-1", "write docs", TaskStatus::Todo, "p1")).await;
    state.seed_task(seed("t-2", "build it", TaskStatus::InProgress, "p1")).await;
    state.seed_task(seed("t-3", "ship it", TaskStatus::Done, "p1")).await;
    state.seed_task(seed("t-9", "other project", TaskStatus::Todo, "p2")).await;
    let addr = start_server(Arc::clone(&state)).await;

    let (cmd, mut evt) = spawn_client(addr, "tok-a", identity("u-a"), UserRole::Admin).await;
    cmd.send(BoardCommand::OpenProject {
        team_id: "team-1".to_string(),
        project_id: "p1".to_string(),
    })
    .await
    .unwrap();

    let board = next_board(&mut evt).await;
    assert_eq!(board.todo.len(), 1);
    assert_eq!(board.in_progress.len(), 1);
    assert_eq!(board.done.len(), 1);
    assert_eq!(board.todo[0].title, "write docs");
}

#[tokio::test]
async fn created_task_appears_exactly_once_despite_rebroadcast() {
    let state = Arc::new(AppState::new());
    state.add_account("tok-a", admin_account("u-a")).await;
    let addr = start_server(Arc::clone(&state)).await;

    let (cmd, mut evt) = spawn_client(addr, "tok-a", identity("u-a"), UserRole::Admin).await;
    cmd.send(BoardCommand::OpenProject {
        team_id: "team-1".to_string(),
        project_id: "p1".to_string(),
    })
    .await
    .unwrap();
    let empty = next_board(&mut evt).await;
    assert_eq!(empty.total(), 0);

    cmd.send(BoardCommand::CreateTask {
        fields: CreateTaskRequest {
            title: "only once".to_string(),
            description: None,
            assigned_to: None,
        },
    })
    .await
    .unwrap();

    // The command reply and the room rebroadcast both deliver the task;
    // the idempotent upsert must collapse them.
    let board = settled_board(&mut evt).await;
    assert_eq!(board.total(), 1);
    assert_eq!(board.todo[0].title, "only once");
}

#[tokio::test]
async fn peer_in_same_room_converges_via_push() {
    let state = Arc::new(AppState::new());
    state.add_account("tok-a", admin_account("u-a")).await;
    state.add_account("tok-b", admin_account("u-b")).await;
    let addr = start_server(Arc::clone(&state)).await;

    let (cmd_a, mut evt_a) = spawn_client(addr, "tok-a", identity("u-a"), UserRole::Admin).await;
    let (cmd_b, mut evt_b) = spawn_client(addr, "tok-b", identity("u-b"), UserRole::Admin).await;
    for cmd in [&cmd_a, &cmd_b] {
        cmd.send(BoardCommand::OpenProject {
            team_id: "team-1".to_string(),
            project_id: "p1".to_string(),
        })
        .await
        .unwrap();
    }
    next_board(&mut evt_a).await;
    next_board(&mut evt_b).await;
    wait_for_members(&state, "team-1", 2).await;

    cmd_a
        .send(BoardCommand::CreateTask {
            fields: CreateTaskRequest {
                title: "from a".to_string(),
                description: None,
                assigned_to: None,
            },
        })
        .await
        .unwrap();

    // B issued nothing; the task arrives over the team room.
    let board_b = settled_board(&mut evt_b).await;
    assert_eq!(board_b.total(), 1);
    assert_eq!(board_b.todo[0].title, "from a");

    let board_a = settled_board(&mut evt_a).await;
    assert_eq!(board_a.total(), 1);
}

#[tokio::test]
async fn delete_propagates_to_peers() {
    let state = Arc::new(AppState::new());
    state.add_account("tok-a", admin_account("u-a")).await;
    state.add_account("tok-b", admin_account("u-b")).await;
    state.seed_task(seed("t-1", "doomed", TaskStatus::Todo, "p1")).await;
    let addr = start_server(Arc::clone(&state)).await;

    let (cmd_a, mut evt_a) = spawn_client(addr, "tok-a", identity("u-a"), UserRole::Admin).await;
    let (cmd_b, mut evt_b) = spawn_client(addr, "tok-b", identity("u-b"), UserRole::Admin).await;
    for cmd in [&cmd_a, &cmd_b] {
        cmd.send(BoardCommand::OpenProject {
            team_id: "team-1".to_string(),
            project_id: "p1".to_string(),
        })
        .await
        .unwrap();
    }
    assert_eq!(next_board(&mut evt_a).await.total(), 1);
    assert_eq!(next_board(&mut evt_b).await.total(), 1);
    wait_for_members(&state, "team-1", 2).await;

    cmd_a
        .send(BoardCommand::DeleteTask {
            task_id: TaskId::new("t-1"),
        })
        .await
        .unwrap();

    assert_eq!(settled_board(&mut evt_a).await.total(), 0);
    assert_eq!(settled_board(&mut evt_b).await.total(), 0);
}

#[tokio::test]
async fn update_failure_repairs_from_server() {
    let state = Arc::new(AppState::new());
    state.add_account("tok-a", admin_account("u-a")).await;
    state.seed_task(seed("t-1", "stable", TaskStatus::Todo, "p1")).await;
    let addr = start_server(Arc::clone(&state)).await;

    let (cmd, mut evt) = spawn_client(addr, "tok-a", identity("u-a"), UserRole::Admin).await;
    cmd.send(BoardCommand::OpenProject {
        team_id: "team-1".to_string(),
        project_id: "p1".to_string(),
    })
    .await
    .unwrap();
    assert_eq!(next_board(&mut evt).await.total(), 1);

    // Updating a task the server has never seen fails with 404; the
    // engine re-fetches and the board still shows the server's truth.
    cmd.send(BoardCommand::UpdateTask {
        task_id: TaskId::new("ghost"),
        fields: boardsync_proto::api::UpdateTaskRequest {
            title: Some("nope".to_string()),
            ..Default::default()
        },
    })
    .await
    .unwrap();

    let mut failed = false;
    let board = loop {
        let event = timeout(WAIT, evt.recv()).await.unwrap().unwrap();
        match event {
            BoardEvent::CommandFailed(_) => failed = true,
            BoardEvent::BoardChanged(board) if failed => break board,
            _ => {}
        }
    };
    assert_eq!(board.total(), 1);
    assert_eq!(board.todo[0].title, "stable");
}

#[tokio::test]
async fn member_board_shows_only_their_tasks() {
    let state = Arc::new(AppState::new());
    state
        .add_account(
            "tok-m",
            Account {
                id: "u-m".to_string(),
                name: None,
                email: Some("u-m@example.com".to_string()),
                role: Role::Member,
            },
        )
        .await;
    state.seed_task(seed_assigned("t-1", "mine todo", TaskStatus::Todo, "p1", "u-m")).await;
    state.seed_task(seed_assigned("t-2", "theirs", TaskStatus::Todo, "p1", "u-x")).await;
    state.seed_task(seed_assigned("t-3", "mine done", TaskStatus::Done, "p1", "u-m")).await;
    state.seed_task(seed("t-4", "unowned", TaskStatus::InProgress, "p1")).await;
    let addr = start_server(Arc::clone(&state)).await;

    let (cmd, mut evt) = spawn_client(addr, "tok-m", identity("u-m"), UserRole::Member).await;
    cmd.send(BoardCommand::OpenProject {
        team_id: "team-1".to_string(),
        project_id: "p1".to_string(),
    })
    .await
    .unwrap();

    // A member's board carries only the tasks assigned to them; other
    // users' tasks and unassigned tasks never render.
    let board = next_board(&mut evt).await;
    assert_eq!(board.total(), 2);
    assert_eq!(board.todo.len(), 1);
    assert_eq!(board.todo[0].id, TaskId::new("t-1"));
    assert!(board.in_progress.is_empty());
    assert_eq!(board.done.len(), 1);
    assert_eq!(board.done[0].id, TaskId::new("t-3"));
}

#[tokio::test]
async fn own_tasks_lead_each_column() {
    let state = Arc::new(AppState::new());
    state.add_account("tok-a", admin_account("u-a")).await;
    // Seeding prepends, so the server lists the foreign task first in
    // each column.
    state.seed_task(seed_assigned("t-mine", "mine", TaskStatus::Todo, "p1", "u-a")).await;
    state.seed_task(seed_assigned("t-other", "theirs", TaskStatus::Todo, "p1", "u-x")).await;
    state.seed_task(seed_assigned("d-mine", "mine", TaskStatus::Done, "p1", "u-a")).await;
    state.seed_task(seed_assigned("d-other", "theirs", TaskStatus::Done, "p1", "u-x")).await;
    let addr = start_server(Arc::clone(&state)).await;

    let (cmd, mut evt) = spawn_client(addr, "tok-a", identity("u-a"), UserRole::Admin).await;
    cmd.send(BoardCommand::OpenProject {
        team_id: "team-1".to_string(),
        project_id: "p1".to_string(),
    })
    .await
    .unwrap();

    // An admin sees everything, with their own work first in each column.
    let board = next_board(&mut evt).await;
    assert_eq!(board.total(), 4);
    let todo_ids: Vec<&str> = board.todo.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(todo_ids, ["t-mine", "t-other"]);
    let done_ids: Vec<&str> = board.done.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(done_ids, ["d-mine", "d-other"]);
}
