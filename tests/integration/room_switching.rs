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

//! Room membership across project switches.
//!
//! Switching to a project in a different team must leave the old team's
//! room and join the new one; after the switch, mutations in the old
//! project must not reach the board. A project switch within the same
//! team keeps room membership and only re-fetches tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use boardsync::api::http::HttpCommandClient;
use boardsync::api::loopback::{LoopbackApi, Recorded};
use boardsync::board::{self, BoardCommand, BoardEvent};
use boardsync::conn::{ConnectionManager, ReconnectConfig};
use boardsync::session::{Identity, Role as UserRole};
use boardsync_proto::api::CreateTaskRequest;
use boardsync_server::state::{Account, AppState, Role};

const WAIT: Duration = Duration::from_secs(5);

fn admin_account(id: &str) -> Account {
    Account {
        id: id.to_string(),
        name: None,
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
) -> (mpsc::Sender<BoardCommand>, mpsc::Receiver<BoardEvent>) {
    let api = Arc::new(HttpCommandClient::new(&format!("http://{addr}/api"), token));
    let (conn, conn_rx) =
        ConnectionManager::new(format!("ws://{addr}/push"), token, ReconnectConfig::default());
    let conn = Arc::new(conn);
    conn.connect().await.expect("push connect failed");
    board::spawn_board(api, conn, conn_rx, who, UserRole::Admin)
}

async fn open(cmd: &mpsc::Sender<BoardCommand>, team: &str, project: &str) {
    cmd.send(BoardCommand::OpenProject {
        team_id: team.to_string(),
        project_id: project.to_string(),
    })
    .await
    .unwrap();
}

async fn next_board(rx: &mut mpsc::Receiver<BoardEvent>) -> boardsync::store::GroupedTasks {
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
async fn switching_teams_moves_room_membership() {
    let state = Arc::new(AppState::new());
    state.add_account("tok-a", admin_account("u-a")).await;
    let addr = start_server(Arc::clone(&state)).await;

    let (cmd, mut evt) = spawn_client(addr, "tok-a", identity("u-a")).await;

    open(&cmd, "team-1", "p1").await;
    next_board(&mut evt).await;
    wait_for_members(&state, "team-1", 1).await;

    open(&cmd, "team-2", "p2").await;
    next_board(&mut evt).await;
    wait_for_members(&state, "team-2", 1).await;
    wait_for_members(&state, "team-1", 0).await;
}

#[tokio::test]
async fn mutation_in_left_project_does_not_reach_switched_board() {
    let state = Arc::new(AppState::new());
    state.add_account("tok-a", admin_account("u-a")).await;
    state.add_account("tok-b", admin_account("u-b")).await;
    let addr = start_server(Arc::clone(&state)).await;

    // B stays on team-1/p1; A starts there and then switches away.
    let (cmd_a, mut evt_a) = spawn_client(addr, "tok-a", identity("u-a")).await;
    let (cmd_b, mut evt_b) = spawn_client(addr, "tok-b", identity("u-b")).await;
    open(&cmd_a, "team-1", "p1").await;
    open(&cmd_b, "team-1", "p1").await;
    next_board(&mut evt_a).await;
    next_board(&mut evt_b).await;

    open(&cmd_a, "team-2", "p2").await;
    let board = next_board(&mut evt_a).await;
    assert_eq!(board.total(), 0);
    wait_for_members(&state, "team-1", 1).await;

    cmd_b
        .send(BoardCommand::CreateTask {
            fields: CreateTaskRequest {
                title: "team-1 only".to_string(),
                description: None,
                assigned_to: None,
            },
        })
        .await
        .unwrap();
    assert_eq!(next_board(&mut evt_b).await.total(), 1);

    // Nothing about p1 may leak into A's p2 board.
    while let Ok(Some(event)) = timeout(Duration::from_millis(400), evt_a.recv()).await {
        if let BoardEvent::BoardChanged(board) = event {
            assert_eq!(board.total(), 0, "p1 mutation leaked into the p2 board");
        }
    }

    // Switching back re-fetches and picks up what was missed.
    open(&cmd_a, "team-1", "p1").await;
    let board = next_board(&mut evt_a).await;
    assert_eq!(board.total(), 1);
    assert_eq!(board.todo[0].title, "team-1 only");
}

#[tokio::test]
async fn same_team_project_switch_keeps_chat_and_refetches_tasks() {
    // Loopback variant: the request log shows exactly what went out.
    let api = Arc::new(LoopbackApi::new());
    let (conn, conn_rx) =
        ConnectionManager::new("ws://127.0.0.1:1/push", "tok", ReconnectConfig::default());
    let (cmd, mut evt) = board::spawn_board(
        Arc::clone(&api),
        Arc::new(conn),
        conn_rx,
        identity("u-a"),
        UserRole::Admin,
    );

    open(&cmd, "team-1", "p1").await;
    next_board(&mut evt).await;
    open(&cmd, "team-1", "p2").await;
    next_board(&mut evt).await;

    let requests = api.requests();
    let chat_fetches = requests
        .iter()
        .filter(|r| matches!(r, Recorded::ListMessages(_)))
        .count();
    assert_eq!(chat_fetches, 1, "same-team switch must not re-fetch chat");
    assert!(requests.contains(&Recorded::ListTasks("p1".to_string())));
    assert!(requests.contains(&Recorded::ListTasks("p2".to_string())));
}
