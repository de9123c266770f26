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

//! Push-channel reconnection behavior.
//!
//! Validates that the connection manager detects a dropped transport,
//! announces `Reconnecting`, retries with bounded attempts, and either
//! recovers (`Connected`) or gives up (`Disconnected`).
//!
//! ## Disconnect simulation
//!
//! Aborting the server's `JoinHandle` does not close WebSocket
//! connections already handed to their own tasks. Instead a TCP proxy
//! sits between the client and the server; killing the proxy aborts
//! every proxied connection task, dropping both `TcpStream`s and
//! surfacing the disconnect to the client immediately.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::timeout;

use boardsync::conn::{ConnError, ConnEvent, ConnState, ConnectionManager, ReconnectConfig};
use boardsync_server::state::{Account, AppState, Role};

const WAIT: Duration = Duration::from_secs(5);

/// TCP proxy whose connections can be severed on demand.
struct TcpProxy {
    client_addr: String,
    accept_handle: tokio::task::JoinHandle<()>,
    conn_handles: Arc<Mutex<Vec<tokio::task::JoinHandle<()>>>>,
}

impl TcpProxy {
    async fn new(proxy_port: u16, backend_addr: String) -> Self {
        let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{proxy_port}"))
            .await
            .unwrap_or_else(|e| panic!("proxy: failed to bind port {proxy_port}: {e}"));
        let client_addr = format!("127.0.0.1:{}", listener.local_addr().unwrap().port());
        let conn_handles: Arc<Mutex<Vec<tokio::task::JoinHandle<()>>>> =
            Arc::new(Mutex::new(Vec::new()));
        let handles = Arc::clone(&conn_handles);

        let accept_handle = tokio::spawn(async move {
            loop {
                let Ok((mut client_stream, _)) = listener.accept().await else {
                    break;
                };
                let backend = backend_addr.clone();
                let conn_handle = tokio::spawn(async move {
                    let Ok(mut backend_stream) = tokio::net::TcpStream::connect(&backend).await
                    else {
                        return;
                    };
                    // Aborting this task drops both streams at once.
                    let _ =
                        tokio::io::copy_bidirectional(&mut client_stream, &mut backend_stream)
                            .await;
                });
                handles.lock().push(conn_handle);
            }
        });

        Self {
            client_addr,
            accept_handle,
            conn_handles,
        }
    }

    fn kill(self) {
        self.accept_handle.abort();
        for handle in self.conn_handles.lock().iter() {
            handle.abort();
        }
    }
}

async fn find_free_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind port 0");
    listener.local_addr().unwrap().port()
}

async fn start_backend() -> (Arc<AppState>, std::net::SocketAddr) {
    let state = Arc::new(AppState::new());
    state
        .add_account(
            "tok",
            Account {
                id: "u-1".to_string(),
                name: None,
                email: None,
                role: Role::Admin,
            },
        )
        .await;
    let (addr, _handle) = boardsync_server::start_server_with_state("127.0.0.1:0", Arc::clone(&state))
        .await
        .expect("failed to start test server");
    (state, addr)
}

fn fast_reconnect(max_attempts: u32) -> ReconnectConfig {
    ReconnectConfig {
        max_attempts,
        initial_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(200),
    }
}

async fn expect_state(rx: &mut tokio::sync::mpsc::Receiver<ConnEvent>, wanted: ConnState) {
    loop {
        let event = timeout(WAIT, rx.recv())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for state {wanted}"))
            .expect("event channel closed");
        if let ConnEvent::StateChanged(state) = event {
            if state == wanted {
                return;
            }
        }
    }
}

#[tokio::test]
async fn reconnects_when_transport_returns() {
    let (_state, backend) = start_backend().await;
    let port = find_free_port().await;
    let proxy = TcpProxy::new(port, backend.to_string()).await;

    let (conn, mut rx) = ConnectionManager::new(
        format!("ws://{}/push", proxy.client_addr),
        "tok",
        fast_reconnect(10),
    );
    conn.connect().await.expect("initial connect failed");
    expect_state(&mut rx, ConnState::Connected).await;

    proxy.kill();
    expect_state(&mut rx, ConnState::Reconnecting).await;

    // Bring the proxy back on the same port; a retry should land.
    let _proxy2 = TcpProxy::new(port, backend.to_string()).await;
    expect_state(&mut rx, ConnState::Connected).await;
    assert_eq!(conn.state(), ConnState::Connected);
}

#[tokio::test]
async fn gives_up_after_bounded_attempts() {
    let (_state, backend) = start_backend().await;
    let port = find_free_port().await;
    let proxy = TcpProxy::new(port, backend.to_string()).await;

    let (conn, mut rx) = ConnectionManager::new(
        format!("ws://{}/push", proxy.client_addr),
        "tok",
        fast_reconnect(2),
    );
    conn.connect().await.expect("initial connect failed");
    expect_state(&mut rx, ConnState::Connected).await;

    proxy.kill();
    expect_state(&mut rx, ConnState::Reconnecting).await;
    // No proxy comes back: both attempts fail, then the state is terminal.
    expect_state(&mut rx, ConnState::Disconnected).await;
    assert_eq!(conn.state(), ConnState::Disconnected);

    // Room requests in the terminal state are dropped, not queued.
    assert!(matches!(
        conn.join_room("team-1").await,
        Err(ConnError::NotConnected)
    ));
}

#[tokio::test]
async fn frames_flow_again_after_recovery() {
    let (state, backend) = start_backend().await;
    let port = find_free_port().await;
    let proxy = TcpProxy::new(port, backend.to_string()).await;

    let (conn, mut rx) = ConnectionManager::new(
        format!("ws://{}/push", proxy.client_addr),
        "tok",
        fast_reconnect(10),
    );
    conn.connect().await.expect("initial connect failed");
    expect_state(&mut rx, ConnState::Connected).await;

    proxy.kill();
    expect_state(&mut rx, ConnState::Reconnecting).await;
    let _proxy2 = TcpProxy::new(port, backend.to_string()).await;
    expect_state(&mut rx, ConnState::Connected).await;

    // Rejoin after recovery (membership was lost with the connection).
    conn.join_room("team-1").await.expect("join after reconnect");
    let deadline = tokio::time::Instant::now() + WAIT;
    while state.rooms.member_count("team-1").await != 1 {
        assert!(tokio::time::Instant::now() < deadline, "join never landed");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let frame = boardsync_proto::push::ServerFrame::TaskDeleted {
        task_id: boardsync_proto::task::TaskId::new("t-1"),
        project_id: "p1".to_string(),
    };
    state.rooms.broadcast("team-1", &frame).await;

    loop {
        let event = timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("event channel closed");
        if let ConnEvent::Frame(received) = event {
            assert_eq!(received, frame);
            return;
        }
    }
}
