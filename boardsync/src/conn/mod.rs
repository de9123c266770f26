//! Persistent push-channel connection management.
//!
//! [`ConnectionManager`] owns the one WebSocket connection an
//! authenticated session holds. It is constructed at login, torn down at
//! logout, and passed by reference to whichever subsystem needs the push
//! channel — the board and the chat feed share it, each managing its own
//! room membership.
//!
//! # State machine
//!
//! ```text
//! Disconnected → Connecting → Connected
//!                                │ transport drop
//!                                ▼
//!                           Reconnecting ──(bounded retries)──► Connected
//!                                │ attempts exhausted / logout
//!                                ▼
//!                           Disconnected (terminal until next login)
//! ```
//!
//! Room join/leave requests issued while the connection is not
//! `Connected` are dropped, not queued: the caller gets
//! [`ConnError::NotConnected`] and the client misses that room's push
//! traffic until a later explicit change triggers another join.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use boardsync_proto::push::{self, ClientFrame, ServerFrame};

/// Write half of the WebSocket connection.
type WsSink = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// Read half of the WebSocket connection.
type WsRead =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Timeout for establishing the WebSocket connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the push-channel connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnError {
    /// The connection has been lost (or was never established).
    #[error("push channel disconnected")]
    Disconnected,

    /// A room request was issued while the channel was not `Connected`;
    /// the request was dropped, not queued.
    #[error("push channel not connected; room request dropped")]
    NotConnected,

    /// Connecting timed out.
    #[error("push channel connect timed out")]
    Timeout,

    /// The WebSocket layer failed.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// A frame could not be encoded.
    #[error(transparent)]
    Frame(#[from] push::FrameError),
}

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// No connection; also the terminal state after logout or exhausted
    /// reconnect attempts.
    Disconnected,
    /// Initial dial in progress.
    Connecting,
    /// Live connection; room requests and push delivery work.
    Connected,
    /// Transport dropped; bounded retries with growing backoff running.
    Reconnecting,
}

impl std::fmt::Display for ConnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// Bounded-retry reconnect policy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum reconnect attempts before giving up.
    pub max_attempts: u32,
    /// Delay before the first attempt.
    pub initial_delay: Duration,
    /// Cap on the per-attempt delay.
    pub max_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl ReconnectConfig {
    /// Delay before the given 1-based attempt: doubles from
    /// `initial_delay`, capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Events emitted by the connection for subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnEvent {
    /// The connection changed lifecycle state.
    StateChanged(ConnState),
    /// A push notification arrived for a joined room.
    Frame(ServerFrame),
}

/// Owns the session's single push-channel connection.
pub struct ConnectionManager {
    /// WebSocket URL of the push endpoint.
    url: String,
    /// Bearer credential presented during the handshake.
    token: String,
    /// Reconnect policy.
    reconnect: ReconnectConfig,
    /// Current lifecycle state.
    state: Arc<parking_lot::Mutex<ConnState>>,
    /// Write half of the live connection; `None` while not connected.
    sink: Arc<Mutex<Option<WsSink>>>,
    /// Event channel to subscribers.
    events: mpsc::Sender<ConnEvent>,
    /// Set at logout; suppresses reconnection permanently.
    shutdown: Arc<AtomicBool>,
}

impl ConnectionManager {
    /// Creates a manager and the receiver for its events.
    ///
    /// No connection is made until [`connect`](Self::connect) is called.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        reconnect: ReconnectConfig,
    ) -> (Self, mpsc::Receiver<ConnEvent>) {
        let (tx, rx) = mpsc::channel(256);
        let manager = Self {
            url: url.into(),
            token: token.into(),
            reconnect,
            state: Arc::new(parking_lot::Mutex::new(ConnState::Disconnected)),
            sink: Arc::new(Mutex::new(None)),
            events: tx,
            shutdown: Arc::new(AtomicBool::new(false)),
        };
        (manager, rx)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnState {
        *self.state.lock()
    }

    /// Establishes the connection and spawns the read/reconnect task.
    ///
    /// # Errors
    ///
    /// Returns [`ConnError::Timeout`] or [`ConnError::WebSocket`] if the
    /// initial dial fails; no automatic retry happens before the first
    /// successful connect.
    pub async fn connect(&self) -> Result<(), ConnError> {
        self.set_state(ConnState::Connecting).await;
        let (sink, read) = match dial(&self.url, &self.token).await {
            Ok(halves) => halves,
            Err(e) => {
                self.set_state(ConnState::Disconnected).await;
                return Err(e);
            }
        };
        *self.sink.lock().await = Some(sink);
        self.set_state(ConnState::Connected).await;

        tokio::spawn(run_connection(
            read,
            self.url.clone(),
            self.token.clone(),
            self.reconnect.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.sink),
            self.events.clone(),
            Arc::clone(&self.shutdown),
        ));
        Ok(())
    }

    /// Joins a team's room over the live connection.
    ///
    /// # Errors
    ///
    /// Returns [`ConnError::NotConnected`] if the channel is not
    /// `Connected`; the request is dropped, not queued.
    pub async fn join_room(&self, team_id: &str) -> Result<(), ConnError> {
        self.send_control(ClientFrame::JoinRoom {
            team_id: team_id.to_string(),
        })
        .await
    }

    /// Leaves a team's room over the live connection.
    ///
    /// # Errors
    ///
    /// Returns [`ConnError::NotConnected`] if the channel is not
    /// `Connected`; the request is dropped, not queued.
    pub async fn leave_room(&self, team_id: &str) -> Result<(), ConnError> {
        self.send_control(ClientFrame::LeaveRoom {
            team_id: team_id.to_string(),
        })
        .await
    }

    /// Tears the connection down deliberately (logout).
    ///
    /// Terminal: no reconnection happens until a new manager is built
    /// for the next login.
    pub async fn disconnect(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(mut sink) = self.sink.lock().await.take() {
            let _ = sink.send(Message::Close(None)).await;
        }
        self.set_state(ConnState::Disconnected).await;
        tracing::info!("push channel closed (logout)");
    }

    async fn send_control(&self, frame: ClientFrame) -> Result<(), ConnError> {
        if self.state() != ConnState::Connected {
            tracing::warn!(?frame, state = %self.state(), "room request while not connected, dropping");
            return Err(ConnError::NotConnected);
        }
        let text = push::encode_client(&frame)?;
        let mut guard = self.sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            return Err(ConnError::NotConnected);
        };
        sink.send(Message::Text(text.into())).await.map_err(|e| {
            tracing::warn!(err = %e, "room control send failed");
            ConnError::Disconnected
        })
    }

    async fn set_state(&self, next: ConnState) {
        *self.state.lock() = next;
        let _ = self.events.send(ConnEvent::StateChanged(next)).await;
    }
}

/// Dials the push endpoint, presenting the bearer token as a query
/// parameter on the handshake URL.
async fn dial(url: &str, token: &str) -> Result<(WsSink, WsRead), ConnError> {
    let sep = if url.contains('?') { '&' } else { '?' };
    let handshake_url = format!("{url}{sep}token={token}");
    let (stream, _response) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(&handshake_url))
        .await
        .map_err(|_| {
            tracing::warn!(url, "push channel connect timed out");
            ConnError::Timeout
        })?
        .map_err(|e| {
            tracing::warn!(url, err = %e, "push channel connect failed");
            ConnError::WebSocket(e.to_string())
        })?;
    Ok(stream.split())
}

/// Background task: reads frames until the transport drops, then runs the
/// bounded reconnect loop. Exits on logout or exhausted attempts.
#[allow(clippy::too_many_arguments)]
async fn run_connection(
    mut read: WsRead,
    url: String,
    token: String,
    reconnect: ReconnectConfig,
    state: Arc<parking_lot::Mutex<ConnState>>,
    sink: Arc<Mutex<Option<WsSink>>>,
    events: mpsc::Sender<ConnEvent>,
    shutdown: Arc<AtomicBool>,
) {
    loop {
        read_frames(&mut read, &events).await;

        sink.lock().await.take();
        if shutdown.load(Ordering::Relaxed) {
            return;
        }

        *state.lock() = ConnState::Reconnecting;
        let _ = events
            .send(ConnEvent::StateChanged(ConnState::Reconnecting))
            .await;
        tracing::info!("push channel dropped, reconnecting");

        match reconnect_loop(&url, &token, &reconnect, &shutdown).await {
            Some((new_sink, new_read)) => {
                *sink.lock().await = Some(new_sink);
                *state.lock() = ConnState::Connected;
                let _ = events
                    .send(ConnEvent::StateChanged(ConnState::Connected))
                    .await;
                tracing::info!("push channel reconnected");
                read = new_read;
            }
            None => {
                *state.lock() = ConnState::Disconnected;
                let _ = events
                    .send(ConnEvent::StateChanged(ConnState::Disconnected))
                    .await;
                tracing::warn!("push channel reconnect attempts exhausted");
                return;
            }
        }
    }
}

/// Reads and dispatches frames until the connection drops.
///
/// Malformed frames are logged and skipped; the task does not disconnect
/// on bad data.
async fn read_frames(read: &mut WsRead, events: &mpsc::Sender<ConnEvent>) {
    while let Some(msg_result) = read.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match push::decode_server(&text) {
                Ok(frame) => {
                    if events.send(ConnEvent::Frame(frame)).await.is_err() {
                        // Subscriber dropped; nothing left to deliver to.
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!(err = %e, "malformed push frame, skipping");
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("push channel closed by server");
                return;
            }
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_)) => {
                // Keepalive and non-text frames are ignored.
            }
            Err(e) => {
                tracing::warn!(err = %e, "push channel read error");
                return;
            }
        }
    }
}

/// Bounded redial loop. Returns the new halves, or `None` when attempts
/// are exhausted or logout was requested.
async fn reconnect_loop(
    url: &str,
    token: &str,
    reconnect: &ReconnectConfig,
    shutdown: &AtomicBool,
) -> Option<(WsSink, WsRead)> {
    for attempt in 1..=reconnect.max_attempts {
        tokio::time::sleep(reconnect.delay_for(attempt)).await;
        if shutdown.load(Ordering::Relaxed) {
            return None;
        }
        match dial(url, token).await {
            Ok(halves) => return Some(halves),
            Err(e) => {
                tracing::warn!(
                    attempt,
                    max = reconnect.max_attempts,
                    err = %e,
                    "reconnect attempt failed"
                );
            }
        }
    }
    None
}
