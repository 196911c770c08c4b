//! Accept/teardown contract shared by the chat and vision consumers.
//!
//! [`drive`] owns one connection from open to close:
//!
//! 1. `on_connect` runs, then the connection moves to `Open`
//! 2. A reader task pulls socket messages into a bounded ordered queue, so a
//!    peer close is seen even while a frame is being handled. Once
//!    [`INBOUND_QUEUE_DEPTH`] frames are waiting the reader stops reading and
//!    the socket's own flow control applies
//! 3. Frames are handed to `on_frame` one at a time, in arrival order
//! 4. On peer close, transport failure or server shutdown the in-flight
//!    `on_frame` future is dropped and nothing more is sent
//! 5. `on_disconnect` runs exactly once with the close code

use std::time::Instant;

use agro_core::ConnectionId;
use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::frame::{Frame, Inbound};

/// Peer closed normally.
pub const CLOSE_NORMAL: u16 = 1000;
/// Server is shutting down.
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Close frame carried no status code.
pub const CLOSE_NO_STATUS: u16 = 1005;
/// Transport dropped without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Frames buffered ahead of the consumer before the reader stops reading.
pub const INBOUND_QUEUE_DEPTH: usize = 8;

/// Lifecycle state of one connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, consumer not yet initialised.
    Connecting,
    /// Frames are being processed.
    Open,
    /// Teardown in progress.
    Closing,
    /// Resources released.
    Closed,
}

impl ConnectionState {
    /// Whether `self -> next` is a legal move.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Connecting | Self::Open, Self::Closing)
                | (Self::Connecting, Self::Open)
                | (Self::Closing, Self::Closed)
        )
    }
}

/// Rejected state change.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid connection transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    /// Current state.
    pub from: ConnectionState,
    /// Requested state.
    pub to: ConnectionState,
}

/// One accepted socket.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    state: ConnectionState,
    accepted_at: Instant,
    close_code: Option<u16>,
}

impl Connection {
    /// A new connection in `Connecting`.
    pub fn new() -> Self {
        Self {
            id: ConnectionId::new(),
            state: ConnectionState::Connecting,
            accepted_at: Instant::now(),
            close_code: None,
        }
    }

    /// Connection id.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Close code once teardown has begun.
    pub fn close_code(&self) -> Option<u16> {
        self.close_code
    }

    /// Move to `next` if the transition is legal.
    pub fn transition(&mut self, next: ConnectionState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Enter `Closing` with `code`. Only the first call returns `true`.
    pub fn begin_close(&mut self, code: u16) -> bool {
        if self.transition(ConnectionState::Closing).is_err() {
            return false;
        }
        self.close_code = Some(code);
        true
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-connection handler driven by [`drive`].
#[async_trait]
pub trait Consumer: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Allocate per-connection resources. Runs before any frame.
    async fn on_connect(&mut self, _conn: &Connection) {}

    /// Handle one inbound frame, producing at most one reply.
    async fn on_frame(&mut self, frame: Frame) -> Option<Frame>;

    /// Release per-connection resources. Runs once, after the last frame.
    async fn on_disconnect(&mut self, _code: u16) {}
}

enum Exit {
    Peer,
    Shutdown,
    SendFailed,
}

/// Run `consumer` over one connection until it closes; returns it `Closed`.
#[instrument(skip_all, fields(client_id = %conn.id(), consumer = consumer.name()))]
pub async fn drive<C, St, Si>(
    mut conn: Connection,
    mut consumer: C,
    inbound: St,
    mut outbound: Si,
    shutdown: CancellationToken,
) -> Connection
where
    C: Consumer,
    St: Stream<Item = Inbound> + Send + Unpin + 'static,
    Si: Sink<Frame> + Send + Unpin,
{
    consumer.on_connect(&conn).await;
    if let Err(e) = conn.transition(ConnectionState::Open) {
        warn!(error = %e, "connection could not open");
    }
    info!("client connected");

    let closed = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);
    let reader = tokio::spawn(read_inbound(inbound, tx, closed.clone()));

    let exit = loop {
        let frame = tokio::select! {
            biased;
            () = shutdown.cancelled() => break Exit::Shutdown,
            next = rx.recv() => match next {
                Some(frame) => frame,
                None => break Exit::Peer,
            },
        };
        debug!(bytes = frame.len(), "frame received");

        let reply = tokio::select! {
            biased;
            () = shutdown.cancelled() => break Exit::Shutdown,
            () = closed.cancelled() => break Exit::Peer,
            reply = consumer.on_frame(frame) => reply,
        };

        if let Some(reply) = reply {
            let bytes = reply.len();
            if outbound.send(reply).await.is_err() {
                break Exit::SendFailed;
            }
            debug!(bytes, "frame sent");
        }
    };

    let code = match exit {
        Exit::Peer => reader.await.unwrap_or(CLOSE_ABNORMAL),
        Exit::Shutdown => {
            reader.abort();
            CLOSE_GOING_AWAY
        }
        Exit::SendFailed => {
            reader.abort();
            CLOSE_ABNORMAL
        }
    };

    if conn.begin_close(code) {
        if outbound.close().await.is_err() {
            debug!("outbound already closed");
        }
        consumer.on_disconnect(code).await;
    }
    if let Err(e) = conn.transition(ConnectionState::Closed) {
        debug!(error = %e, "connection not closed cleanly");
    }
    info!(
        code,
        duration_ms = u64::try_from(conn.accepted_at.elapsed().as_millis()).unwrap_or(u64::MAX),
        "client disconnected"
    );
    conn
}

/// Forward frames until the peer closes; returns the close code.
async fn read_inbound<St>(
    mut inbound: St,
    tx: mpsc::Sender<Frame>,
    closed: CancellationToken,
) -> u16
where
    St: Stream<Item = Inbound> + Unpin,
{
    let code = loop {
        match inbound.next().await {
            Some(Inbound::Frame(frame)) => {
                if tx.send(frame).await.is_err() {
                    break CLOSE_ABNORMAL;
                }
            }
            Some(Inbound::Close(code)) => break code.unwrap_or(CLOSE_NO_STATUS),
            None => break CLOSE_ABNORMAL,
        }
    };
    closed.cancel();
    code
}
