//! WebSocket endpoints: `/ws/chat/` and `/ws/vision/`.

pub mod chat;
pub mod frame;
pub mod lifecycle;
pub mod vision;

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use tokio::sync::watch;

use crate::server::AppState;
use chat::ChatConsumer;
use frame::{Frame, Inbound};
use lifecycle::{CLOSE_ABNORMAL, Connection, Consumer, drive};
use vision::VisionConsumer;

/// Counts open WebSocket connections for `/health` and shutdown draining.
#[derive(Debug)]
pub struct ConnectionTracker {
    open: watch::Sender<usize>,
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        let (open, _) = watch::channel(0);
        Self { open }
    }
}

impl ConnectionTracker {
    /// Register a connection; it is released when the guard drops.
    pub fn enter(self: &Arc<Self>) -> ConnectionGuard {
        self.open.send_modify(|n| *n += 1);
        ConnectionGuard {
            tracker: Arc::clone(self),
        }
    }

    /// Open connections right now.
    pub fn count(&self) -> usize {
        *self.open.borrow()
    }

    /// Resolves once no connection is open.
    pub async fn drained(&self) {
        let mut open = self.open.subscribe();
        // the sender lives in `self`, so this cannot fail
        let _ = open.wait_for(|n| *n == 0).await;
    }
}

/// Releases one tracked connection on drop.
pub struct ConnectionGuard {
    tracker: Arc<ConnectionTracker>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.tracker.open.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Routes for both consumers.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ws/chat/", get(chat_upgrade))
        .route("/ws/vision/", get(vision_upgrade))
}

/// GET /ws/chat/
async fn chat_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let consumer = ChatConsumer::new(state.sessions.clone(), state.config.chat_timeout);
    upgrade(ws, state, consumer)
}

/// GET /ws/vision/
async fn vision_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let consumer = VisionConsumer::new(state.inference.clone());
    upgrade(ws, state, consumer)
}

fn upgrade<C: Consumer + 'static>(ws: WebSocketUpgrade, state: AppState, consumer: C) -> Response {
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| run_socket(socket, state, consumer))
}

/// Adapt the axum socket to frames and hand it to the lifecycle driver.
async fn run_socket<C: Consumer + 'static>(socket: WebSocket, state: AppState, consumer: C) {
    let _guard = state.connections.enter();
    let (sink, stream) = socket.split();

    let inbound = Box::pin(stream.filter_map(|msg| async move {
        match msg {
            Ok(msg) => Inbound::from_message(msg),
            Err(_) => Some(Inbound::Close(Some(CLOSE_ABNORMAL))),
        }
    }));
    let outbound = Box::pin(sink.with(|frame: Frame| async move {
        Ok::<_, axum::Error>(Message::from(frame))
    }));

    let _ = drive(
        Connection::new(),
        consumer,
        inbound,
        outbound,
        state.shutdown.token(),
    )
    .await;
}
