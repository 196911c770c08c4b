//! Server shutdown: stop the listener, close every WebSocket with 1001 and
//! wait for the connection tasks to release their guards.
//!
//! `axum::serve` stops accepting and finishes in-flight HTTP requests, but an
//! upgraded socket runs on its own task. [`ShutdownCoordinator::drain`] waits
//! on the [`ConnectionTracker`] for those.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::websocket::ConnectionTracker;

/// How a drain ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Listener stopped and every connection closed.
    Drained,
    /// The budget ran out with connections still open.
    TimedOut {
        /// Connections left behind.
        open_connections: usize,
    },
}

/// Owns the server-wide cancellation token and the open-connection count.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    connections: Arc<ConnectionTracker>,
}

impl ShutdownCoordinator {
    /// Coordinator draining `connections`.
    pub fn new(connections: Arc<ConnectionTracker>) -> Self {
        Self {
            token: CancellationToken::new(),
            connections,
        }
    }

    /// Token the listener, pruner and every connection select on.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancel the token. Connections start closing with 1001.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Whether [`trigger`](Self::trigger) has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Trigger, then wait up to `budget` for `listener` to stop and for
    /// every tracked connection to close.
    pub async fn drain(&self, listener: JoinHandle<()>, budget: Duration) -> DrainOutcome {
        self.trigger();
        info!(
            open_connections = self.connections.count(),
            budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
            "draining"
        );

        let settle = async {
            if let Err(e) = listener.await {
                warn!(error = %e, "listener task failed");
            }
            self.connections.drained().await;
        };
        if tokio::time::timeout(budget, settle).await.is_ok() {
            info!("listener stopped and all connections closed");
            return DrainOutcome::Drained;
        }

        let open_connections = self.connections.count();
        warn!(open_connections, "drain timed out, abandoning open connections");
        DrainOutcome::TimedOut { open_connections }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> (ShutdownCoordinator, Arc<ConnectionTracker>) {
        let tracker = Arc::new(ConnectionTracker::default());
        (ShutdownCoordinator::new(Arc::clone(&tracker)), tracker)
    }

    fn listener(token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { token.cancelled().await })
    }

    #[test]
    fn trigger_reaches_every_token() {
        let (coord, _) = coordinator();
        let tokens = [coord.token(), coord.token()];
        assert!(!coord.is_shutting_down());
        coord.trigger();
        coord.trigger();
        assert!(coord.is_shutting_down());
        assert!(tokens.iter().all(CancellationToken::is_cancelled));
    }

    #[tokio::test]
    async fn drain_waits_for_connections_to_close() {
        let (coord, tracker) = coordinator();
        let guard = tracker.enter();
        let token = coord.token();
        let conn = tokio::spawn(async move {
            token.cancelled().await;
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(guard);
        });

        let outcome = coord
            .drain(listener(coord.token()), Duration::from_secs(5))
            .await;
        assert_eq!(outcome, DrainOutcome::Drained);
        assert_eq!(tracker.count(), 0);
        conn.await.unwrap();
    }

    #[tokio::test]
    async fn drain_reports_connections_left_open() {
        let (coord, tracker) = coordinator();
        let _stuck = tracker.enter();

        let started = std::time::Instant::now();
        let outcome = coord
            .drain(listener(coord.token()), Duration::from_millis(50))
            .await;
        assert_eq!(
            outcome,
            DrainOutcome::TimedOut {
                open_connections: 1
            }
        );
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn drain_with_nothing_open_is_immediate() {
        let (coord, _) = coordinator();
        let outcome = coord
            .drain(listener(coord.token()), Duration::from_secs(5))
            .await;
        assert_eq!(outcome, DrainOutcome::Drained);
    }
}
