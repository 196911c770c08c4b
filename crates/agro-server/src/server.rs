//! `AgroServer`: Axum HTTP and WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use agro_auth::TokenService;
use agro_llm::{Recommender, SessionFactory};
use agro_store::{BlacklistRepo, ConnectionPool, StoreError};
use agro_vision::InferenceAdapter;
use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::api;
use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::rate_limit::{RateLimiters, WINDOW};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::{self, ConnectionTracker};

/// Collaborators injected at construction.
pub struct Services {
    /// Database pool (already migrated).
    pub pool: ConnectionPool,
    /// JWT issuer/validator.
    pub tokens: TokenService,
    /// Opens one chat session per `/ws/chat/` connection.
    pub sessions: Arc<dyn SessionFactory>,
    /// Backs `POST /api/ai/assistant`.
    pub recommender: Arc<dyn Recommender>,
    /// Shared by every `/ws/vision/` connection.
    pub inference: InferenceAdapter,
}

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database pool.
    pub pool: ConnectionPool,
    /// JWT issuer/validator.
    pub tokens: Arc<TokenService>,
    /// Chat session factory.
    pub sessions: Arc<dyn SessionFactory>,
    /// Recommendation engine.
    pub recommender: Arc<dyn Recommender>,
    /// Inference adapter.
    pub inference: Arc<InferenceAdapter>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Open WebSocket connections.
    pub connections: Arc<ConnectionTracker>,
    /// When the server started.
    pub start_time: Instant,
}

/// The main Agro server.
pub struct AgroServer {
    state: AppState,
    limiters: RateLimiters,
}

impl AgroServer {
    /// Create a new server.
    pub fn new(config: ServerConfig, services: Services) -> Self {
        let limiters = RateLimiters::from_settings(&config.rate_limits);
        let connections = Arc::new(ConnectionTracker::default());
        let state = AppState {
            pool: services.pool,
            tokens: Arc::new(services.tokens),
            sessions: services.sessions,
            recommender: services.recommender,
            inference: Arc::new(services.inference),
            config: Arc::new(config),
            shutdown: Arc::new(ShutdownCoordinator::new(Arc::clone(&connections))),
            connections,
            start_time: Instant::now(),
        };
        Self { state, limiters }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .merge(api::routes(&self.limiters))
            .merge(websocket::routes())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind the listener and serve until shutdown.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(self.state.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        let token = self.state.shutdown.token();
        let limiters = self.limiters.clone();
        let pool = self.state.pool.clone();
        let prune_token = token.clone();
        let _pruner = tokio::spawn(async move {
            let mut tick = tokio::time::interval(WINDOW);
            loop {
                tokio::select! {
                    () = prune_token.cancelled() => break,
                    _ = tick.tick() => {
                        limiters.prune_all();
                        purge_revoked(&pool);
                    }
                }
            }
        });

        let handle = tokio::spawn(async move {
            info!(%addr, "listening");
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "server error");
            }
            info!("listener stopped");
        });
        Ok((addr, handle))
    }

    /// Handler state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }
}

/// Forget revoked tokens that have expired anyway.
fn purge_revoked(pool: &ConnectionPool) {
    let now = chrono::Utc::now().timestamp();
    let purged = pool
        .get()
        .map_err(StoreError::from)
        .and_then(|conn| BlacklistRepo::purge_expired(&conn, now));
    match purged {
        Ok(0) => {}
        Ok(count) => debug!(count, "purged expired blacklist entries"),
        Err(e) => warn!(error = %e, "blacklist purge failed"),
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.connections.count(),
    ))
}
