//! # agro
//!
//! Agro server binary. Loads settings, opens the database, builds the
//! Gemini and inference services and serves HTTP and WebSocket traffic
//! until Ctrl-C or SIGTERM.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use agro_auth::TokenService;
use agro_core::logging::{LogFormat, init_subscriber};
use agro_llm::{GeminiClient, GeminiRecommender, GeminiSessionFactory};
use agro_server::{AgroServer, DrainOutcome, ServerConfig, Services};
use agro_settings::AgroSettings;
use agro_settings::loader::agro_home;
use agro_store::ConnectionConfig;
use agro_vision::{Detector, InferenceAdapter, PassthroughDetector, RemoteDetector};
use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::Parser;
use rand::RngCore;
use tracing::{info, warn};

/// Agro inventory server.
#[derive(Parser, Debug)]
#[command(name = "agro", about = "Agro inventory server")]
struct Cli {
    /// Settings file (defaults to `~/.agro/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the `SQLite` database (overrides settings).
    #[arg(long)]
    db_path: Option<PathBuf>,
}

impl Cli {
    fn load_settings(&self) -> Result<AgroSettings> {
        let mut settings = match &self.config {
            Some(path) => agro_settings::load_settings_from_path(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => agro_settings::load_settings().context("Failed to load settings")?,
        };
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(path) = &self.db_path {
            settings.server.database_path = path.to_string_lossy().into_owned();
        }
        Ok(settings)
    }
}

/// Relative database paths live under `home`; `:memory:` is left alone.
fn resolve_db_path(configured: &str, home: &Path) -> PathBuf {
    let path = Path::new(configured);
    if configured == ":memory:" || path.is_absolute() {
        path.to_path_buf()
    } else {
        home.join(path)
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// 32 random bytes, base64 encoded.
fn ephemeral_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

fn build_detector(settings: &AgroSettings) -> Arc<dyn Detector> {
    let timeout = Duration::from_secs(settings.vision.request_timeout_secs);
    match &settings.vision.detector_url {
        Some(url) => {
            info!(%url, "using remote detector");
            Arc::new(RemoteDetector::new(url, timeout))
        }
        None => {
            info!("no detector configured, frames pass through unannotated");
            Arc::new(PassthroughDetector)
        }
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("Failed to listen for ctrl-c")?,
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for ctrl-c")?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let mut settings = args.load_settings()?;

    let format = if settings.log_json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    init_subscriber(&settings.log_level, format);

    if settings.auth.jwt_secret.is_empty() {
        warn!("no JWT secret configured, using a random per-process secret");
        settings.auth.jwt_secret = ephemeral_secret();
    }
    if settings.gemini.api_key.is_empty() {
        warn!("GEMINI_API_KEY is not set, chat and recommendations will fail");
    }

    let db_path = resolve_db_path(&settings.server.database_path, &agro_home());
    if db_path != Path::new(":memory:") {
        ensure_parent_dir(&db_path)?;
    }
    let pool = agro_store::open(&db_path.to_string_lossy(), &ConnectionConfig::default())
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!(path = %db_path.display(), "database ready");

    let gemini = Arc::new(GeminiClient::new(
        settings.gemini.api_key.clone(),
        settings.gemini.base_url.clone(),
        Duration::from_secs(settings.gemini.request_timeout_secs),
    ));
    let services = Services {
        pool,
        tokens: TokenService::new(
            settings.auth.jwt_secret.as_bytes(),
            Duration::from_secs(settings.auth.access_ttl_secs),
            Duration::from_secs(settings.auth.refresh_ttl_secs),
        ),
        sessions: Arc::new(GeminiSessionFactory::new(
            Arc::clone(&gemini),
            settings.gemini.model.clone(),
        )),
        recommender: Arc::new(GeminiRecommender::new(
            Arc::clone(&gemini),
            settings.gemini.model.clone(),
        )),
        inference: InferenceAdapter::new(build_detector(&settings), settings.vision.jpeg_quality),
    };

    let server = AgroServer::new(ServerConfig::from_settings(&settings), services);
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    info!("agro listening on http://{addr}");

    shutdown_signal().await?;

    info!("shutting down");
    let budget = Duration::from_secs(settings.server.shutdown_timeout_secs);
    match server.shutdown().drain(handle, budget).await {
        DrainOutcome::Drained => info!("shutdown complete"),
        DrainOutcome::TimedOut { open_connections } => {
            warn!(open_connections, "exiting with connections still open");
        }
    }
    Ok(())
}
