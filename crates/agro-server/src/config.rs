//! Server configuration.

use std::time::Duration;

use agro_settings::{AgroSettings, RateLimitSettings};

/// Configuration for the Agro server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Upper bound on one chat turn against the model.
    pub chat_timeout: Duration,
    /// Set `Secure` on auth cookies.
    pub cookie_secure: bool,
    /// Per-IP request budgets.
    pub rate_limits: RateLimitSettings,
}

impl ServerConfig {
    /// Derive the server configuration from loaded settings.
    pub fn from_settings(settings: &AgroSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            max_message_size: settings.server.max_message_size,
            chat_timeout: Duration::from_secs(settings.gemini.request_timeout_secs),
            cookie_secure: settings.auth.cookie_secure,
            rate_limits: settings.rate_limits.clone(),
        }
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_message_size: 16 * 1024 * 1024, // 16 MB
            chat_timeout: Duration::from_secs(30),
            cookie_secure: true,
            rate_limits: RateLimitSettings::default(),
        }
    }
}
