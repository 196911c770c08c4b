//! Listener, storage, auth and rate-limit settings.

use serde::{Deserialize, Serialize};

/// Network listener and storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` picks a free port).
    pub port: u16,
    /// SQLite database path. Relative paths resolve against `~/.agro`.
    pub database_path: String,
    /// Maximum inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Seconds to wait for connections to drain on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_path: "agro.db".to_string(),
            max_message_size: 16 * 1024 * 1024,
            shutdown_timeout_secs: 10,
        }
    }
}

/// JWT and cookie settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// HMAC secret for signing tokens. Empty means "generate at startup".
    pub jwt_secret: String,
    /// Access token lifetime.
    pub access_ttl_secs: u64,
    /// Refresh token lifetime.
    pub refresh_ttl_secs: u64,
    /// Set the `Secure` attribute on auth cookies.
    pub cookie_secure: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_ttl_secs: 5 * 60,
            refresh_ttl_secs: 24 * 60 * 60,
            cookie_secure: true,
        }
    }
}

/// Requests allowed per client IP per minute, by route group.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateLimitSettings {
    /// `/api/users/*`.
    pub users_per_minute: u32,
    /// `/api/inventory/*`.
    pub inventory_per_minute: u32,
    /// `/api/ai/*`.
    pub ai_per_minute: u32,
    /// `/api/test/*`.
    pub test_per_minute: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            users_per_minute: 100,
            inventory_per_minute: 50,
            ai_per_minute: 50,
            test_per_minute: 10,
        }
    }
}
