//! Settings types.
//!
//! Every struct uses `#[serde(default)]` so a partial settings file only has
//! to name the values it changes. Keys are camelCase on disk.

mod server;
mod services;

pub use server::{AuthSettings, RateLimitSettings, ServerSettings};
pub use services::{GeminiSettings, VisionSettings};

use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgroSettings {
    /// Network listener and storage.
    pub server: ServerSettings,
    /// JWT and cookie settings.
    pub auth: AuthSettings,
    /// Generative-AI service settings.
    pub gemini: GeminiSettings,
    /// Object-detection settings.
    pub vision: VisionSettings,
    /// Per-IP request budgets.
    pub rate_limits: RateLimitSettings,
    /// Default log level when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit JSON log lines instead of compact text.
    pub log_json: bool,
}

impl Default for AgroSettings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            auth: AuthSettings::default(),
            gemini: GeminiSettings::default(),
            vision: VisionSettings::default(),
            rate_limits: RateLimitSettings::default(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl AgroSettings {
    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> crate::Result<()> {
        if self.vision.jpeg_quality == 0 || self.vision.jpeg_quality > 100 {
            return Err(crate::SettingsError::Invalid {
                field: "vision.jpegQuality",
                reason: format!("must be 1-100, got {}", self.vision.jpeg_quality),
            });
        }
        if self.auth.access_ttl_secs == 0 || self.auth.refresh_ttl_secs == 0 {
            return Err(crate::SettingsError::Invalid {
                field: "auth",
                reason: "token lifetimes must be positive".into(),
            });
        }
        Ok(())
    }
}
