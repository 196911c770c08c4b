//! Remote service settings: the Gemini API and the detection service.

use serde::{Deserialize, Serialize};

/// Generative-AI service settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeminiSettings {
    /// API key. Read from `GEMINI_API_KEY` when unset in the file.
    pub api_key: String,
    /// Model used for chat and recommendations.
    pub model: String,
    /// API base URL (overridable for tests and proxies).
    pub base_url: String,
    /// Upper bound for one remote call.
    pub request_timeout_secs: u64,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Object-detection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisionSettings {
    /// Base URL of the detection service. Frames pass through unannotated when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detector_url: Option<String>,
    /// Quality of the re-encoded JPEG frame (1-100).
    pub jpeg_quality: u8,
    /// Upper bound for one detection call.
    pub request_timeout_secs: u64,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            detector_url: None,
            jpeg_quality: 80,
            request_timeout_secs: 30,
        }
    }
}
