//! Minimal Gemini REST client (API key auth, non-streaming).

use std::time::Duration;

use tracing::{debug, error, instrument};

use crate::errors::{LlmError, Result};
use crate::types::{GenerateContentRequest, GenerateContentResponse};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Shared, cheaply cloneable Gemini client.
///
/// Holds no per-conversation state, so one instance serves every session.
#[derive(Clone, Debug)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiClient {
    /// Create a client; `timeout` bounds each request end to end.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), api_key, base_url, timeout)
    }

    /// Create a client reusing an existing `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
            timeout,
        }
    }

    /// Whether an API key is configured.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn api_url(&self, model: &str, action: &str) -> String {
        format!(
            "{}/models/{model}:{action}?key={}",
            self.base_url, self.api_key
        )
    }

    /// Call `generateContent` and return the first candidate's text.
    #[instrument(skip_all, fields(model = %model))]
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<String> {
        debug!(turns = request.contents.len(), "sending generateContent");

        let response = self
            .http
            .post(self.api_url(model, "generateContent"))
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = parse_api_error(&body, status.as_u16());
            error!(status = status.as_u16(), %message, "Gemini API error");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        body.text().ok_or(LlmError::EmptyResponse)
    }
}

/// Pull `error.message` out of a Gemini error body, or fall back to the raw text.
fn parse_api_error(body: &str, status: u16) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(str::to_owned))
        .unwrap_or_else(|| format!("HTTP {status}: {body}"))
}
