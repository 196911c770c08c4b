//! Errors from the Gemini client and the services built on it.

use thiserror::Error;

/// Errors that can occur while talking to the model.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport failure, including request timeouts.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description from the response body.
        message: String,
    },

    /// No candidate carried any text.
    #[error("empty response from model")]
    EmptyResponse,

    /// The model's text did not match the declared response schema.
    #[error("response does not match schema: {0}")]
    Schema(String),
}

impl LlmError {
    /// Whether this was a local or remote timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout(),
            Self::Api { status, .. } => *status == 408 || *status == 504,
            _ => false,
        }
    }
}

/// Convenience alias for LLM results.
pub type Result<T> = std::result::Result<T, LlmError>;
