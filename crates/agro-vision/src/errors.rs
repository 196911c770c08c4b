//! Inference errors. All of them are scoped to one frame.

use thiserror::Error;

/// Errors from one pass through the inference pipeline.
#[derive(Debug, Error)]
pub enum VisionError {
    /// The payload is not a decodable image.
    #[error("image decode error: {0}")]
    Decode(String),

    /// The detector failed or returned garbage.
    #[error("inference error: {0}")]
    Inference(String),

    /// Re-encoding the annotated frame failed.
    #[error("image encode error: {0}")]
    Encode(String),
}

/// Convenience alias for vision results.
pub type Result<T> = std::result::Result<T, VisionError>;

/// Attach a pipeline stage to foreign errors.
pub(crate) trait ResultExt<T> {
    fn decode_err(self, what: &str) -> Result<T>;
    fn inference_err(self, what: &str) -> Result<T>;
    fn encode_err(self, what: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn decode_err(self, what: &str) -> Result<T> {
        self.map_err(|e| VisionError::Decode(format!("{what}: {e}")))
    }

    fn inference_err(self, what: &str) -> Result<T> {
        self.map_err(|e| VisionError::Inference(format!("{what}: {e}")))
    }

    fn encode_err(self, what: &str) -> Result<T> {
        self.map_err(|e| VisionError::Encode(format!("{what}: {e}")))
    }
}
