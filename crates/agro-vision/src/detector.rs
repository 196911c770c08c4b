//! Object detectors.
//!
//! The model itself runs outside this process. [`RemoteDetector`] talks to it
//! over HTTP; [`PassthroughDetector`] stands in when none is configured.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::{Result, ResultExt, VisionError};

/// One detected object, in pixel coordinates of the submitted frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label, e.g. `"apple"`.
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// `[x1, y1, x2, y2]`, top-left to bottom-right.
    pub bbox: [f32; 4],
}

/// Finds objects in a frame.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Detect objects in `frame`.
    async fn detect(&self, frame: Arc<RgbImage>) -> Result<Vec<Detection>>;
}

/// Detector that never finds anything. Frames pass through unannotated.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughDetector;

#[async_trait]
impl Detector for PassthroughDetector {
    async fn detect(&self, _frame: Arc<RgbImage>) -> Result<Vec<Detection>> {
        Ok(Vec::new())
    }
}

#[derive(Deserialize)]
struct DetectResponse {
    detections: Vec<Detection>,
}

/// Detector backed by an HTTP inference service.
///
/// Posts the frame as PNG to `{base_url}/detect` and expects
/// `{"detections": [{"label", "confidence", "bbox"}]}`.
#[derive(Clone, Debug)]
pub struct RemoteDetector {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl RemoteDetector {
    /// Create a detector for the service at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/detect", base_url.trim_end_matches('/')),
            timeout,
        }
    }
}

fn encode_png(frame: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    frame
        .write_to(&mut buf, ImageFormat::Png)
        .inference_err("png encode")?;
    Ok(buf.into_inner())
}

#[async_trait]
impl Detector for RemoteDetector {
    #[instrument(skip_all, fields(width = frame.width(), height = frame.height()))]
    async fn detect(&self, frame: Arc<RgbImage>) -> Result<Vec<Detection>> {
        let png = tokio::task::spawn_blocking(move || encode_png(&frame))
            .await
            .inference_err("png encode task")??;

        let response = self
            .http
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(png)
            .send()
            .await
            .inference_err("detector request")?;

        let status = response.status();
        if !status.is_success() {
            return Err(VisionError::Inference(format!(
                "detector returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: DetectResponse = response.json().await.inference_err("detector response")?;
        debug!(count = body.detections.len(), "detections received");
        Ok(body.detections)
    }
}
