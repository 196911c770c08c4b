//! One image in, one annotated JPEG out.

use std::sync::Arc;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use tracing::{debug, instrument};

use crate::annotate::annotate;
use crate::detector::Detector;
use crate::errors::{Result, ResultExt, VisionError};

/// Default JPEG quality for annotated frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Stateless decode → detect → annotate → encode pipeline.
///
/// Holds no per-frame state; concurrent calls are independent. CPU-bound
/// steps run on the blocking pool so one large frame does not stall other
/// connections.
#[derive(Clone)]
pub struct InferenceAdapter {
    detector: Arc<dyn Detector>,
    jpeg_quality: u8,
}

impl std::fmt::Debug for InferenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceAdapter")
            .field("jpeg_quality", &self.jpeg_quality)
            .finish_non_exhaustive()
    }
}

impl InferenceAdapter {
    /// Build an adapter; `jpeg_quality` is clamped to `1..=100`.
    pub fn new(detector: Arc<dyn Detector>, jpeg_quality: u8) -> Self {
        Self {
            detector,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    /// Run the whole pipeline on one encoded image.
    #[instrument(skip_all, fields(bytes = input.len()))]
    pub async fn process(&self, input: Bytes) -> Result<Bytes> {
        if input.is_empty() {
            return Err(VisionError::Decode("empty payload".into()));
        }

        let frame = tokio::task::spawn_blocking(move || decode(&input))
            .await
            .decode_err("decode task")??;
        let frame = Arc::new(frame);

        let detections = self.detector.detect(Arc::clone(&frame)).await?;
        debug!(count = detections.len(), "annotating frame");

        let quality = self.jpeg_quality;
        let encoded = tokio::task::spawn_blocking(move || {
            let mut frame = Arc::try_unwrap(frame).unwrap_or_else(|shared| (*shared).clone());
            annotate(&mut frame, &detections);
            encode_jpeg(&frame, quality)
        })
        .await
        .encode_err("encode task")??;

        Ok(Bytes::from(encoded))
    }
}

fn decode(input: &[u8]) -> Result<RgbImage> {
    Ok(image::load_from_memory(input)
        .decode_err("frame")?
        .to_rgb8())
}

fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(frame)
        .encode_err("jpeg")?;
    Ok(out)
}
