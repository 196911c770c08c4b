//! Frame relay: binary images in, annotated JPEG frames out.

use std::sync::Arc;

use agro_vision::InferenceAdapter;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::frame::Frame;
use super::lifecycle::Consumer;

/// Runs each inbound image through the inference adapter.
pub struct VisionConsumer {
    adapter: Arc<InferenceAdapter>,
}

impl VisionConsumer {
    /// A consumer sharing `adapter` with every other vision connection.
    pub fn new(adapter: Arc<InferenceAdapter>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl Consumer for VisionConsumer {
    fn name(&self) -> &'static str {
        "vision"
    }

    async fn on_frame(&mut self, frame: Frame) -> Option<Frame> {
        let data = match frame {
            Frame::Binary(data) => data,
            Frame::Text(text) => {
                info!(bytes = text.len(), "ignoring text frame");
                return None;
            }
        };
        if data.is_empty() {
            debug!("empty image frame, nothing to send");
            return None;
        }

        let bytes = data.len();
        match self.adapter.process(data).await {
            Ok(annotated) => Some(Frame::Binary(annotated)),
            Err(e) => {
                warn!(error = %e, bytes, "skipping frame");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use agro_vision::PassthroughDetector;
    use bytes::Bytes;
    use image::{ImageFormat, RgbImage};

    use super::*;

    fn consumer() -> VisionConsumer {
        VisionConsumer::new(Arc::new(InferenceAdapter::new(
            Arc::new(PassthroughDetector),
            80,
        )))
    }

    fn png(width: u32, height: u32) -> Bytes {
        let mut out = Cursor::new(Vec::new());
        RgbImage::new(width, height)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        Bytes::from(out.into_inner())
    }

    #[tokio::test]
    async fn image_yields_one_jpeg() {
        let reply = consumer().on_frame(Frame::Binary(png(8, 6))).await;
        let Some(Frame::Binary(jpeg)) = reply else {
            panic!("expected binary frame, got {reply:?}");
        };
        let decoded = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[tokio::test]
    async fn empty_payload_sends_nothing() {
        assert_eq!(consumer().on_frame(Frame::Binary(Bytes::new())).await, None);
    }

    #[tokio::test]
    async fn undecodable_payload_sends_nothing() {
        let reply = consumer()
            .on_frame(Frame::Binary(Bytes::from_static(b"not an image")))
            .await;
        assert_eq!(reply, None);
    }

    #[tokio::test]
    async fn text_is_ignored() {
        assert_eq!(consumer().on_frame(Frame::Text("hello".into())).await, None);
    }

    #[tokio::test]
    async fn no_carryover_between_frames() {
        let mut consumer = consumer();
        assert!(consumer.on_frame(Frame::Binary(png(4, 4))).await.is_some());
        assert_eq!(consumer.on_frame(Frame::Binary(Bytes::new())).await, None);
    }
}
