//! Chat relay: text frames in, structured JSON replies out.

use std::sync::Arc;
use std::time::Duration;

use agro_llm::{ChatSession, SessionFactory, StructuredReply};
use async_trait::async_trait;
use tracing::{debug, warn};

use super::frame::Frame;
use super::lifecycle::{Connection, Consumer};

/// Reply to an empty or non-text frame.
pub const EMPTY_MESSAGE: &str = "No message received.";
/// Reply when the model call fails for any reason.
pub const REMOTE_FAILURE: &str = "Internal server error:";

/// Relays each text frame to a per-connection chat session.
pub struct ChatConsumer {
    factory: Arc<dyn SessionFactory>,
    timeout: Duration,
    session: Option<Box<dyn ChatSession>>,
}

impl ChatConsumer {
    /// A consumer that opens its session from `factory` on connect.
    pub fn new(factory: Arc<dyn SessionFactory>, timeout: Duration) -> Self {
        Self {
            factory,
            timeout,
            session: None,
        }
    }

    async fn relay(&mut self, text: &str) -> StructuredReply {
        let session = self.session.get_or_insert_with(|| self.factory.create());
        match tokio::time::timeout(self.timeout, session.send(text)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(error = %e, "chat turn failed");
                StructuredReply::error(REMOTE_FAILURE)
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "chat turn timed out");
                StructuredReply::error(REMOTE_FAILURE)
            }
        }
    }
}

/// Serialize a reply into a text frame.
fn reply_frame(reply: &StructuredReply) -> Frame {
    let text = serde_json::to_string(reply).unwrap_or_else(|e| {
        warn!(error = %e, "failed to serialize chat reply");
        format!(r#"{{"type":"error","message":"{REMOTE_FAILURE}"}}"#)
    });
    Frame::Text(text)
}

#[async_trait]
impl Consumer for ChatConsumer {
    fn name(&self) -> &'static str {
        "chat"
    }

    async fn on_connect(&mut self, _conn: &Connection) {
        self.session = Some(self.factory.create());
    }

    async fn on_frame(&mut self, frame: Frame) -> Option<Frame> {
        let text = match frame {
            Frame::Text(text) if !text.is_empty() => text,
            _ => {
                debug!("empty chat frame");
                return Some(reply_frame(&StructuredReply::error(EMPTY_MESSAGE)));
            }
        };
        let reply = self.relay(&text).await;
        Some(reply_frame(&reply))
    }

    async fn on_disconnect(&mut self, _code: u16) {
        self.session = None;
    }
}
