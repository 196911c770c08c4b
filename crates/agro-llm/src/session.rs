//! Multi-turn chat sessions with structured JSON replies.
//!
//! A [`SessionFactory`] is injected at construction time; each WebSocket
//! connection asks it for one [`ChatSession`] and drops the session on
//! disconnect. `send` takes `&mut self`, so a session can never have two
//! requests in flight.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::client::GeminiClient;
use crate::errors::{LlmError, Result};
use crate::types::{GeminiContent, GenerateContentRequest, GenerationConfig, ModelConfig};

/// Most steps a reply may carry.
pub const MAX_STEPS: usize = 5;

const CHAT_INSTRUCTION: &str = include_str!("prompts/chat.txt");

/// Kind of a chat reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyType {
    /// A greeting.
    Greeting,
    /// A clarifying question back to the user.
    Question,
    /// An answer, possibly with steps.
    Response,
    /// An error message.
    Error,
}

/// One structured chat reply, sent to the client as-is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredReply {
    /// Reply kind.
    #[serde(rename = "type")]
    pub kind: ReplyType,
    /// Human-readable text.
    pub message: String,
    /// Optional instructions, at most [`MAX_STEPS`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<String>>,
}

impl StructuredReply {
    /// An error reply with `message`.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ReplyType::Error,
            message: message.into(),
            steps: None,
        }
    }

    /// Parse model output, enforcing the reply schema.
    pub fn parse(text: &str) -> Result<Self> {
        let reply: Self =
            serde_json::from_str(text).map_err(|e| LlmError::Schema(e.to_string()))?;
        let step_count = reply.steps.as_ref().map_or(0, Vec::len);
        if step_count > MAX_STEPS {
            return Err(LlmError::Schema(format!(
                "{step_count} steps exceeds the limit of {MAX_STEPS}"
            )));
        }
        Ok(reply)
    }
}

/// One conversation with the model.
#[async_trait]
pub trait ChatSession: Send {
    /// Submit the next user turn and wait for the structured reply.
    async fn send(&mut self, text: &str) -> Result<StructuredReply>;
}

/// Opens fresh sessions; shared across connections.
pub trait SessionFactory: Send + Sync {
    /// Open a new, empty conversation.
    fn create(&self) -> Box<dyn ChatSession>;
}

/// Model configuration for the inventory chat assistant.
pub fn chat_model_config(model: impl Into<String>) -> ModelConfig {
    ModelConfig {
        model: model.into(),
        system_instruction: CHAT_INSTRUCTION.to_owned(),
        generation: GenerationConfig {
            temperature: Some(0.1),
            top_k: Some(40),
            top_p: Some(0.9),
            max_output_tokens: Some(128),
            response_mime_type: Some("application/json".into()),
            response_schema: Some(reply_schema()),
        },
    }
}

fn reply_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "type": {
                "type": "STRING",
                "enum": ["greeting", "question", "response", "error"]
            },
            "message": {"type": "STRING"},
            "steps": {
                "type": "ARRAY",
                "items": {"type": "STRING"},
                "maxItems": MAX_STEPS
            }
        },
        "required": ["type", "message"]
    })
}

/// Gemini-backed chat session. History is kept locally and replayed on each turn.
pub struct GeminiChatSession {
    client: Arc<GeminiClient>,
    config: Arc<ModelConfig>,
    history: Vec<GeminiContent>,
}

impl GeminiChatSession {
    /// Start an empty session.
    pub fn new(client: Arc<GeminiClient>, config: Arc<ModelConfig>) -> Self {
        Self {
            client,
            config,
            history: Vec::new(),
        }
    }

    /// Completed turns so far (user and model alternating).
    pub fn history(&self) -> &[GeminiContent] {
        &self.history
    }
}

#[async_trait]
impl ChatSession for GeminiChatSession {
    async fn send(&mut self, text: &str) -> Result<StructuredReply> {
        let mut contents = self.history.clone();
        contents.push(GeminiContent::user(text));
        let request = GenerateContentRequest::new(&self.config, contents);

        let raw = self
            .client
            .generate_content(&self.config.model, &request)
            .await?;
        let reply = StructuredReply::parse(&raw)?;

        // Only successful exchanges become part of the conversation.
        self.history.push(GeminiContent::user(text));
        self.history.push(GeminiContent::model(raw));
        debug!(turns = self.history.len(), "chat turn complete");
        Ok(reply)
    }
}

/// Factory producing [`GeminiChatSession`]s over one shared client.
#[derive(Clone, Debug)]
pub struct GeminiSessionFactory {
    client: Arc<GeminiClient>,
    config: Arc<ModelConfig>,
}

impl GeminiSessionFactory {
    /// Build a factory for the chat assistant on `model`.
    pub fn new(client: Arc<GeminiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            config: Arc::new(chat_model_config(model)),
        }
    }
}

impl SessionFactory for GeminiSessionFactory {
    fn create(&self) -> Box<dyn ChatSession> {
        Box::new(GeminiChatSession::new(
            Arc::clone(&self.client),
            Arc::clone(&self.config),
        ))
    }
}
