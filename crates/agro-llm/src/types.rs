//! Gemini `generateContent` request and response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a conversation turn.
pub const ROLE_USER: &str = "user";
/// Role of a model turn.
pub const ROLE_MODEL: &str = "model";

/// A single conversation turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeminiContent {
    /// `user` or `model`.
    pub role: String,
    /// Text parts.
    pub parts: Vec<TextPart>,
}

impl GeminiContent {
    /// A user turn holding `text`.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ROLE_USER.into(),
            parts: vec![TextPart { text: text.into() }],
        }
    }

    /// A model turn holding `text`.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ROLE_MODEL.into(),
            parts: vec![TextPart { text: text.into() }],
        }
    }
}

/// A text part.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextPart {
    /// The text.
    pub text: String,
}

/// System instruction wrapper.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemInstruction {
    /// Parts containing the instruction text.
    pub parts: Vec<TextPart>,
}

impl SystemInstruction {
    /// Wrap a single instruction string.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            parts: vec![TextPart { text: text.into() }],
        }
    }
}

/// Sampling and output configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Top-K sampling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Top-P sampling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Max output tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// MIME type of the response text (`application/json` for structured output).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    /// OpenAPI-style schema the response must follow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

/// Everything fixed for one use of the model: which model, how it behaves.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfig {
    /// Model id, e.g. `gemini-2.0-flash`.
    pub model: String,
    /// System instruction sent with every request.
    pub system_instruction: String,
    /// Sampling and schema settings.
    pub generation: GenerationConfig,
}

/// Request body for `models/{model}:generateContent`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation so far, ending with the new user turn.
    pub contents: Vec<GeminiContent>,
    /// System instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
    /// Generation config.
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// Build a request from a model config and the turns to send.
    pub fn new(config: &ModelConfig, contents: Vec<GeminiContent>) -> Self {
        let system_instruction = (!config.system_instruction.is_empty())
            .then(|| SystemInstruction::new(config.system_instruction.clone()));
        Self {
            contents,
            system_instruction,
            generation_config: config.generation.clone(),
        }
    }
}

/// Response body of `generateContent`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Response candidates.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if any.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

/// A response candidate.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Candidate content.
    pub content: Option<CandidateContent>,
    /// Finish reason (`STOP`, `MAX_TOKENS`, `SAFETY`, ...).
    pub finish_reason: Option<String>,
}

/// Content of a candidate.
#[derive(Clone, Debug, Deserialize)]
pub struct CandidateContent {
    /// Parts; non-text parts have no `text`.
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

/// A response part.
#[derive(Clone, Debug, Deserialize)]
pub struct ResponsePart {
    /// Text, when this is a text part.
    pub text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ModelConfig {
        ModelConfig {
            model: "gemini-2.0-flash".into(),
            system_instruction: "be brief".into(),
            generation: GenerationConfig {
                temperature: Some(0.1),
                top_k: Some(40),
                max_output_tokens: Some(128),
                response_mime_type: Some("application/json".into()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn request_serializes_camel_case() {
        let req = GenerateContentRequest::new(&config(), vec![GeminiContent::user("hi")]);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 128);
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert!(json["generationConfig"].get("topP").is_none());
    }

    #[test]
    fn empty_instruction_is_omitted() {
        let mut cfg = config();
        cfg.system_instruction.clear();
        let json = serde_json::to_value(GenerateContentRequest::new(&cfg, vec![])).unwrap();
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn response_text_joins_parts() {
        let resp: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"a\":"}, {"text": "1}"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(resp.text().as_deref(), Some("{\"a\":1}"));
        assert_eq!(resp.candidates[0].finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn response_without_candidates_has_no_text() {
        let resp: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.text().is_none());
    }
}
