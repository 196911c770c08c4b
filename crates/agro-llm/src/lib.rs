//! # agro-llm
//!
//! Gemini access for the Agro backend.
//!
//! - [`GeminiClient`]: one shared HTTP client for `generateContent`
//! - [`session`]: per-connection chat sessions with structured replies
//! - [`recommend`]: one-shot farming plans for the assistant endpoint

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod recommend;
pub mod session;
pub mod types;

pub use client::{DEFAULT_BASE_URL, GeminiClient};
pub use errors::{LlmError, Result};
pub use recommend::{CropQuery, FarmingPlan, GeminiRecommender, Recommender};
pub use session::{
    ChatSession, GeminiChatSession, GeminiSessionFactory, ReplyType, SessionFactory,
    StructuredReply,
};
