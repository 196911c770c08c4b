//! # agro-server
//!
//! Axum server for the Agro backend.
//!
//! - REST API under `/api`: users (JWT cookies), inventory, AI assistant
//! - WebSocket consumers at `/ws/chat/` and `/ws/vision/`, both driven by the
//!   shared connection lifecycle in [`websocket::lifecycle`]
//! - Per-IP rate limits, `/health`, graceful shutdown

#![deny(unsafe_code)]

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod health;
pub mod rate_limit;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use error::ApiError;
pub use server::{AgroServer, AppState, Services};
pub use shutdown::{DrainOutcome, ShutdownCoordinator};
