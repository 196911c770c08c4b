//! # agro-core
//!
//! Shared vocabulary for the Agro crates:
//!
//! - **Branded IDs**: [`ConnectionId`] and [`TokenId`] as newtypes over UUID strings
//! - **Logging**: `tracing` subscriber setup and an in-memory capture layer for tests

#![deny(unsafe_code)]

pub mod ids;
pub mod logging;

pub use ids::{ConnectionId, TokenId};
