//! # agro-auth
//!
//! Credentials for the Agro backend: Argon2id password hashes and HS256
//! access/refresh JWTs. Revocation state lives in `agro-store`; this crate
//! only signs and checks tokens.

#![deny(unsafe_code)]

pub mod errors;
pub mod password;
pub mod tokens;

pub use errors::{AuthError, BLACKLISTED, INVALID_TOKEN, Result, WRONG_TYPE};
pub use password::{hash_password, verify_password};
pub use tokens::{Claims, TokenKind, TokenPair, TokenService};
