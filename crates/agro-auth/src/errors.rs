//! Authentication errors.

use thiserror::Error;

/// Message for any token that fails signature, format or claim checks.
pub const INVALID_TOKEN: &str = "Token is invalid or expired";
/// Message for a token presented where the other kind was expected.
pub const WRONG_TYPE: &str = "Token has wrong type";
/// Message for a revoked refresh token.
pub const BLACKLISTED: &str = "Token is blacklisted";

/// Errors from hashing or token handling.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token's `exp` is in the past.
    #[error("Token is expired")]
    Expired,

    /// The token cannot be trusted; the message is safe to show clients.
    #[error("{0}")]
    Invalid(String),

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Hash(String),

    /// Signing a token failed.
    #[error("token encoding failed: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
}

/// Convenience alias for auth results.
pub type Result<T> = std::result::Result<T, AuthError>;
