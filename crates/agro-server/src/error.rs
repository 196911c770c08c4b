//! HTTP API errors and their JSON bodies.

use std::collections::BTreeMap;

use agro_auth::AuthError;
use agro_store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

/// `error` code: no token was supplied.
pub const TOKEN_MISSING: &str = "token_missing";
/// `error` code: the token is past its `exp`.
pub const TOKEN_EXPIRED: &str = "token_expired";
/// `error` code: the token failed validation for any other reason.
pub const TOKEN_INVALID: &str = "token_invalid";

/// Per-field validation messages, keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Errors returned by API handlers. Each renders as a JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// `{message}` with an arbitrary status.
    #[error("{message}")]
    Message {
        /// Response status.
        status: StatusCode,
        /// User-facing text.
        message: String,
    },

    /// `{message, error}` for token problems.
    #[error("{message}")]
    Token {
        /// Response status.
        status: StatusCode,
        /// User-facing text.
        message: String,
        /// One of [`TOKEN_MISSING`], [`TOKEN_EXPIRED`], [`TOKEN_INVALID`].
        code: &'static str,
    },

    /// 400 with `{field: [messages]}`.
    #[error("invalid input")]
    Validation(FieldErrors),

    /// 404 `{detail: "Not found."}`.
    #[error("not found")]
    NotFound,

    /// 403 once a client exhausts its window.
    #[error("rate limit exceeded")]
    RateLimited,

    /// A fixed JSON body.
    #[error("{status}")]
    Body {
        /// Response status.
        status: StatusCode,
        /// Response body.
        body: Value,
    },

    /// 500; `detail` is logged, `public` is sent.
    #[error("{detail}")]
    Internal {
        /// User-facing text.
        public: &'static str,
        /// Logged cause.
        detail: String,
    },
}

impl ApiError {
    /// `{message}` with `status`.
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Message {
            status,
            message: message.into(),
        }
    }

    /// `{message, error}` with `status`.
    pub fn token(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self::Token {
            status,
            message: message.into(),
            code,
        }
    }

    /// 500 "Internal Server error".
    pub fn internal(detail: impl ToString) -> Self {
        Self::Internal {
            public: "Internal Server error",
            detail: detail.to_string(),
        }
    }

    /// 500 "Unexpected Server error".
    pub fn unexpected(detail: impl ToString) -> Self {
        Self::Internal {
            public: "Unexpected Server error",
            detail: detail.to_string(),
        }
    }

    /// A single-field validation failure.
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        let _ = errors.insert(name.to_owned(), vec![message.into()]);
        Self::Validation(errors)
    }

    /// The HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Message { status, .. } | Self::Token { status, .. } | Self::Body { status, .. } => {
                *status
            }
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::FORBIDDEN,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Message { message, .. } => json!({ "message": message }),
            Self::Token { message, code, .. } => json!({ "message": message, "error": code }),
            Self::Validation(errors) => json!(errors),
            Self::NotFound => json!({ "detail": "Not found." }),
            Self::RateLimited => json!({ "message": "Rate limit exceeded." }),
            Self::Body { body, .. } => body,
            Self::Internal { public, detail } => {
                error!(error = %detail, "request failed");
                json!({ "message": public })
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::NotFound,
            other => Self::internal(other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Expired => Self::token(
                StatusCode::UNAUTHORIZED,
                AuthError::Expired.to_string(),
                TOKEN_EXPIRED,
            ),
            AuthError::Invalid(reason) => {
                Self::token(StatusCode::UNAUTHORIZED, reason, TOKEN_INVALID)
            }
            other => Self::internal(other),
        }
    }
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
