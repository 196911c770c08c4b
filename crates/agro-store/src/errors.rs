//! Error types for the persistence layer.

use thiserror::Error;

/// Errors returned by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Which migration failed and why.
        message: String,
    },

    /// A uniqueness or check constraint rejected the write.
    #[error("constraint violated: {0}")]
    Conflict(String),

    /// The requested row does not exist (or is not visible to the caller).
    #[error("not found: {0}")]
    NotFound(String),
}

/// Convenience alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Turn constraint failures into [`StoreError::Conflict`], leave the rest as-is.
pub(crate) fn classify(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(code, msg)
            if code.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(msg.clone().unwrap_or_else(|| code.to_string()))
        }
        _ => StoreError::Sqlite(err),
    }
}
