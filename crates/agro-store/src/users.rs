//! User accounts.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::errors::{Result, classify};

/// A stored user account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct User {
    /// Row id; the `user_id` claim of issued tokens.
    pub id: i64,
    /// Generated username (a UUID string).
    pub username: String,
    /// Login email, unique.
    pub email: String,
    /// Argon2 PHC string.
    #[serde(skip)]
    pub password_hash: String,
    /// RFC 3339 creation time.
    pub date_joined: String,
}

/// User repository. Stateless; every method takes a `&Connection`.
pub struct UserRepo;

const COLUMNS: &str = "id, username, email, password_hash, date_joined";

impl UserRepo {
    /// Insert a user. Duplicate username or email is a [`StoreError::Conflict`].
    ///
    /// [`StoreError::Conflict`]: crate::StoreError::Conflict
    pub fn create(
        conn: &Connection,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User> {
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn
            .execute(
                "INSERT INTO users (username, email, password_hash, date_joined)
                 VALUES (?1, ?2, ?3, ?4)",
                params![username, email, password_hash, now],
            )
            .map_err(classify)?;
        Ok(User {
            id: conn.last_insert_rowid(),
            username: username.to_owned(),
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
            date_joined: now,
        })
    }

    /// Look a user up by email.
    pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Look a user up by id.
    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<User>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Whether an account with this email exists.
    pub fn email_exists(conn: &Connection, email: &str) -> Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            date_joined: row.get(4)?,
        })
    }
}
