//! Revoked refresh tokens, keyed by `jti`.

use rusqlite::{Connection, params};

use crate::errors::Result;

/// Blacklist repository. Stateless; every method takes a `&Connection`.
pub struct BlacklistRepo;

impl BlacklistRepo {
    /// Revoke a token. Revoking the same `jti` twice is a no-op.
    pub fn add(conn: &Connection, jti: &str, user_id: i64, expires_at: i64) -> Result<()> {
        let _ = conn.execute(
            "INSERT OR IGNORE INTO token_blacklist (jti, user_id, expires_at, blacklisted_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![jti, user_id, expires_at, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Whether `jti` has been revoked.
    pub fn contains(conn: &Connection, jti: &str) -> Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM token_blacklist WHERE jti = ?1",
            params![jti],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Drop entries whose token expired before `now` (unix seconds).
    pub fn purge_expired(conn: &Connection, now: i64) -> Result<usize> {
        let removed = conn.execute(
            "DELETE FROM token_blacklist WHERE expires_at < ?1",
            params![now],
        )?;
        Ok(removed)
    }
}
