//! # agro-store
//!
//! `SQLite` persistence for the Agro backend: a pooled connection factory,
//! embedded migrations, and stateless repositories for users, products and
//! revoked refresh tokens.
//!
//! Repositories take a borrowed [`rusqlite::Connection`]; callers check one
//! out of the [`ConnectionPool`] for the duration of a request.

#![deny(unsafe_code)]

pub mod blacklist;
pub mod connection;
pub mod errors;
pub mod migrations;
pub mod price;
pub mod products;
pub mod users;

pub use blacklist::BlacklistRepo;
pub use connection::{ConnectionConfig, ConnectionPool, PooledConnection, new_file, new_in_memory};
pub use errors::{Result, StoreError};
pub use migrations::run_migrations;
pub use price::{Price, PriceError};
pub use products::{NewProduct, Product, ProductChanges, ProductRepo};
pub use users::{User, UserRepo};

/// Open a pool for `path` (`":memory:"` for an in-memory database) and migrate it.
pub fn open(path: &str, config: &ConnectionConfig) -> Result<ConnectionPool> {
    let pool = if path == ":memory:" {
        new_in_memory(config)?
    } else {
        new_file(path, config)?
    };
    let _ = run_migrations(&*pool.get()?)?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_is_migrated() {
        let pool = open(":memory:", &ConnectionConfig::default()).unwrap();
        let conn = pool.get().unwrap();
        assert_eq!(
            migrations::current_version(&conn).unwrap(),
            migrations::latest_version()
        );
    }

    #[test]
    fn open_file_persists_across_pools() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agro.db");
        let path = path.to_str().unwrap();
        {
            let pool = open(path, &ConnectionConfig::default()).unwrap();
            let _ = UserRepo::create(&pool.get().unwrap(), "u", "u@example.com", "h").unwrap();
        }
        let pool = open(path, &ConnectionConfig::default()).unwrap();
        assert!(UserRepo::email_exists(&pool.get().unwrap(), "u@example.com").unwrap());
    }
}
