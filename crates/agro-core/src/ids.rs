//! Branded ID newtypes.
//!
//! WebSocket connections get time-ordered UUID v7 ids so log lines sort by
//! accept time. Token ids (`jti`) are random UUID v4 values.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident, $generate:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh ID.
            #[must_use]
            pub fn new() -> Self {
                Self($generate.to_string())
            }

            /// Borrow the inner string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

branded_id! {
    /// Identifier of one accepted WebSocket connection.
    ConnectionId,
    Uuid::now_v7()
}

branded_id! {
    /// The `jti` claim of an issued JWT.
    TokenId,
    Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_is_v7() {
        let id = ConnectionId::new();
        let parsed = Uuid::parse_str(id.as_str()).unwrap();
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn token_id_is_v4() {
        let id = TokenId::new();
        let parsed = Uuid::parse_str(id.as_str()).unwrap();
        assert_eq!(parsed.get_version(), Some(uuid::Version::Random));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
        assert_ne!(TokenId::new(), TokenId::new());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = TokenId::from("jti-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"jti-1\"");
        let back: TokenId = serde_json::from_str("\"jti-1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn display_matches_inner() {
        let id = ConnectionId::from("conn-7");
        assert_eq!(id.to_string(), "conn-7");
        assert_eq!(id.into_inner(), "conn-7");
    }
}
