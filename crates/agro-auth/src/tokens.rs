//! HS256 access and refresh tokens.
//!
//! Both kinds share one secret and one claim layout; `token_type` tells them
//! apart. Validation uses zero leeway, so a token is expired the second after
//! its `exp`.

use std::time::Duration;

use agro_core::TokenId;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::errors::{AuthError, INVALID_TOKEN, Result, WRONG_TYPE};

/// Which of the two token kinds a JWT is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived, authorises API calls.
    Access,
    /// Long-lived, mints new access tokens.
    Refresh,
}

/// JWT payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Token kind.
    pub token_type: TokenKind,
    /// Subject user id.
    pub user_id: i64,
    /// Unique token id, used for revocation.
    pub jti: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

/// A freshly issued access/refresh pair.
#[derive(Clone, Debug)]
pub struct TokenPair {
    /// Encoded access token.
    pub access: String,
    /// Encoded refresh token.
    pub refresh: String,
}

/// Issues and validates tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Build a service from the signing secret and token lifetimes.
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Lifetime of tokens of `kind`.
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    /// Issue a token of `kind` for `user_id`.
    pub fn issue(&self, kind: TokenKind, user_id: i64) -> Result<String> {
        let iat = chrono::Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl(kind).as_secs()).unwrap_or(i64::MAX);
        self.encode(&Claims {
            token_type: kind,
            user_id,
            jti: TokenId::new().into_inner(),
            iat,
            exp: iat.saturating_add(ttl),
        })
    }

    /// Issue both tokens for a login or registration.
    pub fn issue_pair(&self, user_id: i64) -> Result<TokenPair> {
        Ok(TokenPair {
            access: self.issue(TokenKind::Access, user_id)?,
            refresh: self.issue(TokenKind::Refresh, user_id)?,
        })
    }

    /// Sign arbitrary claims.
    pub fn encode(&self, claims: &Claims) -> Result<String> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?)
    }

    /// Decode `token` and check that it is a `kind` token.
    ///
    /// Expiry is reported as [`AuthError::Expired`]; every other failure is
    /// [`AuthError::Invalid`] with a client-safe reason.
    pub fn validate(&self, token: &str, kind: TokenKind) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(INVALID_TOKEN.to_owned()),
            }
        })?;
        if data.claims.token_type != kind {
            return Err(AuthError::Invalid(WRONG_TYPE.to_owned()));
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn service() -> TokenService {
        TokenService::new(
            b"test-secret",
            Duration::from_secs(300),
            Duration::from_secs(86_400),
        )
    }

    #[test]
    fn issued_access_token_validates() {
        let svc = service();
        let token = svc.issue(TokenKind::Access, 7).unwrap();
        let claims = svc.validate(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn pair_has_distinct_jtis() {
        let svc = service();
        let pair = svc.issue_pair(1).unwrap();
        let access = svc.validate(&pair.access, TokenKind::Access).unwrap();
        let refresh = svc.validate(&pair.refresh, TokenKind::Refresh).unwrap();
        assert_ne!(access.jti, refresh.jti);
        assert_eq!(refresh.exp - refresh.iat, 86_400);
    }

    #[test]
    fn wrong_kind_is_invalid() {
        let svc = service();
        let refresh = svc.issue(TokenKind::Refresh, 1).unwrap();
        assert_matches!(
            svc.validate(&refresh, TokenKind::Access),
            Err(AuthError::Invalid(msg)) if msg == WRONG_TYPE
        );
    }

    #[test]
    fn expired_token_is_expired() {
        let svc = service();
        let now = chrono::Utc::now().timestamp();
        let token = svc
            .encode(&Claims {
                token_type: TokenKind::Access,
                user_id: 1,
                jti: "j".into(),
                iat: now - 600,
                exp: now - 10,
            })
            .unwrap();
        assert_matches!(svc.validate(&token, TokenKind::Access), Err(AuthError::Expired));
    }

    #[test]
    fn foreign_signature_is_invalid() {
        let other = TokenService::new(b"other", Duration::from_secs(60), Duration::from_secs(60));
        let token = other.issue(TokenKind::Access, 1).unwrap();
        assert_matches!(
            service().validate(&token, TokenKind::Access),
            Err(AuthError::Invalid(msg)) if msg == INVALID_TOKEN
        );
    }

    #[test]
    fn garbage_is_invalid() {
        assert_matches!(
            service().validate("not.a.jwt", TokenKind::Refresh),
            Err(AuthError::Invalid(_))
        );
    }

    #[test]
    fn claims_serialize_lowercase_kind() {
        let claims = Claims {
            token_type: TokenKind::Refresh,
            user_id: 3,
            jti: "abc".into(),
            iat: 1,
            exp: 2,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["token_type"], "refresh");
        assert_eq!(json["user_id"], 3);
    }
}
