//! Auth cookies and the authenticated-user extractor.

use agro_auth::TokenKind;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::error::{ApiError, TOKEN_MISSING};
use crate::server::AppState;

/// Cookie carrying the access token.
pub const ACCESS_COOKIE: &str = "access";
/// Cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "refresh";

/// An auth cookie readable by the frontend and sent cross-site.
pub fn auth_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(false)
        .secure(secure)
        .same_site(SameSite::None)
        .build()
}

/// Queue removal of both auth cookies.
pub fn clear_auth_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    [ACCESS_COOKIE, REFRESH_COOKIE]
        .into_iter()
        .fold(jar, |jar, name| {
            jar.remove(
                Cookie::build(name)
                    .path("/")
                    .secure(secure)
                    .same_site(SameSite::None),
            )
        })
}

/// The caller of an authenticated route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthUser {
    /// Id from the access token's `user_id` claim.
    pub user_id: i64,
}

/// Access token from `Authorization: Bearer`, else the `access` cookie.
fn access_token(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_owned());
    }
    CookieJar::from_headers(&parts.headers)
        .get(ACCESS_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = access_token(parts) else {
            return Err(ApiError::token(
                StatusCode::UNAUTHORIZED,
                "Authentication credentials were not provided.",
                TOKEN_MISSING,
            ));
        };
        let claims = state.tokens.validate(&token, TokenKind::Access)?;
        Ok(Self {
            user_id: claims.user_id,
        })
    }
}
