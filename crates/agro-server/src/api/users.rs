//! `/api/users/*`: registration, login, token refresh/verify, logout.
//!
//! Tokens travel in the `access` and `refresh` cookies. Every route is
//! `POST`; only `/api/users/user` requires authentication.

use agro_auth::{AuthError, BLACKLISTED, Claims, TokenKind, hash_password, verify_password};
use agro_store::{BlacklistRepo, StoreError, User, UserRepo};
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum_extra::extract::cookie::CookieJar;
use bytes::Bytes;
use serde_json::{Value, json};
use tracing::{debug, info};
use uuid::Uuid;

use super::{blocking, db, json_body, str_field};
use crate::auth::{ACCESS_COOKIE, AuthUser, REFRESH_COOKIE, auth_cookie, clear_auth_cookies};
use crate::error::{ApiError, ApiResult, TOKEN_EXPIRED, TOKEN_INVALID, TOKEN_MISSING};
use crate::server::AppState;

/// User routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/register", post(register))
        .route("/api/users/login", post(login))
        .route("/api/users/logout", post(logout))
        .route("/api/users/refresh", post(refresh))
        .route("/api/users/verify", post(verify))
        .route("/api/users/user", post(current_user))
}

type SessionResponse = ApiResult<(CookieJar, Json<Value>)>;

fn cookie_value(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
}

/// Validate a refresh token, treating revoked ones as invalid.
fn validate_refresh(state: &AppState, token: &str) -> ApiResult<Claims> {
    let claims = state.tokens.validate(token, TokenKind::Refresh)?;
    if BlacklistRepo::contains(&*db(state)?, &claims.jti)? {
        return Err(AuthError::Invalid(BLACKLISTED.into()).into());
    }
    Ok(claims)
}

/// Refuse to log in again while either cookie still holds a live token.
fn reject_live_tokens(state: &AppState, jar: &CookieJar) -> ApiResult<()> {
    if let Some(token) = cookie_value(jar, ACCESS_COOKIE) {
        match state.tokens.validate(&token, TokenKind::Access) {
            Ok(_) => {
                return Err(ApiError::message(
                    StatusCode::FORBIDDEN,
                    "Valid access token already exists.",
                ));
            }
            Err(AuthError::Expired) => {}
            Err(e) => return Err(e.into()),
        }
    }
    if let Some(token) = cookie_value(jar, REFRESH_COOKIE) {
        match validate_refresh(state, &token) {
            Ok(_) => {
                return Err(ApiError::message(
                    StatusCode::FORBIDDEN,
                    "Valid refresh token already exists.",
                ));
            }
            Err(ApiError::Token {
                code: TOKEN_EXPIRED,
                ..
            }) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// `email` and `password` from the body.
fn credentials(body: &Value) -> ApiResult<(String, String)> {
    let email = str_field(body, "email")
        .ok_or_else(|| ApiError::message(StatusCode::BAD_REQUEST, "Email is required."))?;
    let password = str_field(body, "password")
        .ok_or_else(|| ApiError::message(StatusCode::BAD_REQUEST, "Password is required."))?;
    Ok((email.to_owned(), password.to_owned()))
}

/// Issue a token pair as cookies.
fn start_session(state: &AppState, jar: CookieJar, user: &User, message: &str) -> SessionResponse {
    let pair = state.tokens.issue_pair(user.id)?;
    let secure = state.config.cookie_secure;
    let jar = jar
        .add(auth_cookie(ACCESS_COOKIE, pair.access, secure))
        .add(auth_cookie(REFRESH_COOKIE, pair.refresh, secure));
    Ok((jar, Json(json!({ "message": message, "user": user.username }))))
}

fn email_in_use() -> ApiError {
    ApiError::message(StatusCode::BAD_REQUEST, "Email already in use.")
}

/// POST /api/users/register
async fn register(State(state): State<AppState>, jar: CookieJar, body: Bytes) -> SessionResponse {
    reject_live_tokens(&state, &jar)?;
    let (email, password) = credentials(&json_body(&body))?;

    if UserRepo::email_exists(&*db(&state)?, &email)? {
        return Err(email_in_use());
    }
    let hash = blocking(move || hash_password(&password)).await??;

    let username = Uuid::new_v4().to_string();
    let user = match UserRepo::create(&*db(&state)?, &username, &email, &hash) {
        Ok(user) => user,
        Err(StoreError::Conflict(_)) => return Err(email_in_use()),
        Err(e) => return Err(e.into()),
    };
    info!(user_id = user.id, "user registered");
    start_session(&state, jar, &user, "Register Successful")
}

/// POST /api/users/login
async fn login(State(state): State<AppState>, jar: CookieJar, body: Bytes) -> SessionResponse {
    reject_live_tokens(&state, &jar)?;
    let (email, password) = credentials(&json_body(&body))?;

    let user = UserRepo::find_by_email(&*db(&state)?, &email)?
        .ok_or_else(|| ApiError::message(StatusCode::BAD_REQUEST, "User does not exist."))?;

    let stored = user.password_hash.clone();
    if !blocking(move || verify_password(&password, &stored)).await? {
        debug!(user_id = user.id, "wrong password");
        return Err(ApiError::message(StatusCode::UNAUTHORIZED, "Invalid Credentials"));
    }
    info!(user_id = user.id, "user logged in");
    start_session(&state, jar, &user, "Login Successful")
}

/// POST /api/users/logout
///
/// Both cookies are cleared whatever the outcome, once a refresh cookie was sent.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let Some(token) = cookie_value(&jar, REFRESH_COOKIE) else {
        return ApiError::token(StatusCode::BAD_REQUEST, "Refresh token required", TOKEN_MISSING)
            .into_response();
    };

    let outcome = match revoke(&state, &token) {
        Ok(()) => Json(json!({ "message": "User logged out successfully." })).into_response(),
        Err(ApiError::Token { message, .. }) => {
            debug!(reason = %message, "logout with unusable refresh token");
            ApiError::message(StatusCode::UNAUTHORIZED, "Invalid refresh token.").into_response()
        }
        Err(e) => ApiError::Internal {
            public: "Unexpected Server error.",
            detail: e.to_string(),
        }
        .into_response(),
    };
    (clear_auth_cookies(jar, state.config.cookie_secure), outcome).into_response()
}

fn revoke(state: &AppState, token: &str) -> ApiResult<()> {
    let claims = validate_refresh(state, token)?;
    BlacklistRepo::add(&*db(state)?, &claims.jti, claims.user_id, claims.exp)?;
    info!(user_id = claims.user_id, "refresh token revoked");
    Ok(())
}

/// POST /api/users/refresh
async fn refresh(State(state): State<AppState>, jar: CookieJar) -> SessionResponse {
    let token = cookie_value(&jar, REFRESH_COOKIE).ok_or_else(|| {
        ApiError::token(StatusCode::BAD_REQUEST, "Refresh token is required", TOKEN_MISSING)
    })?;

    let claims = match validate_refresh(&state, &token) {
        Ok(claims) => claims,
        Err(ApiError::Token {
            code: TOKEN_EXPIRED,
            ..
        }) => {
            return Err(ApiError::token(
                StatusCode::UNAUTHORIZED,
                "Expired refresh token",
                TOKEN_EXPIRED,
            ));
        }
        Err(ApiError::Token { .. }) => {
            return Err(ApiError::token(
                StatusCode::UNAUTHORIZED,
                "Invalid refresh token",
                TOKEN_INVALID,
            ));
        }
        Err(e) => return Err(e),
    };

    let access = state.tokens.issue(TokenKind::Access, claims.user_id)?;
    let jar = jar.add(auth_cookie(ACCESS_COOKIE, access, state.config.cookie_secure));
    Ok((jar, Json(json!({ "message": "Token refresh successful" }))))
}

/// POST /api/users/verify
async fn verify(State(state): State<AppState>, jar: CookieJar) -> ApiResult<Json<Value>> {
    let token = cookie_value(&jar, ACCESS_COOKIE).ok_or_else(|| {
        ApiError::token(StatusCode::BAD_REQUEST, "Access token is required", TOKEN_MISSING)
    })?;

    match state.tokens.validate(&token, TokenKind::Access) {
        Ok(_) => Ok(Json(json!({ "message": "Access token verified" }))),
        Err(AuthError::Expired) => Err(ApiError::token(
            StatusCode::UNAUTHORIZED,
            "Access token expired",
            TOKEN_EXPIRED,
        )),
        Err(AuthError::Invalid(_)) => Err(ApiError::token(
            StatusCode::UNAUTHORIZED,
            "Invalid access token",
            TOKEN_INVALID,
        )),
        Err(e) => Err(ApiError::unexpected(e)),
    }
}

/// POST /api/users/user
async fn current_user(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Value>> {
    let user = UserRepo::find_by_id(&*db(&state)?, auth.user_id)?
        .ok_or_else(|| ApiError::message(StatusCode::NOT_FOUND, "User does not exist"))?;
    Ok(Json(json!({
        "message": "User retrieved successfully",
        "user": { "username": user.username, "email": user.email },
    })))
}
