//! HTTP API tests driven through the router with `tower::ServiceExt::oneshot`.

mod common;

use assert_matches::assert_matches;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use common::server;

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl Reply {
    /// `name=value` pairs from `Set-Cookie`, joined for a `Cookie` header.
    fn cookies(&self) -> String {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .filter_map(|pair| pair.split_once('='))
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.to_owned())
    }
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    cookies: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(cookies) = cookies {
        req = req.header(COOKIE, cookies);
    }
    let body = match body {
        Some(json) => {
            req = req.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    Reply {
        status,
        headers,
        body,
    }
}

async fn post(app: &Router, uri: &str, cookies: Option<&str>, body: Option<Value>) -> Reply {
    call(app, Method::POST, uri, cookies, body).await
}

/// Register `email`; the reply carries the session cookies.
async fn session(app: &Router, email: &str) -> Reply {
    let reply = post(
        app,
        "/api/users/register",
        None,
        Some(json!({ "email": email, "password": "s3cret!" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    reply
}

async fn register(app: &Router, email: &str) -> String {
    session(app, email).await.cookies()
}

fn product(name: &str) -> Value {
    json!({
        "name": name,
        "category": "Vegetable",
        "price": "12.50",
        "stock": 40,
        "region": "Nashik",
        "description": "Fresh from the field",
    })
}

// ── Users ──

#[tokio::test]
async fn register_sets_cookies_and_returns_uuid_username() {
    let app = server().router();
    let reply = post(
        &app,
        "/api/users/register",
        None,
        Some(json!({ "email": "a@farm.test", "password": "pw" })),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Register Successful");
    let username = reply.body["user"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(username).is_ok(), "{username}");
    assert!(reply.cookie("access").is_some());
    assert!(reply.cookie("refresh").is_some());
}

#[tokio::test]
async fn register_validates_and_rejects_duplicates() {
    let app = server().router();
    let missing = post(&app, "/api/users/register", None, Some(json!({"password": "x"}))).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["message"], "Email is required.");

    let no_pw = post(&app, "/api/users/register", None, Some(json!({"email": "b@farm.test"}))).await;
    assert_eq!(no_pw.body["message"], "Password is required.");

    let _ = register(&app, "b@farm.test").await;
    let dup = post(
        &app,
        "/api/users/register",
        None,
        Some(json!({ "email": "b@farm.test", "password": "other" })),
    )
    .await;
    assert_eq!(dup.status, StatusCode::BAD_REQUEST);
    assert_eq!(dup.body["message"], "Email already in use.");
}

#[tokio::test]
async fn live_session_blocks_register_and_login() {
    let app = server().router();
    let cookies = register(&app, "c@farm.test").await;

    let again = post(
        &app,
        "/api/users/login",
        Some(&cookies),
        Some(json!({ "email": "c@farm.test", "password": "s3cret!" })),
    )
    .await;
    assert_eq!(again.status, StatusCode::FORBIDDEN);
    assert_eq!(again.body["message"], "Valid access token already exists.");

    let garbage = post(
        &app,
        "/api/users/login",
        Some("access=not-a-jwt"),
        Some(json!({ "email": "c@farm.test", "password": "s3cret!" })),
    )
    .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.body["error"], "token_invalid");
}

#[tokio::test]
async fn login_outcomes() {
    let app = server().router();
    let _ = register(&app, "d@farm.test").await;

    let unknown = post(
        &app,
        "/api/users/login",
        None,
        Some(json!({ "email": "nobody@farm.test", "password": "x" })),
    )
    .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown.body["message"], "User does not exist.");

    let wrong = post(
        &app,
        "/api/users/login",
        None,
        Some(json!({ "email": "d@farm.test", "password": "wrong" })),
    )
    .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Invalid Credentials");

    let ok = post(
        &app,
        "/api/users/login",
        None,
        Some(json!({ "email": "d@farm.test", "password": "s3cret!" })),
    )
    .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.body["message"], "Login Successful");
    assert!(ok.cookie("access").is_some());
}

#[tokio::test]
async fn current_user_via_cookie_or_bearer() {
    let app = server().router();
    let reply = post(
        &app,
        "/api/users/register",
        None,
        Some(json!({ "email": "e@farm.test", "password": "pw" })),
    )
    .await;
    let access = reply.cookie("access").unwrap();

    let by_cookie = post(&app, "/api/users/user", Some(&reply.cookies()), None).await;
    assert_eq!(by_cookie.status, StatusCode::OK);
    assert_eq!(by_cookie.body["message"], "User retrieved successfully");
    assert_eq!(by_cookie.body["user"]["email"], "e@farm.test");
    assert_eq!(by_cookie.body["user"]["username"], reply.body["user"]);

    let req = Request::post("/api/users/user")
        .header(AUTHORIZATION, format!("Bearer {access}"))
        .body(Body::empty())
        .unwrap();
    let by_header = app.clone().oneshot(req).await.unwrap();
    assert_eq!(by_header.status(), StatusCode::OK);

    let anonymous = post(&app, "/api/users/user", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["error"], "token_missing");
}

#[tokio::test]
async fn verify_and_refresh() {
    let app = server().router();
    let registered = session(&app, "f@farm.test").await;
    let cookies = registered.cookies();

    let verified = post(&app, "/api/users/verify", Some(&cookies), None).await;
    assert_eq!(verified.status, StatusCode::OK);
    assert_eq!(verified.body["message"], "Access token verified");

    let missing = post(&app, "/api/users/verify", None, None).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["message"], "Access token is required");

    let bad = post(&app, "/api/users/verify", Some("access=junk"), None).await;
    assert_eq!(bad.status, StatusCode::UNAUTHORIZED);
    assert_eq!(bad.body["message"], "Invalid access token");

    let refreshed = post(&app, "/api/users/refresh", Some(&cookies), None).await;
    assert_eq!(refreshed.status, StatusCode::OK);
    assert_eq!(refreshed.body["message"], "Token refresh successful");
    assert!(refreshed.cookie("access").is_some());
    assert!(refreshed.cookie("refresh").is_none());

    let no_refresh = post(&app, "/api/users/refresh", None, None).await;
    assert_eq!(no_refresh.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_refresh.body["error"], "token_missing");

    // an access token is not a refresh token
    let access = format!("refresh={}", registered.cookie("access").unwrap());
    let wrong_kind = post(&app, "/api/users/refresh", Some(&access), None).await;
    assert_eq!(wrong_kind.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_kind.body["message"], "Invalid refresh token");
    assert_eq!(wrong_kind.body["error"], "token_invalid");
}

#[tokio::test]
async fn logout_blacklists_refresh_token() {
    let app = server().router();
    let cookies = register(&app, "g@farm.test").await;

    let missing = post(&app, "/api/users/logout", None, None).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["error"], "token_missing");
    assert!(missing.headers.get(SET_COOKIE).is_none());

    let out = post(&app, "/api/users/logout", Some(&cookies), None).await;
    assert_eq!(out.status, StatusCode::OK);
    assert_eq!(out.body["message"], "User logged out successfully.");
    assert_eq!(out.cookie("access").as_deref(), Some(""));
    assert_eq!(out.cookie("refresh").as_deref(), Some(""));

    let replay = post(&app, "/api/users/refresh", Some(&cookies), None).await;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
    assert_eq!(replay.body["message"], "Invalid refresh token");

    let twice = post(&app, "/api/users/logout", Some(&cookies), None).await;
    assert_eq!(twice.status, StatusCode::UNAUTHORIZED);
    assert_eq!(twice.body["message"], "Invalid refresh token.");
    assert!(twice.cookie("refresh").is_some());
}

// ── Inventory ──

#[tokio::test]
async fn inventory_crud_roundtrip() {
    let app = server().router();
    let cookies = register(&app, "farmer@farm.test").await;

    let created = post(&app, "/api/inventory/create", Some(&cookies), Some(product("Red Onions"))).await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["slug"], "red-onions");
    assert_eq!(created.body["price"], "12.50");
    assert_eq!(created.body["stock"], 40);
    assert!(created.body["owner"].is_i64());

    let _ = post(&app, "/api/inventory/create", Some(&cookies), Some(product("Garlic"))).await;

    let listed = call(&app, Method::GET, "/api/inventory/list", Some(&cookies), None).await;
    assert_eq!(listed.status, StatusCode::OK);
    let names: Vec<_> = listed.body.as_array().unwrap().iter().map(|p| p["name"].clone()).collect();
    assert_eq!(names, [json!("Red Onions"), json!("Garlic")]);

    let limited = call(&app, Method::GET, "/api/inventory/list?limit=1", Some(&cookies), None).await;
    assert_eq!(limited.body.as_array().unwrap().len(), 1);

    let patched = call(
        &app,
        Method::PATCH,
        "/api/inventory/update/red-onions/",
        Some(&cookies),
        Some(json!({ "stock": 5, "price": 9 })),
    )
    .await;
    assert_eq!(patched.status, StatusCode::OK, "{}", patched.body);
    assert_eq!(patched.body["stock"], 5);
    assert_eq!(patched.body["price"], "9.00");
    assert_eq!(patched.body["name"], "Red Onions");

    let mut replacement = product("White Onions");
    replacement["description"] = Value::Null;
    let put = call(
        &app,
        Method::PUT,
        "/api/inventory/update/red-onions/",
        Some(&cookies),
        Some(replacement),
    )
    .await;
    assert_eq!(put.status, StatusCode::OK, "{}", put.body);
    assert_eq!(put.body["name"], "White Onions");
    assert_eq!(put.body["slug"], "red-onions");
    assert_eq!(put.body["description"], Value::Null);

    let deleted = call(&app, Method::DELETE, "/api/inventory/delete/red-onions/", Some(&cookies), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = call(&app, Method::DELETE, "/api/inventory/delete/red-onions/", Some(&cookies), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.body, json!({ "detail": "Not found." }));
}

#[tokio::test]
async fn inventory_validation_errors() {
    let app = server().router();
    let cookies = register(&app, "v@farm.test").await;

    let mut bad = product("Wheat");
    bad["price"] = json!("1.234");
    bad["stock"] = json!(-3);
    bad["category"] = json!("");
    let reply = post(&app, "/api/inventory/create", Some(&cookies), Some(bad)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["price"], json!(["Ensure that there are no more than 2 decimal places."]));
    assert_eq!(reply.body["stock"], json!(["Ensure this value is greater than or equal to 0."]));
    assert_eq!(reply.body["category"], json!(["This field may not be blank."]));

    let partial_put = call(
        &app,
        Method::PUT,
        "/api/inventory/update/anything/",
        Some(&cookies),
        Some(json!({ "stock": 1 })),
    )
    .await;
    assert_eq!(partial_put.status, StatusCode::NOT_FOUND);

    let limit = call(&app, Method::GET, "/api/inventory/list?limit=ten", Some(&cookies), None).await;
    assert_eq!(limit.status, StatusCode::BAD_REQUEST);
    assert_eq!(limit.body["limit"], json!(["A valid integer is required."]));
}

#[tokio::test]
async fn put_requires_every_field() {
    let app = server().router();
    let cookies = register(&app, "p@farm.test").await;
    let _ = post(&app, "/api/inventory/create", Some(&cookies), Some(product("Maize"))).await;

    let reply = call(
        &app,
        Method::PUT,
        "/api/inventory/update/maize/",
        Some(&cookies),
        Some(json!({ "stock": 1 })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["name"], json!(["This field is required."]));
    assert!(reply.body.get("stock").is_none());
}

#[tokio::test]
async fn duplicate_product_name_is_rejected() {
    let app = server().router();
    let cookies = register(&app, "dup@farm.test").await;
    let first = post(&app, "/api/inventory/create", Some(&cookies), Some(product("Rice"))).await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = post(&app, "/api/inventory/create", Some(&cookies), Some(product("Rice"))).await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert_matches!(second.body["non_field_errors"].as_array(), Some(errs) if errs.len() == 1);
}

#[tokio::test]
async fn products_are_scoped_to_their_owner() {
    let app = server().router();
    let alice = register(&app, "alice@farm.test").await;
    let bob = register(&app, "bob@farm.test").await;

    let _ = post(&app, "/api/inventory/create", Some(&alice), Some(product("Barley"))).await;
    // same name under another owner is fine
    let bobs = post(&app, "/api/inventory/create", Some(&bob), Some(product("Barley"))).await;
    assert_eq!(bobs.status, StatusCode::CREATED);

    let listed = call(&app, Method::GET, "/api/inventory/list", Some(&bob), None).await;
    assert_eq!(listed.body.as_array().unwrap().len(), 1);

    let _ = call(&app, Method::DELETE, "/api/inventory/delete/barley/", Some(&bob), None).await;
    let other = call(
        &app,
        Method::PATCH,
        "/api/inventory/update/barley/",
        Some(&bob),
        Some(json!({ "stock": 0 })),
    )
    .await;
    assert_eq!(other.status, StatusCode::NOT_FOUND);

    let alices = call(&app, Method::GET, "/api/inventory/list", Some(&alice), None).await;
    assert_eq!(alices.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn inventory_requires_authentication() {
    let app = server().router();
    let reply = call(&app, Method::GET, "/api/inventory/list", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["message"], "Authentication credentials were not provided.");
}

// ── AI assistant ──

#[tokio::test]
async fn assistant_returns_plan() {
    let app = server().router();
    let cookies = register(&app, "ai@farm.test").await;
    let reply = post(
        &app,
        "/api/ai/assistant",
        Some(&cookies),
        Some(json!({ "cropType": "Wheat", "landArea": 500, "season": "Rabi", "soilQuality": "Loamy" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["crop"], "Wheat");
    assert_eq!(reply.body["data"]["landarea"], "500");
}

#[tokio::test]
async fn assistant_errors() {
    let app = server().router();
    let cookies = register(&app, "ai2@farm.test").await;

    let incomplete = post(
        &app,
        "/api/ai/assistant",
        Some(&cookies),
        Some(json!({ "cropType": "Wheat", "landArea": 0, "season": "Rabi", "soilQuality": "Loamy" })),
    )
    .await;
    assert_eq!(incomplete.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        incomplete.body["error"],
        "All fields (cropType, landArea, season, soilQuality) are required"
    );

    let failed = post(
        &app,
        "/api/ai/assistant",
        Some(&cookies),
        Some(json!({ "cropType": "Unknown", "landArea": 1, "season": "Rabi", "soilQuality": "Loamy" })),
    )
    .await;
    assert_eq!(failed.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(failed.body["message"], "AI response could not be generated.");
}

// ── Pages, health, rate limits ──

#[tokio::test]
async fn test_pages() {
    let app = server().router();
    let home = call(&app, Method::GET, "/api/test/home", None, None).await;
    assert_eq!(home.body, "This is Home Page");
    let about = call(&app, Method::GET, "/api/test/about", None, None).await;
    assert_eq!(about.body, "This is About Page");
}

#[tokio::test]
async fn rate_limit_is_per_group_and_per_ip() {
    let app = server().router();
    for _ in 0..10 {
        let ok = call(&app, Method::GET, "/api/test/home", None, None).await;
        assert_eq!(ok.status, StatusCode::OK);
    }
    let limited = call(&app, Method::GET, "/api/test/home", None, None).await;
    assert_eq!(limited.status, StatusCode::FORBIDDEN);
    assert_eq!(limited.body["message"], "Rate limit exceeded.");

    // another client address has its own window
    let req = Request::get("/api/test/about")
        .header("x-forwarded-for", "203.0.113.9")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::OK);

    // other groups are unaffected
    let health = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);
    let verify = post(&app, "/api/users/verify", None, None).await;
    assert_eq!(verify.status, StatusCode::BAD_REQUEST);
}
