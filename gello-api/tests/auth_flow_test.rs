/// Integration tests for sign-up, sign-in and session handling
///
/// These tests drive the router end-to-end over the in-memory store and
/// identity provider:
/// - Registration creates a member profile and starts a session
/// - Cookie sessions, including renewal from the refresh cookie
/// - Logout clears both cookies
/// - CSRF double-submit enforcement on mutating requests

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{TestContext, PASSWORD};
use gello_shared::db::store::GelloStore;
use gello_shared::models::user::UserRole;
use serde_json::json;

fn login_request(ctx: &TestContext, email: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::COOKIE, format!("gello-csrf={}", ctx.csrf_token))
        .header("x-csrf-token", &ctx.csrf_token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": email, "password": password }).to_string(),
        ))
        .unwrap()
}

fn session_request(cookie: String) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri("/api/auth/session")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_register_creates_member_profile() {
    let ctx = TestContext::new();

    let ada = ctx.register("ada").await;

    let profile = ctx.store.find_user(ada.id).await.unwrap().unwrap();
    assert_eq!(profile.email, "ada@example.com");
    assert_eq!(profile.display_name, "ada");
    assert_eq!(profile.role, UserRole::Member);
    assert_eq!(profile.total_points, 0);
    assert_eq!(profile.team_id, None);

    let me = ctx.get("/api/users/me", &ada).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["id"], ada.id.to_string());
}

#[tokio::test]
async fn test_register_sets_session_cookies() {
    let ctx = TestContext::new();

    let response = ctx
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "grace@example.com",
                "password": PASSWORD,
                "display_name": "Grace",
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["session"], true);
    assert!(response.cookie("sb-access-token").is_some());
    assert!(response.cookie("sb-refresh-token").is_some());

    for cookie in response.set_cookies() {
        assert!(cookie.contains("HttpOnly"), "{}", cookie);
        assert!(cookie.contains("SameSite=Lax"), "{}", cookie);
    }
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let ctx = TestContext::new();
    ctx.register("ada").await;

    let response = ctx
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "ADA@example.com",
                "password": PASSWORD,
                "display_name": "Ada again",
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_validation() {
    let ctx = TestContext::new();

    let response = ctx
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "not-an-email",
                "password": "123",
                "display_name": "   ",
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "validation_error");

    let fields: Vec<&str> = response.body["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|d| d["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["display_name", "email", "password"]);
}

#[tokio::test]
async fn test_login() {
    let ctx = TestContext::new();
    let ada = ctx.register("ada").await;

    let response = ctx.send(login_request(&ctx, "ada@example.com", PASSWORD)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["user"]["id"], ada.id.to_string());
    assert!(response.body["expires_in"].as_i64().unwrap() > 0);

    let access_token = response.body["access_token"].as_str().unwrap();
    assert_eq!(response.cookie("sb-access-token").as_deref(), Some(access_token));
}

#[tokio::test]
async fn test_login_wrong_password() {
    let ctx = TestContext::new();
    ctx.register("ada").await;

    let response = ctx
        .send(login_request(&ctx, "ada@example.com", "wrong password"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.cookie("sb-access-token").is_none());

    let response = ctx
        .send(login_request(&ctx, "nobody@example.com", PASSWORD))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_from_access_cookie() {
    let ctx = TestContext::new();
    let ada = ctx.register("ada").await;

    let response = ctx
        .send(session_request(format!("sb-access-token={}", ada.token)))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["authenticated"], true);
    assert_eq!(response.body["user"]["email"], "ada@example.com");
}

#[tokio::test]
async fn test_session_without_cookies() {
    let ctx = TestContext::new();

    let response = ctx
        .send(
            Request::builder()
                .uri("/api/auth/session")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["authenticated"], false);
    assert!(response.body["user"].is_null());
}

#[tokio::test]
async fn test_session_renewed_from_refresh_cookie() {
    let ctx = TestContext::new();
    ctx.register("ada").await;
    let login = ctx.send(login_request(&ctx, "ada@example.com", PASSWORD)).await;
    let refresh_token = login.cookie("sb-refresh-token").unwrap();

    // expired or missing access cookie, valid refresh cookie
    let response = ctx
        .send(session_request(format!(
            "sb-access-token=garbage; sb-refresh-token={}",
            refresh_token
        )))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["authenticated"], true);
    assert!(response.cookie("sb-access-token").is_some());

    let rotated = response.cookie("sb-refresh-token").unwrap();
    assert_ne!(rotated, refresh_token);

    // the old refresh token was consumed
    let response = ctx
        .send(session_request(format!("sb-refresh-token={}", refresh_token)))
        .await;

    assert_eq!(response.body["authenticated"], false);
    assert!(response
        .set_cookies()
        .iter()
        .all(|cookie| cookie.contains("Max-Age=0")));
}

#[tokio::test]
async fn test_refresh_endpoint() {
    let ctx = TestContext::new();
    ctx.register("ada").await;
    let login = ctx.send(login_request(&ctx, "ada@example.com", PASSWORD)).await;
    let refresh_token = login.cookie("sb-refresh-token").unwrap();

    let response = ctx
        .call(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh_token })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["access_token"].is_string());

    let response = ctx
        .call(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh_token })),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = ctx.call(Method::POST, "/api/auth/refresh", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_cookies() {
    let ctx = TestContext::new();
    let ada = ctx.register("ada").await;
    let sessions_before = ctx.auth.active_sessions().await;

    let response = ctx
        .call(Method::POST, "/api/auth/logout", Some(&ada.token), None)
        .await;

    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let cleared = response.set_cookies();
    assert_eq!(cleared.len(), 2);
    assert!(cleared.iter().all(|cookie| cookie.contains("Max-Age=0")));
    assert_eq!(response.cookie("sb-access-token").as_deref(), Some(""));
    assert!(ctx.auth.active_sessions().await < sessions_before);
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let ctx = TestContext::new();

    let response = ctx.call(Method::GET, "/api/boards", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = ctx
        .call(Method::GET, "/api/boards", Some("not-a-jwt"), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_without_profile_rejected() {
    let ctx = TestContext::new();
    let ada = ctx.register("ada").await;

    ctx.store.delete_user(ada.id).await.unwrap();

    let response = ctx.get("/api/users/me", &ada).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_access_cookie_authenticates() {
    let ctx = TestContext::new();
    let ada = ctx.register("ada").await;

    let response = ctx
        .send(
            Request::builder()
                .uri("/api/users/me")
                .header(header::COOKIE, format!("sb-access-token={}", ada.token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["email"], "ada@example.com");
}

#[tokio::test]
async fn test_mutation_without_csrf_rejected() {
    let ctx = TestContext::new();
    let ada = ctx.register("ada").await;

    let response = ctx
        .send(
            Request::builder()
                .method(Method::PUT)
                .uri("/api/users/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", ada.token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "display_name": "Ada L" }).to_string()))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), "csrf_failed");

    // header and cookie present but different
    let other = gello_shared::auth::csrf::issue_token(common::CSRF_SECRET);
    let response = ctx
        .send(
            Request::builder()
                .method(Method::PUT)
                .uri("/api/users/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", ada.token))
                .header(header::COOKIE, format!("gello-csrf={}", ctx.csrf_token))
                .header("x-csrf-token", other)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "display_name": "Ada L" }).to_string()))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), "csrf_failed");
}

#[tokio::test]
async fn test_csrf_token_endpoint() {
    let ctx = TestContext::new();
    let ada = ctx.register("ada").await;

    let issued = ctx.call(Method::GET, "/api/csrf-token", None, None).await;
    assert_eq!(issued.status, StatusCode::OK);

    let token = issued.body["csrf_token"].as_str().unwrap().to_string();
    assert_eq!(issued.cookie("gello-csrf").as_deref(), Some(token.as_str()));

    let response = ctx
        .send(
            Request::builder()
                .method(Method::PUT)
                .uri("/api/users/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", ada.token))
                .header(header::COOKIE, format!("gello-csrf={}", token))
                .header("x-csrf-token", &token)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "display_name": "Ada L" }).to_string()))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["display_name"], "Ada L");
}

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();

    let response = ctx.call(Method::GET, "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["database"], "connected");
    assert_eq!(
        response.headers.get("x-content-type-options").unwrap(),
        "nosniff"
    );
}
