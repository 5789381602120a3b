//! Security tests for itdesk-portal
//!
//! Session handling, role checks, request body limits and rate limiting.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Duration;
use itdesk_common::config::PortalConfig;
use itdesk_common::db::init::init_memory_database;
use itdesk_common::seed::seed_database;
use itdesk_common::time::{now, to_db_string};
use itdesk_portal::{build_router, AppState, MAX_BODY_BYTES};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt;

async fn setup() -> (Router, SqlitePool) {
    let pool = init_memory_database().await.expect("Should create database");
    seed_database(&pool).await.expect("Should seed database");
    let app = build_router(AppState::new(pool.clone(), PortalConfig::default()));
    (app, pool)
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": email, "password": password }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    body["token"].as_str().unwrap().to_string()
}

fn get_with(uri: &str, name: header::HeaderName, value: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(name, value)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_expired_session_is_rejected() {
    let (app, pool) = setup().await;
    let user_id: String = sqlx::query_scalar("SELECT id FROM users WHERE email = 'user@company.com'")
        .fetch_one(&pool)
        .await
        .unwrap();

    let token = "e".repeat(64);
    sqlx::query("INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&token)
        .bind(&user_id)
        .bind(to_db_string(now() - Duration::hours(25)))
        .bind(to_db_string(now() - Duration::hours(1)))
        .execute(&pool)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get_with(
            "/api/auth/me",
            header::AUTHORIZATION,
            &format!("Bearer {}", token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_authorization_headers_are_rejected() {
    let (app, _pool) = setup().await;
    let token = login(&app, "user@company.com", "password123").await;

    for value in [
        token.clone(),
        format!("Basic {}", token),
        "Bearer ".to_string(),
        format!("Bearer {}x", token),
    ] {
        let response = app
            .clone()
            .oneshot(get_with("/api/auth/me", header::AUTHORIZATION, &value))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "header {:?} should not authenticate",
            value
        );
    }

    let valid = app
        .clone()
        .oneshot(get_with(
            "/api/auth/me",
            header::AUTHORIZATION,
            &format!("Bearer {}", token),
        ))
        .await
        .unwrap();
    assert_eq!(valid.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_session_cookie_among_other_cookies() {
    let (app, _pool) = setup().await;
    let token = login(&app, "user@company.com", "password123").await;

    let response = app
        .clone()
        .oneshot(get_with(
            "/api/auth/me",
            header::COOKIE,
            &format!("preferred-locale=es; itdesk-session={}; theme=dark", token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_password_hash_never_leaves_the_server() {
    let (app, _pool) = setup().await;
    let token = login(&app, "admin@company.com", "admin123").await;

    let response = app
        .clone()
        .oneshot(get_with(
            "/api/users",
            header::AUTHORIZATION,
            &format!("Bearer {}", token),
        ))
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(!text.contains("password_hash"));
    assert!(!text.contains("password_salt"));
}

// =============================================================================
// Roles
// =============================================================================

#[tokio::test]
async fn test_admin_routes_refuse_end_users() {
    let (app, _pool) = setup().await;
    let token = login(&app, "user@company.com", "password123").await;
    let bearer = format!("Bearer {}", token);

    for uri in ["/api/users", "/api/users/admins", "/api/licenses"] {
        let response = app
            .clone()
            .oneshot(get_with(uri, header::AUTHORIZATION, &bearer))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "GET {}", uri);
    }

    let create_user = app
        .clone()
        .oneshot(post_json(
            "/api/users",
            &token,
            json!({
                "name": "Mallory",
                "email": "mallory@company.com",
                "role": "ADMIN",
                "password": "Escalate1"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(create_user.status(), StatusCode::FORBIDDEN);

    let create_license = app
        .clone()
        .oneshot(post_json(
            "/api/licenses",
            &token,
            json!({ "name": "x", "vendor": "y", "license_key": "z" }),
        ))
        .await
        .unwrap();
    assert_eq!(create_license.status(), StatusCode::FORBIDDEN);
}

// =============================================================================
// Request limits
// =============================================================================

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let (app, _pool) = setup().await;
    let token = login(&app, "user@company.com", "password123").await;

    let description = "a".repeat(MAX_BODY_BYTES + 1);
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/tickets",
            &token,
            json!({
                "title": "Huge",
                "description": description,
                "priority": "LOW",
                "category": "Other"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_ticket_creation_is_rate_limited_per_user() {
    let (app, _pool) = setup().await;
    let token = login(&app, "user@company.com", "password123").await;
    let ticket = json!({
        "title": "Monitor flickers",
        "description": "The second monitor flickers every few seconds.",
        "priority": "LOW",
        "category": "Hardware"
    });

    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(post_json("/api/tickets", &token, ticket.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let limited = app
        .clone()
        .oneshot(post_json("/api/tickets", &token, ticket.clone()))
        .await
        .unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = limited.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1);
    let bytes = axum::body::to_bytes(limited.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "RATE_LIMITED");

    // Another user has their own allowance
    let admin = login(&app, "admin@company.com", "admin123").await;
    let other = app
        .clone()
        .oneshot(post_json("/api/tickets", &admin, ticket))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_login_attempts_are_rate_limited() {
    let (app, _pool) = setup().await;
    let config = PortalConfig::default();

    let mut last = StatusCode::OK;
    for _ in 0..=config.rate_limits.login_per_minute {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "email": "user@company.com", "password": "guess" }).to_string(),
            ))
            .unwrap();
        last = app.clone().oneshot(request).await.unwrap().status();
    }
    assert_eq!(last, StatusCode::TOO_MANY_REQUESTS);
}
