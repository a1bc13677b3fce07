//! HTTP-level tests through the full router.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use rstest::rstest;
use serde_json::json;
use tower::ServiceExt;

use common::{TestApp, send};
use taskpulse::infrastructure::AppConfig;

async fn register(app: &TestApp, name: &str) -> String {
    let (response, body) = send(
        app.router(),
        Method::POST,
        "/register",
        None,
        Some(json!({ "username": name, "password": "pw" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body["token"].as_str().unwrap().to_string()
}

async fn create(app: &TestApp, token: &str, title: &str) -> i64 {
    let (response, body) = send(
        app.router(),
        Method::POST,
        "/tasks",
        Some(token),
        Some(json!({ "title": title, "description": "", "status": "open" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body["task_id"].as_i64().unwrap()
}

// =============================================================================
// Health and Sessions
// =============================================================================

#[rstest]
#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;

    let (response, body) = send(app.router(), Method::GET, "/health", None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[rstest]
#[tokio::test]
async fn register_sets_http_only_cookie() {
    let app = TestApp::new().await;

    let (response, body) = send(
        app.router(),
        Method::POST,
        "/register",
        None,
        Some(json!({ "username": "alice", "password": "pw" })),
    )
    .await;

    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    let token = body["token"].as_str().unwrap();
    assert_eq!(cookie, format!("token={token}; HttpOnly; Path=/"));
}

#[rstest]
#[tokio::test]
async fn session_cookie_authenticates_without_bearer_header() {
    let app = TestApp::new().await;
    let token = register(&app, "alice").await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/logout")
        .header(header::COOKIE, format!("theme=dark; token={token}"))
        .body(Body::empty())
        .unwrap();

    let response = app.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[rstest]
#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = TestApp::new().await;

    let (response, body) = send(app.router(), Method::GET, "/tasks/1", None, None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[rstest]
#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new().await;
    register(&app, "alice").await;

    let (response, _) = send(
        app.router(),
        Method::POST,
        "/authenticate",
        None,
        Some(json!({ "username": "alice", "password": "nope" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[rstest]
#[tokio::test]
async fn authenticating_again_expires_old_token() {
    let app = TestApp::new().await;
    let old = register(&app, "alice").await;
    let (response, _) = send(
        app.router(),
        Method::POST,
        "/authenticate",
        None,
        Some(json!({ "username": "alice", "password": "pw" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let (response, _) = send(app.router(), Method::POST, "/tasks", Some(&old), Some(json!({}))).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[rstest]
#[tokio::test]
async fn logout_ends_session() {
    let app = TestApp::new().await;
    let token = register(&app, "alice").await;

    let (response, _) = send(app.router(), Method::POST, "/logout", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (response, _) = send(app.router(), Method::POST, "/logout", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[rstest]
#[tokio::test]
async fn duplicate_registration_is_bad_request() {
    let app = TestApp::new().await;
    register(&app, "alice").await;

    let (response, body) = send(
        app.router(),
        Method::POST,
        "/register",
        None,
        Some(json!({ "username": "alice", "password": "pw" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[rstest]
#[tokio::test]
async fn profile_update_returns_merged_profile() {
    let app = TestApp::new().await;
    let token = register(&app, "alice").await;

    let (response, body) = send(
        app.router(),
        Method::PUT,
        "/profile",
        Some(&token),
        Some(json!({ "firstName": "Alice", "email": "" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body, json!({ "firstName": "Alice" }));
}

// =============================================================================
// Tasks
// =============================================================================

#[rstest]
#[tokio::test]
async fn task_crud_round_trip() {
    let app = TestApp::new().await;
    let token = register(&app, "alice").await;
    let task_id = create(&app, &token, "draft").await;
    let uri = format!("/tasks/{task_id}");

    let (response, _) = send(
        app.router(),
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({ "title": "final", "description": "d", "status": "done" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (response, body) = send(app.router(), Method::GET, &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body["title"], "final");
    assert_eq!(body["owner"], "alice");

    let (response, _) = send(app.router(), Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (response, body) = send(app.router(), Method::GET, &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[rstest]
#[tokio::test]
async fn foreign_task_mutation_is_not_found() {
    let app = TestApp::new().await;
    let alice = register(&app, "alice").await;
    let mallory = register(&app, "mallory").await;
    let task_id = create(&app, &alice, "mine").await;

    let (response, _) = send(
        app.router(),
        Method::DELETE,
        &format!("/tasks/{task_id}"),
        Some(&mallory),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[rstest]
#[tokio::test]
async fn malformed_task_id_is_bad_request() {
    let app = TestApp::new().await;
    let token = register(&app, "alice").await;

    let (response, body) = send(app.router(), Method::GET, "/tasks/abc", Some(&token), None).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[rstest]
#[tokio::test]
async fn page_reports_returned_count() {
    let app = TestApp::new().await;
    let token = register(&app, "alice").await;
    for title in ["a", "b", "c"] {
        create(&app, &token, title).await;
    }

    let (response, body) = send(
        app.router(),
        Method::GET,
        "/tasks/page?offset=1&page_size=10",
        Some(&token),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body["page_size"], 2);
    assert_eq!(body["tasks"][0]["title"], "b");
}

#[rstest]
#[tokio::test]
async fn like_of_missing_task_is_not_found() {
    let app = TestApp::new().await;
    let token = register(&app, "alice").await;

    let (response, _) = send(app.router(), Method::POST, "/tasks/42/like", Some(&token), None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Statistics
// =============================================================================

#[rstest]
#[tokio::test]
async fn statistics_follow_ingestion() {
    let app = TestApp::new().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let task_id = create(&app, &alice, "t").await;
    let stats_uri = format!("/tasks/{task_id}/stats");

    let (response, body) = send(app.router(), Method::GET, &stats_uri, Some(&bob), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "STATISTICS_NOT_READY");

    let (response, _) = send(
        app.router(),
        Method::POST,
        &format!("/tasks/{task_id}/like"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    app.ingest().await;

    let (response, body) = send(app.router(), Method::GET, &stats_uri, Some(&bob), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body, json!({ "task_id": task_id, "likes": 1, "views": 0 }));
}

#[rstest]
#[tokio::test]
async fn top_tasks_uses_configured_default_limit() {
    let app = TestApp::with_config(AppConfig::builder().top_tasks_limit(2).build().unwrap()).await;
    let token = register(&app, "alice").await;
    for title in ["a", "b", "c"] {
        create(&app, &token, title).await;
    }
    app.ingest().await;

    let (response, body) = send(app.router(), Method::GET, "/top/tasks/likes", Some(&token), None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body["tasks"].as_array().unwrap().len(), 2);
}

#[rstest]
#[tokio::test]
async fn unknown_statistic_kind_is_bad_request() {
    let app = TestApp::new().await;
    let token = register(&app, "alice").await;

    let (response, _) = send(app.router(), Method::GET, "/top/tasks/shares", Some(&token), None).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[rstest]
#[tokio::test]
async fn top_users_honours_limit_query() {
    let app = TestApp::new().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    create(&app, &alice, "a").await;
    create(&app, &bob, "b").await;
    app.ingest().await;

    let (response, body) = send(app.router(), Method::GET, "/top/users?limit=1", Some(&alice), None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body["users"], json!([{ "author": "alice", "likes": 0 }]));
}
