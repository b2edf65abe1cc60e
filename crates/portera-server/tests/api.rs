mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{setup_db, RecordingNotifier};
use portera_server::config::AppConfig;
use portera_server::routes;
use portera_server::state::AppState;

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        listen_addr: "127.0.0.1:0".to_string(),
        site_url: "http://localhost:8080".to_string(),
        token_ttl_secs: 24 * 60 * 60,
        monitor_poll_interval: Duration::from_millis(1),
        monitor_max_attempts: 2,
        monitor_store_timeout: Duration::from_secs(1),
        mailer: None,
    }
}

async fn app() -> (Router, Arc<RecordingNotifier>) {
    let db = setup_db().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::new(db, notifier.clone(), &test_config());
    (routes::router(state), notifier)
}

async fn read_json(resp: axum::response::Response) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(resp).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(resp).await
}

#[tokio::test]
async fn health_endpoints_answer() {
    let (app, _) = app().await;

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (status, _) = get(&app, "/api/alive").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn role_request_verify_and_duplicate_flow() {
    let (app, notifier) = app().await;

    let (status, body) = post_json(
        &app,
        "/api/profiles",
        json!({ "userId": "u1", "email": "U1@Example.com", "fullName": "Nuria Soler" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["email"], "u1@example.com");
    assert_eq!(body["profile"]["country"], "España");

    let (status, body) = post_json(
        &app,
        "/api/roles/request",
        json!({
            "userId": "u1",
            "roleType": "service_provider",
            "roleSpecificData": { "company_name": "Soler Obras SL" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["emailSent"], true);
    assert_eq!(body["role"]["isVerified"], false);
    // The token never appears on the wire.
    assert!(body["role"].get("verificationToken").is_none());

    let token = notifier.last_token().unwrap();
    let (status, body) = get(&app, &format!("/auth/verify-role?token={token}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["activated"], true);
    assert_eq!(body["role"]["isVerified"], true);
    assert_eq!(body["role"]["isActive"], true);

    // Redeeming the same token again: single-use.
    let (status, body) = get(&app, &format!("/auth/verify-role?token={token}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "token_not_found");

    // Requesting the same role again names the verified case.
    let (status, body) = post_json(
        &app,
        "/api/roles/request",
        json!({ "userId": "u1", "roleType": "service_provider" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "role_already_verified");

    let (status, body) = get(&app, "/api/roles?userId=u1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roles"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn role_type_is_validated_server_side() {
    let (app, _) = app().await;

    post_json(
        &app,
        "/api/profiles",
        json!({ "userId": "u1", "email": "u1@example.com" }),
    )
    .await;

    let (status, body) = post_json(
        &app,
        "/api/roles/request",
        json!({ "userId": "u1", "roleType": "superadmin" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "unknown_role_type");
}

#[tokio::test]
async fn verify_requires_a_token() {
    let (app, _) = app().await;

    let (status, body) = get(&app, "/auth/verify-role").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "missing_token");

    let (status, body) = get(&app, "/auth/verify-role?token=bogus").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "token_not_found");
}

#[tokio::test]
async fn invalid_json_gets_the_error_envelope() {
    let (app, _) = app().await;

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/roles/request")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, body) = read_json(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "invalid_json");
}

#[tokio::test]
async fn registration_watch_is_accepted() {
    let (app, _) = app().await;

    post_json(
        &app,
        "/api/profiles",
        json!({ "userId": "u1", "email": "u1@example.com" }),
    )
    .await;

    let (status, body) = post_json(
        &app,
        "/api/registration/watch",
        json!({ "userId": "u1", "expectedRoles": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn recovery_endpoint_returns_the_report() {
    let (app, _) = app().await;

    let (status, body) = post_json(
        &app,
        "/api/recovery/recover",
        json!({
            "userId": "u9",
            "email": "u9@example.com",
            "expectedRoles": ["particular", "community_member"],
            "userData": { "fullName": "Pau Vidal", "city": "Valencia" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["report"]["rolesCreated"], 2);
    assert_eq!(body["report"]["errors"].as_array().unwrap().len(), 0);

    let (_, body) = get(&app, "/api/roles?userId=u9").await;
    let roles = body["roles"].as_array().unwrap();
    assert_eq!(roles.len(), 2);
    assert!(roles.iter().all(|r| r["isVerified"] == true));
    assert_eq!(
        roles.iter().filter(|r| r["isActive"] == true).count(),
        1
    );
}
