//! Integration tests for the setlog-core HTTP API
//!
//! Exercises the router directly with tower's oneshot, no socket needed.

use axum::body::Body;
use axum::http::StatusCode;
use http::{Method, Request};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use tower::ServiceExt;

use setlog_core::api::server::{build_router, AppContext};
use setlog_core::publisher::OutboxPublisher;
use setlog_core::resolver::TomlTemplateResolver;
use setlog_core::state::SharedState;
use setlog_core::WorkoutOrchestrator;

const LIBRARY: &str = r#"
[[exercises]]
ref = "33401:npub-coach:pullup"
name = "Pull Up"

[[templates]]
ref = "33402:npub-coach:back-day"
title = "Back Day"

[[templates.entries]]
exercise = "33401:npub-coach:pullup"
sets = 2
reps = 8
"#;

fn test_app() -> (axum::Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let library_path = dir.path().join("templates.toml");
    std::fs::File::create(&library_path)
        .unwrap()
        .write_all(LIBRARY.as_bytes())
        .unwrap();

    let resolver = Arc::new(TomlTemplateResolver::load(&library_path).unwrap());
    let publisher = Arc::new(OutboxPublisher::new(dir.path().join("outbox.ndjson")));
    let state = Arc::new(SharedState::new());
    let orchestrator = WorkoutOrchestrator::new(
        state.clone(),
        resolver.clone(),
        publisher,
        "npub-lifter".to_string(),
    );

    let ctx = AppContext {
        state,
        orchestrator,
        resolver,
        user_identity: "npub-lifter".to_string(),
    };
    (build_router(ctx), dir)
}

async fn request(
    app: &axum::Router,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Option<Value>) {
    let mut builder = Request::builder().method(method).uri(path);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).ok();
    (status, value)
}

async fn post(app: &axum::Router, path: &str, body: Option<Value>) -> StatusCode {
    request(app, Method::POST, path, body).await.0
}

#[tokio::test]
async fn test_health_reports_module() {
    let (app, _dir) = test_app();
    let (status, body) = request(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "setlog-core");
}

#[tokio::test]
async fn test_status_starts_idle() {
    let (app, _dir) = test_app();
    let (status, body) = request(&app, Method::GET, "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["phase"], "idle");
}

#[tokio::test]
async fn test_full_session_over_http() {
    let (app, _dir) = test_app();

    let status = post(
        &app,
        "/session/start",
        Some(json!({ "template_ref": "33402:npub-coach:back-day" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(post(&app, "/session/confirm", None).await, StatusCode::OK);

    let (status, body) = request(&app, Method::GET, "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["phase"], "setup_complete");

    assert_eq!(post(&app, "/session/begin", None).await, StatusCode::OK);

    let (status, body) = request(&app, Method::GET, "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["phase"], "active");

    // Record a set with an override, then inspect the snapshot
    let status = post(
        &app,
        "/session/set/complete",
        Some(json!({ "reps": 6, "rpe": 8.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(&app, Method::GET, "/session/snapshot", None).await;
    assert_eq!(status, StatusCode::OK);
    let snap = body.unwrap();
    assert_eq!(snap["total_completed_sets"], 1);
    assert_eq!(snap["phase"], "resting");
    assert_eq!(snap["slots"][0]["sets"][0]["reps"], 6);
    assert_eq!(snap["slots"][0]["name"], "Pull Up");

    assert_eq!(post(&app, "/session/rest/skip", None).await, StatusCode::OK);
    assert_eq!(post(&app, "/session/complete", None).await, StatusCode::OK);
}

#[tokio::test]
async fn test_operations_without_session_conflict() {
    let (app, _dir) = test_app();
    let status = post(&app, "/session/set/complete", Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = request(&app, Method::GET, "/session/snapshot", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_malformed_reference_is_bad_request() {
    let (app, _dir) = test_app();
    let status = post(
        &app,
        "/session/start",
        Some(json!({ "template_ref": "not-a-reference" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bad_set_type_is_bad_request() {
    let (app, _dir) = test_app();
    post(
        &app,
        "/session/start",
        Some(json!({ "template_ref": "33402:npub-coach:back-day" })),
    )
    .await;
    post(&app, "/session/confirm", None).await;
    post(&app, "/session/begin", None).await;

    let status = post(
        &app,
        "/session/set/complete",
        Some(json!({ "set_type": "superset" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_templates_listing_scoped_to_identity() {
    let (app, _dir) = test_app();
    let (status, body) = request(&app, Method::GET, "/templates", None).await;
    assert_eq!(status, StatusCode::OK);
    // Library templates belong to npub-coach, not the configured identity
    assert_eq!(body.unwrap()["templates"].as_array().unwrap().len(), 0);
}
