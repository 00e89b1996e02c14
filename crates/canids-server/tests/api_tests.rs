//! Integration tests for the HTTP endpoints

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use canids_lib::health::{components, ComponentHealth};
use canids_server::api::{create_router, AppState};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

async fn setup_test_app() -> (Router, Arc<AppState>, TempDir) {
    let dir = TempDir::new().unwrap();
    let state = common::app_state(dir.path());
    state.health_registry.register(components::CLASSIFIER).await;
    state.health_registry.register(components::DATASETS).await;

    let router = create_router(state.clone());
    (router, state, dir)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state, _dir) = setup_test_app().await;

    let (status, body) = get(app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);

    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert!(health["components"]["classifier"].is_object());
    assert!(health["components"]["datasets"].is_object());
}

#[tokio::test]
async fn test_healthz_reports_missing_datasets_as_degraded() {
    let (app, state, _dir) = setup_test_app().await;

    let status = state
        .health_registry
        .check_catalog(&state.session_ctx.catalog)
        .await;
    assert_eq!(status, canids_lib::ComponentStatus::Degraded);

    // Degraded still returns 200 (operational)
    let (status, body) = get(app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);

    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "degraded");
    assert_eq!(
        health["components"]["datasets"]["message"],
        "Missing datasets: Fuzzy"
    );
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state, _dir) = setup_test_app().await;

    state
        .health_registry
        .update(
            components::CLASSIFIER,
            ComponentHealth::unhealthy("Model failed to load"),
        )
        .await;

    let (status, body) = get(app, "/healthz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_returns_503_when_not_ready() {
    let (app, _state, _dir) = setup_test_app().await;

    let (status, body) = get(app, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let readiness: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness["ready"], false);
}

#[tokio::test]
async fn test_readyz_returns_ok_when_ready() {
    let (app, state, _dir) = setup_test_app().await;
    state.health_registry.set_ready(true).await;

    let (status, body) = get(app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);

    let readiness: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_categories_lists_keys_with_availability() {
    let (app, _state, _dir) = setup_test_app().await;

    let (status, body) = get(app, "/api/v1/categories").await;
    assert_eq!(status, StatusCode::OK);

    let categories: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        categories,
        serde_json::json!([
            {"key": "DoS", "available": true},
            {"key": "Fuzzy", "available": false}
        ])
    );
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, state, _dir) = setup_test_app().await;

    state.metrics.observe_prediction_latency(0.002);
    state.metrics.observe_dataset_load(0.05);
    state.metrics.inc_session_errors("invalid_selection");
    state.metrics.set_model_info("constant:1");

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("canids_sessions_started_total"));
    assert!(metrics_text.contains("canids_prediction_latency_seconds_bucket"));
    assert!(metrics_text.contains("canids_dataset_load_seconds_count"));
    assert!(metrics_text.contains("canids_session_errors_total{kind=\"invalid_selection\"}"));
    assert!(metrics_text.contains("canids_model_info{model=\"constant:1\"} 1"));
}

#[tokio::test]
async fn test_pages_and_static_assets_are_served() {
    let (_app, state, dir) = setup_test_app().await;
    let assets = dir.path().join("assets");
    std::fs::create_dir_all(assets.join("templates")).unwrap();
    std::fs::create_dir_all(assets.join("static")).unwrap();
    std::fs::write(assets.join("templates/index.html"), "<h1>categories</h1>").unwrap();
    std::fs::write(assets.join("templates/attack_page.html"), "<h1>stream</h1>").unwrap();
    std::fs::write(assets.join("static/script.js"), "// client").unwrap();

    let (status, body) = get(create_router(state.clone()), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>categories</h1>");

    let (status, body) = get(create_router(state.clone()), "/attack").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>stream</h1>");

    let (status, body) = get(create_router(state.clone()), "/static/script.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"// client");

    let (status, _) = get(create_router(state), "/static/absent.js").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ws_route_rejects_plain_http() {
    let (app, _state, _dir) = setup_test_app().await;

    let (status, _) = get(app, "/ws").await;
    assert!(status.is_client_error());
}
