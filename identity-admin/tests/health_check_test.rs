//! Health, docs and shared middleware behaviour.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::TestApp;

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_store() {
    let app = TestApp::new();

    let response = app.send(get("/health")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["service"], "identity-admin-test");
    assert_eq!(response.body["checks"]["store"], "up");
}

#[tokio::test]
async fn test_request_id_is_echoed_or_minted() {
    let app = TestApp::new();

    let echoed = app
        .send(
            Request::builder()
                .method("GET")
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(echoed.headers.get("x-request-id").unwrap(), "req-123");

    let minted = app.send(get("/health")).await;
    let id = minted.headers.get("x-request-id").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn test_api_responses_carry_security_headers() {
    let app = TestApp::new();

    let response = app.get("/api/auth/admin/list-users", "missing").await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    assert_eq!(response.headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
}

#[tokio::test]
async fn test_openapi_document_lists_admin_routes() {
    let app = TestApp::new();

    let response = app.send(get("/.well-known/openapi.json")).await;

    assert_eq!(response.status, StatusCode::OK);
    let paths = response.body["paths"].as_object().unwrap();
    assert!(paths.contains_key("/api/auth/oauth2/register"));
    assert!(paths.contains_key("/api/auth/admin/has-permission"));
    assert!(paths.contains_key("/api/auth/internal/provision-user"));
}

#[tokio::test]
async fn test_metrics_without_recorder_is_not_found() {
    let app = TestApp::new();

    let response = app.send(get("/metrics")).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
