//! Shared helpers for relay integration tests.

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use wiremock::MockServer;

use relay::web::compute_signature;
use relay::{router, AppState, Config, VerificationPolicy};

pub const SECRET: &str = "fw-test-secret";
pub const API_KEY: &str = "tap-test-key";
pub const PROGRAM_ID: &str = "62039";
pub const SIGNATURE_HEADER: &str = "x-fourthwall-hmac-sha256";

/// Configuration pointing at a mock Tapfiliate server, signatures required.
pub fn test_config(tapfiliate: &MockServer) -> Config {
    Config {
        tapfiliate_api_key: Some(API_KEY.to_string()),
        tapfiliate_program_id: Some(PROGRAM_ID.to_string()),
        tapfiliate_base_url: tapfiliate.uri(),
        webhook_secret: Some(SECRET.to_string()),
        verification_policy: VerificationPolicy::Required,
        request_timeout_ms: 2_000,
        ..Config::default()
    }
}

pub fn create_app(config: Config) -> Router {
    router(AppState::new(config).expect("valid test config"))
}

/// A POST to the webhook route, signed with [`SECRET`].
pub fn signed_request(body: &str) -> Request<Body> {
    let signature = compute_signature(SECRET, body.as_bytes()).unwrap();
    Request::builder()
        .method("POST")
        .uri("/api/webhook")
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// A POST to the webhook route without a signature header.
pub fn unsigned_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/webhook")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send a request through the router and return status plus JSON body.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub const SAMPLE_ORDER: &str = r#"{"data":{"amounts":{"total":{"value":"42.50","currency":"EUR"}},"id":"ord_1","email":"a@b.com","trackingParams":{"ref":"AFF123"}}}"#;
