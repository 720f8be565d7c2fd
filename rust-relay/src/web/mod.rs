//! Web server module for the Fourthwall webhook.
//!
//! This module provides:
//! - The `/api/webhook` endpoint that relays orders to Tapfiliate
//! - Signature verification
//! - Translation of relay results into HTTP responses

pub mod handlers;
pub mod response;
pub mod signature;

use axum::{
    routing::{any, get},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{conversion_webhook, health, AppState, HealthResponse};
pub use response::{AcknowledgeResponse, ErrorResponse, SuccessResponse};
pub use signature::{check_request, compute_signature, is_secret_configured, verify_signature};

/// Build the application router.
///
/// The webhook route accepts every method so that non-POST requests get a
/// JSON 405 with an `Allow` header.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/webhook", any(conversion_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
