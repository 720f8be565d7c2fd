//! Webhook endpoint handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::RelayError;
use crate::relay::{relay_webhook, RelayOutcome};
use crate::tapfiliate::TapfiliateClient;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: TapfiliateClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, RelayError> {
        let client = TapfiliateClient::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Fourthwall Order Webhook
// =============================================================================

/// Fourthwall order webhook endpoint.
///
/// This endpoint:
/// 1. Rejects anything but POST
/// 2. Verifies the HMAC signature according to the configured policy
/// 3. Normalizes the order and submits it to Tapfiliate
/// 4. Returns Tapfiliate's answer
pub async fn conversion_webhook(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        warn!(method = %method, "webhook_method_not_allowed");
        return RelayError::MethodNotAllowed.into_response();
    }

    let signature = headers
        .get(state.config.signature_header.as_str())
        .and_then(|v| v.to_str().ok());

    info!(
        body_length = body.len(),
        has_signature = signature.is_some(),
        "webhook_received"
    );

    match relay_webhook(&state.config, &state.client, &body, signature).await {
        Ok(outcome) => {
            match &outcome {
                RelayOutcome::Submitted { conversion, .. } => {
                    info!(external_id = %conversion.external_id, "webhook_processed");
                }
                RelayOutcome::Ignored { reason } => {
                    info!(reason = %reason, "webhook_ignored");
                }
                RelayOutcome::Unattributed { external_id } => {
                    info!(external_id = %external_id, "webhook_unattributed");
                }
            }
            outcome.into_response()
        }
        Err(e) => {
            match &e {
                RelayError::ServerMisconfiguration(_) | RelayError::UpstreamTransport(_) => {
                    error!(error = %e, "webhook_failed");
                }
                _ => warn!(error = %e, "webhook_rejected"),
            }
            e.into_response()
        }
    }
}
