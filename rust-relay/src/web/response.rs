//! Mapping of relay results onto HTTP responses.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{ExtractionError, RelayError};
use crate::normalize::fields::ORDER_ID_SOURCES;
use crate::normalize::CanonicalConversion;
use crate::relay::RelayOutcome;

/// Error body returned for every non-pass-through failure.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorResponse {
    fn new(error: &'static str, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
            field: None,
            details: None,
        }
    }
}

/// Body returned once Tapfiliate accepted the conversion.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: &'static str,
    pub tapfiliate: Value,
    pub conversion: CanonicalConversion,
}

/// Body returned when the webhook was accepted without an outbound call.
#[derive(Debug, Serialize)]
pub struct AcknowledgeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub ignored: bool,
    pub submitted: bool,
    pub reason: String,
}

fn extraction_details(err: &ExtractionError) -> Option<Value> {
    match err {
        ExtractionError::MalformedBody(parse_error) => Some(json!({ "parse_error": parse_error })),
        ExtractionError::InvalidAmount { raw } => raw.as_ref().map(|raw| json!({ "received": raw })),
        ExtractionError::MissingOrderId => Some(json!({
            "searched_paths": ORDER_ID_SOURCES.iter().map(|s| s.name).collect::<Vec<_>>()
        })),
        ExtractionError::MissingReferral { searched } => Some(json!({ "searched_keys": searched })),
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                [(header::ALLOW, "POST")],
                Json(ErrorResponse::new("method_not_allowed", "Method Not Allowed")),
            )
                .into_response(),

            RelayError::ServerMisconfiguration(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("server_misconfiguration", message)),
            )
                .into_response(),

            RelayError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("unauthorized", message)),
            )
                .into_response(),

            RelayError::InvalidPayload(err) => {
                let body = ErrorResponse {
                    error: "invalid_payload",
                    message: err.to_string(),
                    field: Some(err.field()),
                    details: extraction_details(&err),
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }

            RelayError::UpstreamTransport(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "upstream_failure",
                    "Error sending to Tapfiliate",
                )),
            )
                .into_response(),

            RelayError::UpstreamStatus { status, body } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                let content_type = if serde_json::from_str::<Value>(&body).is_ok() {
                    "application/json"
                } else {
                    "text/plain; charset=utf-8"
                };
                (status, [(header::CONTENT_TYPE, content_type)], body).into_response()
            }
        }
    }
}

impl IntoResponse for RelayOutcome {
    fn into_response(self) -> Response {
        match self {
            RelayOutcome::Submitted {
                conversion,
                response,
            } => Json(SuccessResponse {
                success: true,
                message: "Webhook processed",
                tapfiliate: response.body,
                conversion,
            })
            .into_response(),

            RelayOutcome::Ignored { reason } => Json(AcknowledgeResponse {
                success: true,
                ignored: true,
                submitted: false,
                reason,
            })
            .into_response(),

            RelayOutcome::Unattributed { external_id } => Json(AcknowledgeResponse {
                success: true,
                ignored: false,
                submitted: false,
                reason: format!("order {external_id} has no referral; conversion not submitted"),
            })
            .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_method_not_allowed_sets_allow_header() {
        let response = RelayError::MethodNotAllowed.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "POST");
    }

    #[tokio::test]
    async fn test_invalid_payload_names_field() {
        let response = RelayError::InvalidPayload(ExtractionError::InvalidAmount {
            raw: Some("abc".to_string()),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_payload");
        assert_eq!(body["field"], "amount");
        assert_eq!(body["details"]["received"], "abc");
    }

    #[tokio::test]
    async fn test_upstream_status_passes_through() {
        let response = RelayError::UpstreamStatus {
            status: 422,
            body: r#"{"error":"duplicate"}"#.to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(body_json(response).await, json!({"error": "duplicate"}));
    }

    #[tokio::test]
    async fn test_ignored_is_ok() {
        let response = RelayOutcome::Ignored {
            reason: "order status CONFIRMED is not processed".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["ignored"], true);
    }

    #[tokio::test]
    async fn test_unattributed_omits_ignored_flag() {
        let response = RelayOutcome::Unattributed {
            external_id: "ord_1".to_string(),
        }
        .into_response();
        let body = body_json(response).await;
        assert_eq!(body["submitted"], false);
        assert!(body.get("ignored").is_none());
    }
}
