//! Error taxonomy for the relay.
//!
//! Each variant maps to exactly one HTTP status in `web::response`.

use thiserror::Error;

/// Reasons an order payload cannot be turned into a conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("request body is not a JSON object: {0}")]
    MalformedBody(String),

    /// `raw` holds the offending value when one was found.
    #[error("no usable order amount")]
    InvalidAmount { raw: Option<String> },

    #[error("no order identifier")]
    MissingOrderId,

    #[error("no referral or visitor id in tracking parameters")]
    MissingReferral { searched: Vec<String> },
}

impl ExtractionError {
    /// Name of the field the failure is about.
    pub fn field(&self) -> &'static str {
        match self {
            ExtractionError::MalformedBody(_) => "body",
            ExtractionError::InvalidAmount { .. } => "amount",
            ExtractionError::MissingOrderId => "order_id",
            ExtractionError::MissingReferral { .. } => "referral",
        }
    }
}

/// Failures surfaced to the webhook caller.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("server misconfiguration: {0}")]
    ServerMisconfiguration(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] ExtractionError),

    #[error("tapfiliate request failed: {0}")]
    UpstreamTransport(#[source] reqwest::Error),

    #[error("tapfiliate returned {status}")]
    UpstreamStatus { status: u16, body: String },
}
