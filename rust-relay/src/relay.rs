//! Per-request relay pipeline.
//!
//! ```text
//! credentials → signature → parse → gate → normalize → submit
//! ```
//!
//! Every step either hands its result to the next one or returns early with
//! a [`RelayError`] or a non-submitting [`RelayOutcome`].

use serde_json::Value;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{ExtractionError, RelayError};
use crate::normalize::{gate_event, normalize_order, CanonicalConversion, GateDecision, Normalized};
use crate::tapfiliate::{SubmitResponse, TapfiliateClient};
use crate::web::signature::check_request;

/// Non-error results of relaying one webhook.
#[derive(Debug)]
pub enum RelayOutcome {
    /// Conversion accepted by Tapfiliate
    Submitted {
        conversion: CanonicalConversion,
        response: SubmitResponse,
    },
    /// Event filtered out by the event gate
    Ignored { reason: String },
    /// Order had no referral and the referral policy says to skip it
    Unattributed { external_id: String },
}

/// Outbound credentials, checked before any work is done.
struct Credentials<'a> {
    api_key: &'a str,
    program_id: &'a str,
}

fn credentials(config: &Config) -> Result<Credentials<'_>, RelayError> {
    let api_key = config.tapfiliate_api_key.as_deref().ok_or_else(|| {
        RelayError::ServerMisconfiguration("Tapfiliate API key is not configured".to_string())
    })?;
    let program_id = config.tapfiliate_program_id.as_deref().ok_or_else(|| {
        RelayError::ServerMisconfiguration("Tapfiliate program id is not configured".to_string())
    })?;
    Ok(Credentials {
        api_key,
        program_id,
    })
}

/// Relay one webhook body to Tapfiliate.
///
/// `signature` is the raw value of the configured signature header, if any.
pub async fn relay_webhook(
    config: &Config,
    client: &TapfiliateClient,
    body: &[u8],
    signature: Option<&str>,
) -> Result<RelayOutcome, RelayError> {
    let creds = credentials(config)?;

    // Parsing may fail here; that is reported only after the signature check.
    let parsed: Result<Value, serde_json::Error> = serde_json::from_slice(body);

    check_request(
        config.verification_policy,
        config.webhook_secret.as_deref(),
        body,
        signature,
        parsed.as_ref().ok(),
    )?;

    let payload = parsed.map_err(|e| {
        warn!(error = %e, body_length = body.len(), "webhook_body_malformed");
        ExtractionError::MalformedBody(e.to_string())
    })?;

    if let GateDecision::Ignore { reason } = gate_event(&payload, config) {
        return Ok(RelayOutcome::Ignored { reason });
    }

    let conversion = match normalize_order(&payload, config, creds.program_id)? {
        Normalized::Conversion(conversion) => conversion,
        Normalized::Unattributed { external_id } => {
            return Ok(RelayOutcome::Unattributed { external_id });
        }
    };

    let response = client.submit(&conversion, creds.api_key).await?;

    info!(
        external_id = %conversion.external_id,
        status_code = response.status,
        "conversion_submitted"
    );

    Ok(RelayOutcome::Submitted {
        conversion,
        response,
    })
}
