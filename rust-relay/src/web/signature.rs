//! Fourthwall webhook signature verification.
//!
//! Fourthwall signs the raw request body with HMAC-SHA256 and sends the
//! base64-encoded digest in a request header.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::config::VerificationPolicy;
use crate::error::RelayError;

type HmacSha256 = Hmac<Sha256>;

/// Verify a webhook signature.
///
/// # Arguments
///
/// * `secret` - The shared webhook secret
/// * `body` - The raw request body, exactly as received
/// * `signature` - Base64 HMAC-SHA256 digest from the signature header
///
/// # Returns
///
/// `true` if the signature matches, `false` otherwise.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let signature = signature.trim();
    if secret.is_empty() || signature.is_empty() {
        warn!(
            has_secret = !secret.is_empty(),
            has_signature = !signature.is_empty(),
            "signature_missing_fields"
        );
        return false;
    }

    let Some(expected) = compute_signature(secret, body) else {
        warn!("signature_invalid_key");
        return false;
    };
    let valid: bool = expected.as_bytes().ct_eq(signature.as_bytes()).into();

    if !valid {
        warn!(
            expected_length = expected.len(),
            actual_length = signature.len(),
            "signature_mismatch"
        );
    }

    valid
}

/// Base64 HMAC-SHA256 of `body` keyed with `secret`.
pub fn compute_signature(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Check if a secret is configured.
pub fn is_secret_configured(secret: Option<&str>) -> bool {
    secret.map(|s| !s.trim().is_empty()).unwrap_or(false)
}

/// Whether the payload declares itself a test event.
pub fn is_test_mode(payload: &Value) -> bool {
    ["/testMode", "/test_mode", "/data/testMode"]
        .iter()
        .any(|p| payload.pointer(p).and_then(Value::as_bool) == Some(true))
}

/// Apply the configured verification policy to one request.
///
/// `payload` is only consulted under [`VerificationPolicy::SkipIfTestMode`].
pub fn check_request(
    policy: VerificationPolicy,
    secret: Option<&str>,
    body: &[u8],
    signature: Option<&str>,
    payload: Option<&Value>,
) -> Result<(), RelayError> {
    let secret = secret.filter(|s| !s.trim().is_empty());

    match policy {
        VerificationPolicy::SkipIfUnconfigured if secret.is_none() => {
            warn!(policy = policy.as_str(), "signature_check_skipped_unconfigured");
            return Ok(());
        }
        VerificationPolicy::SkipIfTestMode if payload.map(is_test_mode).unwrap_or(false) => {
            warn!(policy = policy.as_str(), "signature_check_skipped_test_mode");
            return Ok(());
        }
        _ => {}
    }

    let Some(secret) = secret else {
        return Err(RelayError::ServerMisconfiguration(
            "webhook secret is not configured".to_string(),
        ));
    };

    let Some(signature) = signature.filter(|s| !s.trim().is_empty()) else {
        warn!("signature_header_missing");
        return Err(RelayError::Unauthorized("missing signature".to_string()));
    };

    if verify_signature(secret, body, signature) {
        Ok(())
    } else {
        Err(RelayError::Unauthorized("invalid signature".to_string()))
    }
}
