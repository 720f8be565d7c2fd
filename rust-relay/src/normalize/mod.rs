//! Order normalization.
//!
//! Turns an untyped Fourthwall order payload into a [`CanonicalConversion`].
//!
//! ## Processing Flow
//!
//! ```text
//! payload → gate_event() → normalize_order() → CanonicalConversion
//! ```

pub mod fields;
pub mod types;

use serde_json::Value;
use tracing::{info, warn};

use crate::config::{Config, ReferralPolicy};
use crate::error::ExtractionError;

use fields::{
    find_referral, first_text, lookup_amount, tracking_params, AmountLookup, CURRENCY_SOURCES,
    EMAIL_SOURCES, EVENT_TYPE_SOURCES, ORDER_ID_SOURCES, STATUS_SOURCES,
};

pub use types::{CanonicalConversion, GateDecision, Normalized};

/// Decide whether an event should be processed at all.
///
/// Only discriminators present in the payload are checked; an event without
/// a type or status passes the corresponding filter.
pub fn gate_event(payload: &Value, config: &Config) -> GateDecision {
    if let Some(allowed) = &config.allowed_event_types {
        if let Some((event_type, _)) = first_text(payload, EVENT_TYPE_SOURCES) {
            if !contains_ignore_case(allowed, &event_type) {
                info!(event_type = %event_type, "event_ignored_type");
                return GateDecision::Ignore {
                    reason: format!("event type {event_type} is not processed"),
                };
            }
        }
    }

    if let Some(allowed) = &config.allowed_statuses {
        if let Some((status, src)) = first_text(payload, STATUS_SOURCES) {
            if !contains_ignore_case(allowed, &status) {
                info!(status = %status, source = src.name, "event_ignored_status");
                return GateDecision::Ignore {
                    reason: format!("order status {status} is not processed"),
                };
            }
        }
    }

    GateDecision::Process
}

/// Extract and validate a conversion from an order payload.
///
/// `program_id` comes from configuration, never from the payload.
pub fn normalize_order(
    payload: &Value,
    config: &Config,
    program_id: &str,
) -> Result<Normalized, ExtractionError> {
    if !payload.is_object() {
        return Err(ExtractionError::MalformedBody(
            "expected a JSON object".to_string(),
        ));
    }

    let (amount, amount_source) = match lookup_amount(payload) {
        AmountLookup::Found(amount, src) => (amount, src),
        AmountLookup::Invalid(raw, src) => {
            warn!(raw = %raw, source = src.name, "order_amount_invalid");
            return Err(ExtractionError::InvalidAmount { raw: Some(raw) });
        }
        AmountLookup::Absent => {
            warn!("order_amount_missing");
            return Err(ExtractionError::InvalidAmount { raw: None });
        }
    };

    let Some((external_id, id_source)) = first_text(payload, ORDER_ID_SOURCES) else {
        warn!("order_id_missing");
        return Err(ExtractionError::MissingOrderId);
    };

    let currency = first_text(payload, CURRENCY_SOURCES)
        .map(|(c, _)| c.to_ascii_uppercase())
        .unwrap_or_else(|| config.default_currency.clone());

    let customer_email = first_text(payload, EMAIL_SOURCES)
        .map(|(email, _)| email)
        .unwrap_or_else(|| config.fallback_email.clone());

    let referral = tracking_params(payload)
        .and_then(|params| find_referral(params, &config.referral_aliases));

    info!(
        external_id = %external_id,
        id_source = id_source.name,
        amount = amount,
        amount_source = amount_source.name,
        currency = %currency,
        has_email = customer_email != config.fallback_email,
        referral_key = referral.as_ref().map(|(key, _)| key.as_str()),
        "order_normalized"
    );

    let referral = match (referral, config.referral_policy) {
        (Some((_, value)), _) => Some(value),
        (None, ReferralPolicy::Optional) => None,
        (None, ReferralPolicy::Required) => {
            warn!(external_id = %external_id, "order_referral_missing");
            return Err(ExtractionError::MissingReferral {
                searched: config.referral_aliases.clone(),
            });
        }
        (None, ReferralPolicy::Skip) => {
            info!(external_id = %external_id, "order_unattributed_skipped");
            return Ok(Normalized::Unattributed { external_id });
        }
    };

    Ok(Normalized::Conversion(CanonicalConversion::new(
        external_id,
        amount,
        currency,
        customer_email,
        referral,
        program_id.to_string(),
    )))
}

fn contains_ignore_case(list: &[String], value: &str) -> bool {
    list.iter().any(|item| item.eq_ignore_ascii_case(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_order() -> Value {
        json!({
            "data": {
                "amounts": {"total": {"value": "42.50", "currency": "EUR"}},
                "id": "ord_1",
                "email": "a@b.com",
                "trackingParams": {"ref": "AFF123"}
            }
        })
    }

    fn expect_conversion(result: Result<Normalized, ExtractionError>) -> CanonicalConversion {
        match result {
            Ok(Normalized::Conversion(conversion)) => conversion,
            other => panic!("expected conversion, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_full_order() {
        let config = Config::default();
        let conversion = expect_conversion(normalize_order(&sample_order(), &config, "62039"));

        assert_eq!(conversion.external_id, "ord_1");
        assert_eq!(conversion.amount, 42.5);
        assert_eq!(conversion.currency, "EUR");
        assert_eq!(conversion.customer_email, "a@b.com");
        assert_eq!(conversion.referral_or_visitor_id.as_deref(), Some("AFF123"));
        assert_eq!(conversion.program_id, "62039");
    }

    #[test]
    fn test_normalize_legacy_flat_order() {
        let config = Config::default();
        let payload = json!({"id": 1234, "total_amount": 15, "email": "x@y.com"});
        let conversion = expect_conversion(normalize_order(&payload, &config, "p"));

        assert_eq!(conversion.external_id, "1234");
        assert_eq!(conversion.amount, 15.0);
        assert_eq!(conversion.currency, "USD");
        assert_eq!(conversion.customer_email, "x@y.com");
        assert!(conversion.referral_or_visitor_id.is_none());
    }

    #[test]
    fn test_normalize_defaults_email() {
        let config = Config::default();
        let payload = json!({"id": "o", "amount": "3"});
        let conversion = expect_conversion(normalize_order(&payload, &config, "p"));
        assert_eq!(conversion.customer_email, "unknown@example.com");
    }

    #[test]
    fn test_boolean_fields_are_not_usable() {
        let config = Config::default();

        let payload = json!({"id": true, "amount": 5});
        assert_eq!(
            normalize_order(&payload, &config, "p"),
            Err(ExtractionError::MissingOrderId)
        );

        let payload = json!({"id": "ord_2", "amount": 5, "email": false, "currency": true});
        let conversion = expect_conversion(normalize_order(&payload, &config, "p"));
        assert_eq!(conversion.customer_email(), "unknown@example.com");
        assert_eq!(conversion.currency(), "USD");
    }

    #[test]
    fn test_normalize_missing_amount() {
        let config = Config::default();
        let payload = json!({"data": {"id": "ord_1", "amounts": {"total": {"value": 0}}}});
        assert_eq!(
            normalize_order(&payload, &config, "p"),
            Err(ExtractionError::InvalidAmount { raw: None })
        );
    }

    #[test]
    fn test_normalize_missing_order_id() {
        let config = Config::default();
        let payload = json!({"data": {"amounts": {"total": {"value": "5"}}}});
        assert_eq!(
            normalize_order(&payload, &config, "p"),
            Err(ExtractionError::MissingOrderId)
        );
    }

    #[test]
    fn test_normalize_not_an_object() {
        let config = Config::default();
        assert!(matches!(
            normalize_order(&json!([1, 2]), &config, "p"),
            Err(ExtractionError::MalformedBody(_))
        ));
    }

    #[test]
    fn test_referral_required_rejects() {
        let config = Config {
            referral_policy: ReferralPolicy::Required,
            ..Config::default()
        };
        let mut payload = sample_order();
        payload["data"]["trackingParams"] = json!({});

        match normalize_order(&payload, &config, "p") {
            Err(ExtractionError::MissingReferral { searched }) => {
                assert_eq!(searched, config.referral_aliases);
            }
            other => panic!("expected MissingReferral, got {:?}", other),
        }
    }

    #[test]
    fn test_referral_skip_policy() {
        let config = Config {
            referral_policy: ReferralPolicy::Skip,
            ..Config::default()
        };
        let mut payload = sample_order();
        payload["data"]["trackingParams"] = json!({"utm_campaign": "x"});

        assert_eq!(
            normalize_order(&payload, &config, "p"),
            Ok(Normalized::Unattributed {
                external_id: "ord_1".to_string()
            })
        );
    }

    #[test]
    fn test_visitor_id_alias() {
        let config = Config::default();
        let mut payload = sample_order();
        payload["data"]["trackingParams"] = json!({"tapfiliate_click_id": "click-9"});
        let conversion = expect_conversion(normalize_order(&payload, &config, "p"));
        assert_eq!(conversion.referral_or_visitor_id.as_deref(), Some("click-9"));
    }

    #[test]
    fn test_gate_disabled_processes_everything() {
        let config = Config::default();
        let payload = json!({"type": "ORDER_UPDATED", "data": {"status": "CANCELLED"}});
        assert_eq!(gate_event(&payload, &config), GateDecision::Process);
    }

    #[test]
    fn test_gate_by_status() {
        let config = Config {
            allowed_statuses: Some(vec!["DELIVERED".to_string()]),
            ..Config::default()
        };

        let delivered = json!({"data": {"status": "delivered"}});
        assert_eq!(gate_event(&delivered, &config), GateDecision::Process);

        let confirmed = json!({"data": {"status": "CONFIRMED"}});
        assert!(matches!(
            gate_event(&confirmed, &config),
            GateDecision::Ignore { .. }
        ));

        let no_status = json!({"data": {"id": "x"}});
        assert_eq!(gate_event(&no_status, &config), GateDecision::Process);
    }

    #[test]
    fn test_gate_by_event_type() {
        let config = Config {
            allowed_event_types: Some(vec!["ORDER_PLACED".to_string()]),
            ..Config::default()
        };

        let placed = json!({"type": "ORDER_PLACED"});
        assert_eq!(gate_event(&placed, &config), GateDecision::Process);

        let updated = json!({"type": "ORDER_UPDATED"});
        match gate_event(&updated, &config) {
            GateDecision::Ignore { reason } => assert!(reason.contains("ORDER_UPDATED")),
            other => panic!("expected ignore, got {:?}", other),
        }
    }
}
