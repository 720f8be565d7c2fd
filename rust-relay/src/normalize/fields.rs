//! Ordered field sources for Fourthwall order payloads.
//!
//! Fourthwall has shipped several payload layouts over time. Every logical
//! field is described by a list of [`FieldSource`]s, tried in order until one
//! yields a usable value.

use serde_json::{Map, Value};

/// One concrete location of a logical field inside a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSource {
    /// Dotted path used in logs
    pub name: &'static str,
    /// JSON pointer into the payload
    pub pointer: &'static str,
}

const fn source(name: &'static str, pointer: &'static str) -> FieldSource {
    FieldSource { name, pointer }
}

pub const AMOUNT_SOURCES: &[FieldSource] = &[
    source("data.amounts.total.value", "/data/amounts/total/value"),
    source("data.amounts.total.amount", "/data/amounts/total/amount"),
    source("data.order.amounts.total.amount", "/data/order/amounts/total/amount"),
    source("total_price", "/total_price"),
    source("total", "/total"),
    source("total_amount", "/total_amount"),
    source("amount", "/amount"),
];

pub const ORDER_ID_SOURCES: &[FieldSource] = &[
    source("data.order.id", "/data/order/id"),
    source("data.id", "/data/id"),
    source("data.friendlyId", "/data/friendlyId"),
    source("id", "/id"),
];

pub const CURRENCY_SOURCES: &[FieldSource] = &[
    source("data.amounts.total.currency", "/data/amounts/total/currency"),
    source("data.order.amounts.total.currency", "/data/order/amounts/total/currency"),
    source("currency", "/currency"),
];

pub const EMAIL_SOURCES: &[FieldSource] = &[
    source("data.order.email", "/data/order/email"),
    source("data.email", "/data/email"),
    source("email", "/email"),
];

pub const TRACKING_PARAMS_SOURCES: &[FieldSource] = &[
    source("data.trackingParams", "/data/trackingParams"),
    source("data.order.trackingParams", "/data/order/trackingParams"),
    source("trackingParams", "/trackingParams"),
    source("data.tracking_params", "/data/tracking_params"),
    source("tracking_params", "/tracking_params"),
];

pub const EVENT_TYPE_SOURCES: &[FieldSource] = &[source("type", "/type")];

pub const STATUS_SOURCES: &[FieldSource] = &[
    source("data.status", "/data/status"),
    source("data.order.status", "/data/order/status"),
    source("status", "/status"),
];

/// Render a string or number as trimmed text; `None` for anything else or blanks.
pub fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// First non-empty scalar among `sources`, with the source it came from.
pub fn first_text(payload: &Value, sources: &[FieldSource]) -> Option<(String, FieldSource)> {
    sources.iter().find_map(|src| {
        payload
            .pointer(src.pointer)
            .and_then(scalar_text)
            .map(|text| (text, *src))
    })
}

/// Outcome of looking for an amount.
#[derive(Debug, Clone, PartialEq)]
pub enum AmountLookup {
    /// A positive, finite amount
    Found(f64, FieldSource),
    /// The first non-zero candidate could not be used
    Invalid(String, FieldSource),
    /// No candidate at all (or only zeros)
    Absent,
}

/// Walk the amount sources, skipping empty and zero values.
pub fn lookup_amount(payload: &Value) -> AmountLookup {
    for src in AMOUNT_SOURCES {
        let Some(raw) = payload.pointer(src.pointer).and_then(scalar_text) else {
            continue;
        };

        match raw.parse::<f64>() {
            Ok(amount) if amount == 0.0 => continue,
            Ok(amount) if amount.is_finite() && amount > 0.0 => {
                return AmountLookup::Found(amount, *src)
            }
            _ => return AmountLookup::Invalid(raw, *src),
        }
    }
    AmountLookup::Absent
}

/// First tracking-parameter object found in the payload.
pub fn tracking_params(payload: &Value) -> Option<&Map<String, Value>> {
    TRACKING_PARAMS_SOURCES
        .iter()
        .find_map(|src| payload.pointer(src.pointer).and_then(Value::as_object))
}

/// First alias with a non-empty value in the tracking parameters.
pub fn find_referral(
    params: &Map<String, Value>,
    aliases: &[String],
) -> Option<(String, String)> {
    aliases.iter().find_map(|alias| {
        params
            .get(alias)
            .and_then(scalar_text)
            .map(|value| (alias.clone(), value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&json!("  abc ")), Some("abc".to_string()));
        assert_eq!(scalar_text(&json!(12)), Some("12".to_string()));
        assert_eq!(scalar_text(&json!("")), None);
        assert_eq!(scalar_text(&json!(null)), None);
        assert_eq!(scalar_text(&json!({"a": 1})), None);
        assert_eq!(scalar_text(&json!(true)), None);
    }

    #[test]
    fn test_lookup_amount_priority() {
        let payload = json!({
            "data": {"amounts": {"total": {"value": "10.00", "amount": 99}}},
            "amount": 5
        });
        match lookup_amount(&payload) {
            AmountLookup::Found(amount, src) => {
                assert_eq!(amount, 10.0);
                assert_eq!(src.name, "data.amounts.total.value");
            }
            other => panic!("unexpected lookup: {:?}", other),
        }
    }

    #[test]
    fn test_lookup_amount_skips_zero() {
        let payload = json!({"total_price": "0.00", "total": 0, "amount": 19.99});
        match lookup_amount(&payload) {
            AmountLookup::Found(amount, src) => {
                assert_eq!(amount, 19.99);
                assert_eq!(src.name, "amount");
            }
            other => panic!("unexpected lookup: {:?}", other),
        }
    }

    #[test]
    fn test_lookup_amount_invalid() {
        let payload = json!({"total": "abc", "amount": 10});
        assert!(matches!(lookup_amount(&payload), AmountLookup::Invalid(raw, _) if raw == "abc"));

        let payload = json!({"amount": -4});
        assert!(matches!(lookup_amount(&payload), AmountLookup::Invalid(_, _)));
    }

    #[test]
    fn test_lookup_amount_absent() {
        assert_eq!(lookup_amount(&json!({})), AmountLookup::Absent);
        assert_eq!(lookup_amount(&json!({"amount": 0})), AmountLookup::Absent);
        assert_eq!(lookup_amount(&json!({"amount": null})), AmountLookup::Absent);
    }

    #[test]
    fn test_first_text_order_id() {
        let payload = json!({"id": "top", "data": {"friendlyId": "FW-1", "id": ""}});
        let (id, src) = first_text(&payload, ORDER_ID_SOURCES).unwrap();
        assert_eq!(id, "FW-1");
        assert_eq!(src.name, "data.friendlyId");
    }

    #[test]
    fn test_find_referral_alias_order() {
        let payload = json!({"utm_source": "newsletter", "ref": "", "tap_ref": "AFF9"});
        let params = payload.as_object().unwrap();
        let aliases: Vec<String> = ["ref", "tap_ref", "utm_source"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(
            find_referral(params, &aliases),
            Some(("tap_ref".to_string(), "AFF9".to_string()))
        );
    }

    #[test]
    fn test_tracking_params_location() {
        let payload = json!({"trackingParams": {"ref": "A"}, "data": {"order": {"trackingParams": {"ref": "B"}}}});
        let params = tracking_params(&payload).unwrap();
        assert_eq!(params.get("ref"), Some(&json!("B")));
    }
}
