//! Normalized conversion record and normalizer outcomes.

use serde::Serialize;

/// A conversion ready to be submitted to Tapfiliate.
///
/// Only the normalizer builds these, and only after the amount and the
/// order id have been validated. Fields are read through accessors outside
/// this crate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalConversion {
    /// Fourthwall order id
    pub(crate) external_id: String,
    /// Order total, finite and greater than zero
    pub(crate) amount: f64,
    /// ISO currency code
    pub(crate) currency: String,
    /// Customer email, or the configured fallback
    pub(crate) customer_email: String,
    /// Referral code or visitor/click id from the tracking parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) referral_or_visitor_id: Option<String>,
    /// Tapfiliate program id, from configuration
    pub(crate) program_id: String,
}

impl CanonicalConversion {
    pub(super) fn new(
        external_id: String,
        amount: f64,
        currency: String,
        customer_email: String,
        referral_or_visitor_id: Option<String>,
        program_id: String,
    ) -> Self {
        Self {
            external_id,
            amount,
            currency,
            customer_email,
            referral_or_visitor_id,
            program_id,
        }
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn customer_email(&self) -> &str {
        &self.customer_email
    }

    pub fn referral_or_visitor_id(&self) -> Option<&str> {
        self.referral_or_visitor_id.as_deref()
    }

    pub fn program_id(&self) -> &str {
        &self.program_id
    }
}

/// Result of running an order through the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// Submit this conversion
    Conversion(CanonicalConversion),
    /// Valid order without a referral, and the policy says not to submit it
    Unattributed { external_id: String },
}

/// Result of the event gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Process,
    Ignore { reason: String },
}
