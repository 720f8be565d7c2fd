//! Configuration module for environment variable parsing.
//!
//! Configuration is read once at process start and handed to the relay by
//! reference. Nothing below the web layer looks at the environment.

use std::env;
use std::fmt;
use std::str::FromStr;

use tracing::warn;

/// Tracking-parameter keys that may carry a referral or visitor id, in priority order.
pub const DEFAULT_REFERRAL_ALIASES: &[&str] = &[
    "ref",
    "tap_ref",
    "referral_code",
    "affiliate",
    "affiliate_id",
    "tapfiliate_click_id",
    "visitor_id",
    "utm_term",
    "utm_source",
    "utm_medium",
];

/// How inbound webhook signatures are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationPolicy {
    /// Every request must carry a valid signature; a missing secret is a server fault.
    #[default]
    Required,
    /// Skip verification entirely when no secret is configured. Insecure.
    SkipIfUnconfigured,
    /// Skip verification when the payload declares `testMode: true`. Insecure.
    SkipIfTestMode,
}

impl VerificationPolicy {
    pub fn is_insecure(&self) -> bool {
        !matches!(self, VerificationPolicy::Required)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationPolicy::Required => "required",
            VerificationPolicy::SkipIfUnconfigured => "skip-if-unconfigured",
            VerificationPolicy::SkipIfTestMode => "skip-if-test-mode",
        }
    }
}

impl FromStr for VerificationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "required" => Ok(VerificationPolicy::Required),
            "skip-if-unconfigured" => Ok(VerificationPolicy::SkipIfUnconfigured),
            "skip-if-test-mode" | "skip-if-test-mode-flag" => {
                Ok(VerificationPolicy::SkipIfTestMode)
            }
            other => Err(format!("unknown signature policy: {other}")),
        }
    }
}

/// What to do with an order that carries no referral or visitor id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferralPolicy {
    /// Forward the conversion without a referral field.
    #[default]
    Optional,
    /// Reject the webhook with a 400.
    Required,
    /// Acknowledge with a 200 but make no outbound call.
    Skip,
}

impl ReferralPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralPolicy::Optional => "optional",
            ReferralPolicy::Required => "required",
            ReferralPolicy::Skip => "skip",
        }
    }
}

impl FromStr for ReferralPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "optional" | "forward" => Ok(ReferralPolicy::Optional),
            "required" | "reject" => Ok(ReferralPolicy::Required),
            "skip" | "ignore" => Ok(ReferralPolicy::Skip),
            other => Err(format!("unknown referral policy: {other}")),
        }
    }
}

/// Which Tapfiliate endpoint (and payload shape) conversions are sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutboundShape {
    /// `POST /{version}/conversions/` with an `Api-Key` header.
    #[default]
    Conversions,
    /// `POST /{version}/postback/` with an `X-Api-Key` header.
    Postback,
}

impl OutboundShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboundShape::Conversions => "conversions",
            OutboundShape::Postback => "postback",
        }
    }
}

impl FromStr for OutboundShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conversions" | "conversion" => Ok(OutboundShape::Conversions),
            "postback" | "postbacks" => Ok(OutboundShape::Postback),
            other => Err(format!("unknown tapfiliate endpoint: {other}")),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    // =========================================================================
    // Tapfiliate (outbound)
    // =========================================================================

    /// Tapfiliate API key
    pub tapfiliate_api_key: Option<String>,

    /// Tapfiliate program the conversions are booked against
    pub tapfiliate_program_id: Option<String>,

    /// Base URL of the Tapfiliate API, without the version segment
    pub tapfiliate_base_url: String,

    /// API version path segment, e.g. "1.6"
    pub tapfiliate_api_version: String,

    /// Endpoint and payload shape for outbound conversions
    pub outbound_shape: OutboundShape,

    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Retry once when the connection to Tapfiliate cannot be established
    pub retry_on_connect_error: bool,

    /// Delay before that single retry, in milliseconds
    pub retry_backoff_ms: u64,

    // =========================================================================
    // Fourthwall (inbound)
    // =========================================================================

    /// Shared secret for HMAC signature verification
    pub webhook_secret: Option<String>,

    /// Header carrying the base64 HMAC-SHA256 signature
    pub signature_header: String,

    /// Signature verification policy
    pub verification_policy: VerificationPolicy,

    // =========================================================================
    // Normalization
    // =========================================================================

    /// Missing-referral behaviour
    pub referral_policy: ReferralPolicy,

    /// Tracking-parameter keys searched for a referral id, in priority order
    pub referral_aliases: Vec<String>,

    /// Event types to process; others are acknowledged and ignored
    pub allowed_event_types: Option<Vec<String>>,

    /// Order statuses to process; others are acknowledged and ignored
    pub allowed_statuses: Option<Vec<String>>,

    /// Currency used when the payload carries none
    pub default_currency: String,

    /// Customer email used when the payload carries none
    pub fallback_email: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            tapfiliate_api_key: None,
            tapfiliate_program_id: None,
            tapfiliate_base_url: "https://api.tapfiliate.com".to_string(),
            tapfiliate_api_version: "1.6".to_string(),
            outbound_shape: OutboundShape::default(),
            request_timeout_ms: 10_000,
            retry_on_connect_error: false,
            retry_backoff_ms: 500,
            webhook_secret: None,
            signature_header: "x-fourthwall-hmac-sha256".to_string(),
            verification_policy: VerificationPolicy::default(),
            referral_policy: ReferralPolicy::default(),
            referral_aliases: DEFAULT_REFERRAL_ALIASES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            allowed_event_types: None,
            allowed_statuses: None,
            default_currency: "USD".to_string(),
            fallback_email: "unknown@example.com".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Unset variables keep their defaults; malformed values are logged and
    /// replaced by the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let referral_policy = match non_empty(&lookup, "REFERRAL_POLICY") {
            Some(raw) => parse_or_default("REFERRAL_POLICY", &raw, defaults.referral_policy),
            None => match parse_bool(&lookup, "REFERRAL_REQUIRED") {
                Some(true) => ReferralPolicy::Required,
                _ => defaults.referral_policy,
            },
        };

        Config {
            port: parse_number(&lookup, "PORT", defaults.port),

            tapfiliate_api_key: non_empty(&lookup, "TAPFILIATE_API_KEY"),

            tapfiliate_program_id: non_empty(&lookup, "TAPFILIATE_PROGRAM_ID"),

            tapfiliate_base_url: non_empty(&lookup, "TAPFILIATE_API_BASE_URL")
                .unwrap_or(defaults.tapfiliate_base_url),

            tapfiliate_api_version: non_empty(&lookup, "TAPFILIATE_API_VERSION")
                .map(|v| v.trim_matches('/').to_string())
                .unwrap_or(defaults.tapfiliate_api_version),

            outbound_shape: non_empty(&lookup, "TAPFILIATE_ENDPOINT")
                .map(|raw| parse_or_default("TAPFILIATE_ENDPOINT", &raw, defaults.outbound_shape))
                .unwrap_or(defaults.outbound_shape),

            request_timeout_ms: parse_number(
                &lookup,
                "REQUEST_TIMEOUT_MS",
                defaults.request_timeout_ms,
            ),

            retry_on_connect_error: parse_bool(&lookup, "OUTBOUND_RETRY_ON_CONNECT_ERROR")
                .unwrap_or(defaults.retry_on_connect_error),

            retry_backoff_ms: parse_number(
                &lookup,
                "OUTBOUND_RETRY_BACKOFF_MS",
                defaults.retry_backoff_ms,
            ),

            // The secret is used verbatim as the HMAC key; only blank values count as unset.
            webhook_secret: lookup("FOURTHWALL_WEBHOOK_SECRET")
                .filter(|secret| !secret.trim().is_empty()),

            signature_header: non_empty(&lookup, "SIGNATURE_HEADER")
                .map(|h| h.to_ascii_lowercase())
                .unwrap_or(defaults.signature_header),

            verification_policy: non_empty(&lookup, "SIGNATURE_POLICY")
                .map(|raw| {
                    parse_or_default("SIGNATURE_POLICY", &raw, defaults.verification_policy)
                })
                .unwrap_or(defaults.verification_policy),

            referral_policy,

            referral_aliases: parse_csv(&lookup, "REFERRAL_PARAM_ALIASES")
                .filter(|aliases| !aliases.is_empty())
                .unwrap_or(defaults.referral_aliases),

            // An empty list would ignore every event, so it disables the gate instead.
            allowed_event_types: parse_csv(&lookup, "ALLOWED_EVENT_TYPES")
                .filter(|types| !types.is_empty()),

            allowed_statuses: parse_csv(&lookup, "ALLOWED_ORDER_STATUSES")
                .filter(|statuses| !statuses.is_empty()),

            default_currency: non_empty(&lookup, "DEFAULT_CURRENCY")
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or(defaults.default_currency),

            fallback_email: non_empty(&lookup, "FALLBACK_CUSTOMER_EMAIL")
                .unwrap_or(defaults.fallback_email),
        }
    }
}

// Secrets never reach the logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("tapfiliate_api_key", &self.tapfiliate_api_key.as_ref().map(|_| "<REDACTED>"))
            .field("tapfiliate_program_id", &self.tapfiliate_program_id)
            .field("tapfiliate_base_url", &self.tapfiliate_base_url)
            .field("tapfiliate_api_version", &self.tapfiliate_api_version)
            .field("outbound_shape", &self.outbound_shape)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("retry_on_connect_error", &self.retry_on_connect_error)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<REDACTED>"))
            .field("signature_header", &self.signature_header)
            .field("verification_policy", &self.verification_policy)
            .field("referral_policy", &self.referral_policy)
            .field("referral_aliases", &self.referral_aliases)
            .field("allowed_event_types", &self.allowed_event_types)
            .field("allowed_statuses", &self.allowed_statuses)
            .field("default_currency", &self.default_currency)
            .field("fallback_email", &self.fallback_email)
            .finish()
    }
}

/// Read a variable, treating blank values as unset.
fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or_default<T>(name: &str, raw: &str, default: T) -> T
where
    T: FromStr<Err = String>,
{
    match raw.parse() {
        Ok(v) => v,
        Err(e) => {
            warn!(env_var = name, value = %raw, error = %e, "Invalid value, using default");
            default
        }
    }
}

fn parse_number<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = non_empty(lookup, name) else {
        return default;
    };

    match raw.parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid number, using default");
            default
        }
    }
}

/// Parse a boolean flag ("true"/"false", "1"/"0", "yes"/"no").
fn parse_bool<F>(lookup: &F, name: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = non_empty(lookup, name)?;
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            warn!(env_var = name, value = %raw, "Invalid boolean, using default");
            None
        }
    }
}

/// Parse a comma-separated list of strings.
fn parse_csv<F>(lookup: &F, name: &str) -> Option<Vec<String>>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, name).map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}
