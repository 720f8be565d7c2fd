//! Fourthwall → Tapfiliate conversion relay.
//!
//! Receives Fourthwall order webhooks, normalizes them into conversions and
//! forwards each one to Tapfiliate.
//!
//! ## Architecture
//!
//! ```text
//! Webhook → signature check → event gate → normalizer → Tapfiliate → response
//! ```

pub mod config;
pub mod error;
pub mod normalize;
pub mod relay;
pub mod tapfiliate;
pub mod web;

// Re-export commonly used types
pub use config::{Config, OutboundShape, ReferralPolicy, VerificationPolicy};
pub use error::{ExtractionError, RelayError};
pub use normalize::{gate_event, normalize_order, CanonicalConversion};
pub use relay::{relay_webhook, RelayOutcome};
pub use tapfiliate::TapfiliateClient;
pub use web::{router, AppState};
