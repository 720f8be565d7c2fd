//! Tapfiliate outbound adapter.
//!
//! The endpoint and payload shape are chosen by [`OutboundShape`]:
//! - `conversions`: `program_id`, `amount`, `external_id`, `customer_email`
//! - `postback`: `external_id`, `amount`, `currency`, `referral_code`
//!
//! [`OutboundShape`]: crate::config::OutboundShape

pub mod client;
pub mod types;

pub use client::TapfiliateClient;
pub use types::{ConversionsBody, OutboundRequest, PostbackBody, SubmitResponse};
