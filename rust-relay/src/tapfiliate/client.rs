//! Tapfiliate HTTP client.
//!
//! One pooled `reqwest::Client` is shared by every request handler. Each
//! conversion results in a single POST to the configured endpoint.

use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{error, info, warn};
use url::Url;

use super::types::{OutboundRequest, SubmitResponse};
use crate::config::{Config, OutboundShape};
use crate::error::RelayError;
use crate::normalize::CanonicalConversion;

/// Client for the Tapfiliate REST API.
#[derive(Debug, Clone)]
pub struct TapfiliateClient {
    http: Client,
    endpoint: Url,
    shape: OutboundShape,
    retry_on_connect_error: bool,
    retry_backoff: Duration,
}

impl TapfiliateClient {
    /// Create a client for the endpoint selected in `config`.
    pub fn new(config: &Config) -> Result<Self, RelayError> {
        let mut base = config.tapfiliate_base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        let endpoint = Url::parse(&base)
            .and_then(|url| url.join(&config.outbound_shape.path(&config.tapfiliate_api_version)))
            .map_err(|e| {
                RelayError::ServerMisconfiguration(format!("invalid Tapfiliate base URL: {e}"))
            })?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| {
                RelayError::ServerMisconfiguration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            endpoint,
            shape: config.outbound_shape,
            retry_on_connect_error: config.retry_on_connect_error,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// Full URL conversions are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Submit one conversion.
    ///
    /// Non-2xx answers come back as [`RelayError::UpstreamStatus`] with the
    /// body untouched.
    pub async fn submit(
        &self,
        conversion: &CanonicalConversion,
        api_key: &str,
    ) -> Result<SubmitResponse, RelayError> {
        let body = self.shape.request(conversion);

        info!(
            endpoint = %self.endpoint,
            shape = self.shape.as_str(),
            external_id = %conversion.external_id,
            amount = conversion.amount,
            currency = %conversion.currency,
            has_referral = conversion.referral_or_visitor_id.is_some(),
            "tapfiliate_submit_start"
        );

        let response = match self.send(&body, api_key).await {
            // Connection never established, so nothing reached Tapfiliate.
            Err(e) if e.is_connect() && self.retry_on_connect_error => {
                warn!(
                    error = %e,
                    backoff_ms = self.retry_backoff.as_millis() as u64,
                    "tapfiliate_connect_failed_retrying"
                );
                sleep(self.retry_backoff).await;
                self.send(&body, api_key).await
            }
            other => other,
        };

        let response = response.map_err(|e| {
            error!(error = %e, timeout = e.is_timeout(), "tapfiliate_request_failed");
            RelayError::UpstreamTransport(e)
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            error!(error = %e, "tapfiliate_response_read_failed");
            RelayError::UpstreamTransport(e)
        })?;

        if !status.is_success() {
            warn!(
                status_code = status.as_u16(),
                body_preview = &text[..floor_char_boundary(&text, 200)],
                "tapfiliate_error_response"
            );
            return Err(RelayError::UpstreamStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        info!(status_code = status.as_u16(), "tapfiliate_submit_complete");

        Ok(SubmitResponse {
            status: status.as_u16(),
            body,
        })
    }

    async fn send(
        &self,
        body: &OutboundRequest<'_>,
        api_key: &str,
    ) -> Result<Response, reqwest::Error> {
        self.http
            .post(self.endpoint.clone())
            .header(self.shape.api_key_header(), api_key)
            .json(body)
            .send()
            .await
    }
}

/// Largest index `<= max` that falls on a char boundary of `s`.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}
