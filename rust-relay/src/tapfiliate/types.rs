//! Outbound request bodies for the two Tapfiliate endpoints.

use serde::Serialize;
use serde_json::Value;

use crate::config::OutboundShape;
use crate::normalize::CanonicalConversion;

/// Body for `POST /{version}/conversions/`.
#[derive(Debug, Serialize)]
pub struct ConversionsBody<'a> {
    pub program_id: &'a str,
    pub amount: f64,
    pub external_id: &'a str,
    pub customer_email: &'a str,
    pub currency: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<&'a str>,
}

/// Body for `POST /{version}/postback/`.
#[derive(Debug, Serialize)]
pub struct PostbackBody<'a> {
    pub external_id: &'a str,
    pub amount: f64,
    pub currency: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<&'a str>,
    pub customer_email: &'a str,
}

/// A conversion rendered for a specific endpoint.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OutboundRequest<'a> {
    Conversions(ConversionsBody<'a>),
    Postback(PostbackBody<'a>),
}

impl OutboundShape {
    /// Path below the base URL, including the version segment.
    pub fn path(&self, version: &str) -> String {
        match self {
            OutboundShape::Conversions => format!("{version}/conversions/"),
            OutboundShape::Postback => format!("{version}/postback/"),
        }
    }

    /// Header carrying the API key.
    pub fn api_key_header(&self) -> &'static str {
        match self {
            OutboundShape::Conversions => "Api-Key",
            OutboundShape::Postback => "X-Api-Key",
        }
    }

    pub fn request<'a>(&self, conversion: &'a CanonicalConversion) -> OutboundRequest<'a> {
        let referral_code = conversion.referral_or_visitor_id.as_deref();
        match self {
            OutboundShape::Conversions => OutboundRequest::Conversions(ConversionsBody {
                program_id: &conversion.program_id,
                amount: conversion.amount,
                external_id: &conversion.external_id,
                customer_email: &conversion.customer_email,
                currency: &conversion.currency,
                referral_code,
            }),
            OutboundShape::Postback => OutboundRequest::Postback(PostbackBody {
                external_id: &conversion.external_id,
                amount: conversion.amount,
                currency: &conversion.currency,
                referral_code,
                customer_email: &conversion.customer_email,
            }),
        }
    }
}

/// Successful Tapfiliate response.
#[derive(Debug, Clone)]
pub struct SubmitResponse {
    pub status: u16,
    /// Parsed JSON body; non-JSON bodies are kept as a string
    pub body: Value,
}
