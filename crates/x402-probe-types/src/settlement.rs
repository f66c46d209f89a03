//! Settlement receipts decoded from the `X-Payment-Response` header.
//!
//! After a payment is accepted the server attaches a base64-encoded
//! JSON receipt to the final response. The probing core only checks
//! for its existence and shows a truncated transaction reference; the
//! full decode is kept here so the raw wire shape stays in one place.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;
use serde::{Deserialize, Serialize};

/// Server-side confirmation that a submitted payment authorization
/// was accepted (or why it was not).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementInfo {
    pub success: bool,
    /// Transaction reference on the settlement network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

/// Errors produced when decoding a settlement header value.
#[derive(Debug, thiserror::Error)]
pub enum SettlementDecodeError {
    #[error("Settlement header is not valid base64")]
    Base64(#[from] base64::DecodeError),
    #[error("Settlement header is not valid JSON")]
    Json(#[from] serde_json::Error),
}

impl SettlementInfo {
    /// Decodes the raw `X-Payment-Response` header value.
    pub fn from_header(value: &str) -> Result<Self, SettlementDecodeError> {
        let bytes = b64.decode(value.trim())?;
        let info = serde_json::from_slice(&bytes)?;
        Ok(info)
    }

    /// A display-safe truncation of the transaction reference,
    /// e.g. `0x12345678...9abcdef0`.
    pub fn short_transaction(&self) -> Option<String> {
        let tx = self.transaction.as_deref()?;
        if tx.len() <= 18 || !tx.is_ascii() {
            return Some(tx.to_string());
        }
        Some(format!("{}...{}", &tx[..10], &tx[tx.len() - 8..]))
    }
}
