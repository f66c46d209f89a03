//! Endpoint catalog entries and the payment options they advertise.
//!
//! The catalog document is a JSON array of [`EndpointDescriptor`]. Each
//! descriptor carries an ordered `accepts` list of [`PaymentOption`]
//! records describing acceptable payment methods for one resource,
//! together with the [`InputSchema`] that tells a client how to invoke
//! the underlying request.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::amount::TokenAmount;

/// One advertised payment-gated resource from the endpoint catalog.
///
/// Immutable once loaded; consumers hold references and never mutate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDescriptor {
    /// Acceptable payment methods, in server preference order. Non-empty.
    pub accepts: Vec<PaymentOption>,
    /// Resource identifier as advertised by the catalog.
    pub resource: String,
    /// Resource type tag, e.g. `"http"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Free-form catalog metadata, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// One acceptable payment method for a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOption {
    /// Settlement asset identifier, e.g. an ERC-20 contract address.
    pub asset: String,
    /// Human-readable description of the resource.
    #[serde(default)]
    pub description: String,
    /// Maximum amount required, smallest-unit denomination.
    /// Zero or absent denotes a free resource.
    #[serde(default)]
    pub max_amount_required: TokenAmount,
    /// Network identifier, e.g. `"base"`.
    pub network: String,
    /// The party to be paid.
    pub pay_to: String,
    /// The resource URL the request is issued against.
    pub resource: Url,
    /// Payment scheme tag, e.g. `"exact"`.
    pub scheme: String,
    /// How to invoke the underlying request.
    #[serde(default)]
    pub output_schema: OutputSchema,
}

/// Wrapper around the invocation schema of a payment option.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSchema {
    /// Request-side schema: method plus user-supplied fields.
    #[serde(default)]
    pub input: InputSchema,
    /// Response-side schema, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
}

/// Describes how to build the HTTP request for a gated resource.
///
/// Field maps preserve declaration order, which is also display order
/// for input collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSchema {
    /// HTTP method. Defaults to GET when the schema omits it.
    #[serde(default = "default_method")]
    pub method: String,
    /// Schema type tag, e.g. `"http"`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Body fields keyed by field name, in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_fields: Option<IndexMap<String, FieldSpec>>,
    /// Header fields keyed by header name, in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_fields: Option<IndexMap<String, FieldSpec>>,
}

impl Default for InputSchema {
    fn default() -> Self {
        Self {
            method: default_method(),
            kind: String::new(),
            body_fields: None,
            header_fields: None,
        }
    }
}

fn default_method() -> String {
    "GET".to_string()
}

/// Declared type of a user-supplied field.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    /// Anything that is not a number is collected as text.
    #[default]
    #[serde(other)]
    Text,
}

/// Specification of one user-supplied body or header field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Body of an HTTP 402 response: the enumerated acceptable payment options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredResponse {
    #[serde(default)]
    pub x402_version: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub accepts: Vec<PaymentOption>,
}
