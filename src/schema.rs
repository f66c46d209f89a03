//! Resolution of user-collectible input fields for a payment option.
//!
//! An [`InputSchema`](x402_probe_types::InputSchema) may declare body
//! and header fields. Header names reserved for the payment protocol
//! are populated by the payment-capable client, never by the user, so
//! they are stripped from the collectible set here.

use std::collections::HashMap;

use x402_probe_types::{FieldSpec, PaymentOption};

/// Case-insensitive markers of protocol-reserved header names.
/// A header whose name contains any of these is never user-collectible.
pub const RESERVED_HEADER_MARKERS: [&str; 3] = ["x-payment", "authorization", "x-402"];

/// Whether a header name is reserved for the payment protocol.
pub fn is_reserved_header(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    RESERVED_HEADER_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

/// The user-collectible fields of one payment option, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedInputs {
    /// Body fields requiring user entry.
    pub body_fields: Vec<(String, FieldSpec)>,
    /// Header fields requiring user entry, reserved names removed.
    pub header_fields: Vec<(String, FieldSpec)>,
}

impl ResolvedInputs {
    /// Whether the endpoint needs any user input before execution.
    pub fn needs_input(&self) -> bool {
        !self.body_fields.is_empty() || !self.header_fields.is_empty()
    }

    /// Names of required fields that have no non-empty value yet,
    /// body fields first, each set in declaration order.
    pub fn missing_required(&self, values: &HashMap<String, String>) -> Vec<String> {
        self.body_fields
            .iter()
            .chain(self.header_fields.iter())
            .filter(|(name, spec)| {
                spec.required && values.get(name).map(|v| v.trim().is_empty()).unwrap_or(true)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Determines which fields of `option` require user entry.
pub fn resolve(option: &PaymentOption) -> ResolvedInputs {
    let schema = &option.output_schema.input;
    let body_fields = schema
        .body_fields
        .iter()
        .flatten()
        .map(|(name, spec)| (name.clone(), spec.clone()))
        .collect();
    let header_fields = schema
        .header_fields
        .iter()
        .flatten()
        .filter(|(name, _)| !is_reserved_header(name))
        .map(|(name, spec)| (name.clone(), spec.clone()))
        .collect();
    ResolvedInputs {
        body_fields,
        header_fields,
    }
}
