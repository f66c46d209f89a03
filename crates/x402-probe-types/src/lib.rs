//! Data model for probing x402 payment-gated endpoints.
//!
//! This crate provides the types shared by the probing core and the
//! payment-capable HTTP client. It mirrors the wire formats used by
//! x402 sellers: advertised endpoint descriptors, per-resource payment
//! options, the input schema that describes how to invoke a gated
//! resource, and the settlement receipt returned after a payment is
//! accepted.
//!
//! # Modules
//!
//! - [`amount`] - Token amounts in smallest-unit denomination and their display formatting
//! - [`descriptor`] - Endpoint catalog entries, payment options, and input schemas
//! - [`settlement`] - Settlement receipts decoded from the `X-Payment-Response` header

pub mod amount;
pub mod descriptor;
pub mod settlement;

pub use amount::{TokenAmount, TokenAmountParseError};
pub use descriptor::{
    EndpointDescriptor, FieldSpec, FieldType, InputSchema, OutputSchema, PaymentOption,
    PaymentRequiredResponse,
};
pub use settlement::{SettlementDecodeError, SettlementInfo};
