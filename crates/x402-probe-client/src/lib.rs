//! Reqwest middleware for automatic x402 payment handling.
//!
//! This crate provides [`X402Payments`], a `reqwest_middleware::Middleware`
//! that turns a plain HTTP client into a payment-capable one. When a
//! request receives a `402 Payment Required` response, the middleware
//! parses the enumerated payment options, selects one via an injectable
//! [`OptionSelector`] policy, enforces a configured spend ceiling, asks
//! a [`PaymentSigner`] collaborator for a signed payment authorization,
//! and retries the request with the `X-Payment` header attached.
//!
//! Signing itself is opaque to this crate: the [`PaymentSigner`] hands
//! back an already-encoded header value, so no key material or chain
//! specifics ever cross this boundary.
//!
//! ## Quickstart
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use x402_probe_client::{PreferNetwork, ReqwestWithPayments, X402Payments};
//!
//! let payments = X402Payments::with_signer(Arc::new(my_signer))
//!     .max_amount(100_000u128) // $0.10 at 6 decimals
//!     .select_with(PreferNetwork::new("base"));
//!
//! let client = reqwest::Client::new().with_payments(payments);
//! let response = client.get("https://api.example.com/paid").send().await?;
//! ```

mod middleware;
mod select;
mod signer;

pub use middleware::{X402Payments, X402PaymentsError, X_PAYMENT, X_PAYMENT_RESPONSE};
pub use select::{FirstOption, OptionSelector, PreferNetwork};
pub use signer::{PaymentSigner, SignerError};

use reqwest_middleware as rqm;

/// Extension trait that attaches [`X402Payments`] to a reqwest client.
pub trait ReqwestWithPayments {
    fn with_payments(self, payments: X402Payments) -> rqm::ClientWithMiddleware;
}

impl ReqwestWithPayments for reqwest::Client {
    fn with_payments(self, payments: X402Payments) -> rqm::ClientWithMiddleware {
        rqm::ClientBuilder::new(self).with(payments).build()
    }
}
