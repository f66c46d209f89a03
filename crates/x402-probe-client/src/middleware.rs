//! Middleware for handling HTTP 402 Payment Required responses.
//!
//! [`X402Payments`] intercepts a 402 response, selects one of the
//! enumerated payment options, enforces the configured spend ceiling,
//! obtains a signed payment header from the [`PaymentSigner`], and
//! retries the original request carrying proof of payment.

use http::{Extensions, HeaderValue, StatusCode};
use reqwest::{Request, Response};
use reqwest_middleware as rqm;
use std::sync::Arc;
use tracing::{debug, instrument};
use x402_probe_types::{PaymentOption, PaymentRequiredResponse, TokenAmount};

use crate::select::{OptionSelector, PreferNetwork};
use crate::signer::{PaymentSigner, SignerError};

/// Request header carrying the signed payment authorization.
pub const X_PAYMENT: &str = "X-Payment";
/// Response header carrying the settlement receipt.
pub const X_PAYMENT_RESPONSE: &str = "X-Payment-Response";

/// Errors that can occur while negotiating an x402 payment.
#[derive(Debug, thiserror::Error)]
pub enum X402PaymentsError {
    /// The 402 response body did not contain a parseable list of
    /// acceptable payment options.
    #[error("Malformed 402 response: {0}")]
    MalformedPaymentRequired(String),
    /// The server enumerated options but the selection policy matched
    /// none of them.
    #[error("No acceptable payment option found among {count} offered")]
    NoSuitablePaymentOption { count: usize },
    /// The selected option asks for more than the configured ceiling.
    /// Prevents accidental overspending.
    #[error("Payment amount {requested} exceeds maximum allowed {allowed}")]
    AmountOverCeiling {
        requested: TokenAmount,
        allowed: TokenAmount,
    },
    /// The wallet collaborator declined or failed to sign.
    #[error("Payment signing failed")]
    Signing(#[source] SignerError),
    /// The original request could not be cloned for the paid retry.
    /// Typically a streaming body.
    #[error("Request object is not cloneable. Are you passing a streaming body?")]
    RequestNotCloneable,
    /// The signed authorization did not fit into an HTTP header value.
    #[error("Failed to encode payment authorization as HTTP header")]
    HeaderValueEncode(#[source] http::header::InvalidHeaderValue),
}

impl From<X402PaymentsError> for rqm::Error {
    fn from(error: X402PaymentsError) -> Self {
        rqm::Error::Middleware(error.into())
    }
}

/// Middleware that settles HTTP 402 challenges and retries the request
/// with an `X-Payment` header.
#[derive(Clone)]
pub struct X402Payments {
    signer: Arc<dyn PaymentSigner>,
    selector: Arc<dyn OptionSelector>,
    max_amount: TokenAmount,
}

impl X402Payments {
    /// Creates the middleware around a wallet-signing collaborator.
    ///
    /// Defaults: options on Base are preferred, and the spend ceiling
    /// is zero, meaning every paid option is rejected until a ceiling
    /// is set with [`X402Payments::max_amount`].
    pub fn with_signer(signer: Arc<dyn PaymentSigner>) -> Self {
        Self {
            signer,
            selector: Arc::new(PreferNetwork::new("base")),
            max_amount: TokenAmount(0),
        }
    }

    /// Sets the per-request spend ceiling, in smallest units of the
    /// settlement asset.
    pub fn max_amount(mut self, max: impl Into<TokenAmount>) -> Self {
        self.max_amount = max.into();
        self
    }

    /// Replaces the option-selection policy.
    pub fn select_with<S: OptionSelector + 'static>(mut self, selector: S) -> Self {
        self.selector = Arc::new(selector);
        self
    }

    /// Ensures the selected option does not exceed the configured ceiling.
    fn assert_ceiling(&self, selected: &PaymentOption) -> Result<(), X402PaymentsError> {
        if selected.max_amount_required > self.max_amount {
            return Err(X402PaymentsError::AmountOverCeiling {
                requested: selected.max_amount_required,
                allowed: self.max_amount,
            });
        }
        Ok(())
    }

    /// Selects an option from a parsed 402 body, enforces the ceiling,
    /// and obtains the signed payment header.
    #[instrument(name = "x402.build_payment_header", skip_all, fields(offered = required.accepts.len()))]
    pub async fn build_payment_header(
        &self,
        required: &PaymentRequiredResponse,
    ) -> Result<HeaderValue, X402PaymentsError> {
        let selected = self
            .selector
            .select(&required.accepts)
            .ok_or(X402PaymentsError::NoSuitablePaymentOption {
                count: required.accepts.len(),
            })?;
        debug!(
            network = %selected.network,
            amount = %selected.max_amount_required,
            resource = %selected.resource,
            "Selected payment option"
        );
        self.assert_ceiling(selected)?;
        if !self.signer.is_available() {
            return Err(X402PaymentsError::Signing(SignerError::Unavailable));
        }
        let authorization = self
            .signer
            .authorize(selected)
            .await
            .map_err(X402PaymentsError::Signing)?;
        HeaderValue::from_str(&authorization).map_err(X402PaymentsError::HeaderValueEncode)
    }
}

#[async_trait::async_trait]
impl rqm::Middleware for X402Payments {
    /// Intercepts the response. On 402, constructs a payment and
    /// retries the request once with proof of payment attached.
    #[instrument(name = "x402.handle", skip(self, req, extensions, next), fields(method = %req.method(), url = %req.url()))]
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: rqm::Next<'_>,
    ) -> rqm::Result<Response> {
        let retry_req = req.try_clone(); // For retrying with payment later

        let res = next.clone().run(req, extensions).await?;
        if res.status() != StatusCode::PAYMENT_REQUIRED {
            return Ok(res); // Passthrough
        }

        debug!("Received 402 Payment Required");
        let body = res.bytes().await?;
        let payment_required: PaymentRequiredResponse = serde_json::from_slice(&body)
            .map_err(|e| X402PaymentsError::MalformedPaymentRequired(e.to_string()))?;

        let payment_header = self.build_payment_header(&payment_required).await?;
        let mut retry = retry_req.ok_or(X402PaymentsError::RequestNotCloneable)?;
        let headers = retry.headers_mut();
        headers.insert(X_PAYMENT, payment_header);
        headers.insert(
            "Access-Control-Expose-Headers",
            HeaderValue::from_static(X_PAYMENT_RESPONSE),
        );
        next.run(retry, extensions).await
    }
}
