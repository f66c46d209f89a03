use async_trait::async_trait;
use x402_probe_types::PaymentOption;

/// Wallet-signing collaborator.
///
/// Implementations hold the signing identity (a browser wallet bridge,
/// a local keystore, a remote signer) and produce the encoded
/// `X-Payment` header value for a selected payment option. The header
/// encoding and the authorization math are wholly theirs; the
/// middleware never inspects either.
#[async_trait]
pub trait PaymentSigner: Send + Sync {
    /// Whether a signing identity is currently available.
    fn is_available(&self) -> bool {
        true
    }

    /// Builds and signs a payment authorization for `option`, returning
    /// the encoded `X-Payment` header value.
    async fn authorize(&self, option: &PaymentOption) -> Result<String, SignerError>;
}

/// Errors surfaced by a [`PaymentSigner`].
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// No signing identity is connected.
    #[error("No signing identity available")]
    Unavailable,
    /// The signer (or its user) declined to authorize the payment.
    #[error("Payment authorization rejected: {0}")]
    Rejected(String),
    /// The authorization could not be constructed or encoded.
    #[error("Failed to build payment authorization: {0}")]
    Authorization(String),
}
