use x402_probe_types::PaymentOption;

/// Strategy for choosing one payment option from a 402 response.
///
/// Selection is a policy object rather than hardwired logic so callers
/// can rank options however they like (by network, asset, price).
pub trait OptionSelector: Send + Sync {
    fn select<'a>(&self, options: &'a [PaymentOption]) -> Option<&'a PaymentOption>;
}

/// Selects the first enumerated option, i.e. the server's own preference.
pub struct FirstOption;

impl OptionSelector for FirstOption {
    fn select<'a>(&self, options: &'a [PaymentOption]) -> Option<&'a PaymentOption> {
        options.first()
    }
}

/// Prefers the option whose network matches a configured hint, falling
/// back to the first option when no network matches.
pub struct PreferNetwork {
    network: String,
}

impl PreferNetwork {
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
        }
    }
}

impl OptionSelector for PreferNetwork {
    fn select<'a>(&self, options: &'a [PaymentOption]) -> Option<&'a PaymentOption> {
        options
            .iter()
            .find(|option| option.network == self.network)
            .or_else(|| options.first())
    }
}
