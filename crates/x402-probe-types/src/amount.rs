use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

/// A token amount in the smallest unit of the settlement asset.
///
/// On the wire this is a non-negative integer string, e.g. `"100000"`
/// for $0.10 of a 6-decimal stablecoin. An empty string or `"0"`
/// denotes a free resource.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(pub u128);

/// Errors produced when parsing a wire-format token amount.
#[derive(Debug, thiserror::Error)]
pub enum TokenAmountParseError {
    #[error("Token amount must be a non-negative integer string, got {0:?}")]
    NotAnInteger(String),
    #[error("Token amount {0:?} does not fit into 128 bits")]
    Overflow(String),
}

impl TokenAmount {
    /// Whether this amount denotes a free (non-paid) resource.
    pub fn is_free(&self) -> bool {
        self.0 == 0
    }

    /// Formats the amount as a human-readable USD-style price.
    ///
    /// Zero renders as `"Free"`. Other values are scaled by `decimals`
    /// and shown with two decimal places, or four when the amount is
    /// below one cent, so `"100000"` at 6 decimals renders `"$0.10"`.
    pub fn display_price(&self, decimals: u32) -> String {
        if self.is_free() {
            return "Free".to_string();
        }
        let Ok(amount) = i128::try_from(self.0) else {
            // Beyond what rust_decimal can scale. Show raw units.
            return format!("{} units", self.0);
        };
        match Decimal::try_from_i128_with_scale(amount, decimals) {
            Ok(scaled) => {
                let sub_cent = scaled < Decimal::new(1, 2);
                let rounded = scaled.round_dp(if sub_cent { 4 } else { 2 });
                format!("${rounded}")
            }
            Err(_) => format!("{} units", self.0),
        }
    }
}

impl FromStr for TokenAmount {
    type Err = TokenAmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(TokenAmount(0));
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TokenAmountParseError::NotAnInteger(s.to_string()));
        }
        trimmed
            .parse::<u128>()
            .map(TokenAmount)
            .map_err(|_| TokenAmountParseError::Overflow(s.to_string()))
    }
}

impl From<u128> for TokenAmount {
    fn from(value: u128) -> Self {
        TokenAmount(value)
    }
}

impl Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
