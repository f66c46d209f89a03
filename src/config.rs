//! Environment-derived configuration.
//!
//! Configuration is read from process environment variables, with a
//! `.env` file loaded first when present. Only the catalog URL and the
//! application origin are mandatory; everything else has a default.

use std::env;
use std::time::Duration;
use url::Url;
use x402_probe_types::TokenAmount;

/// The fallback network hint when `PROBE_PREFERRED_NETWORK` is unset.
pub const DEFAULT_PREFERRED_NETWORK: &str = "base";
/// The fallback spend ceiling, $0.10 of a 6-decimal stablecoin.
pub const DEFAULT_MAX_SPEND: u128 = 100_000;
/// The fallback balance poll cadence in seconds.
pub const DEFAULT_BALANCE_POLL_SECS: u64 = 10;

/// Errors produced while assembling configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value for environment variable {variable}: {message}")]
    Invalid {
        variable: &'static str,
        message: String,
    },
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Where to fetch the endpoint catalog from.
    pub catalog_url: Url,
    /// The origin the session runs under, used for mixed-content checks.
    pub app_origin: Url,
    /// Network hint used when choosing among several payment options.
    pub preferred_network: String,
    /// Per-request spend ceiling in smallest asset units.
    pub max_spend: TokenAmount,
    /// Cadence of the background balance poll.
    pub balance_poll_interval: Duration,
}

impl ProbeConfig {
    /// Reads configuration from the process environment, loading a
    /// `.env` file first if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let catalog_url = require_url("PROBE_CATALOG_URL", &lookup)?;
        let app_origin = require_url("PROBE_APP_ORIGIN", &lookup)?;
        let preferred_network = lookup("PROBE_PREFERRED_NETWORK")
            .unwrap_or_else(|| DEFAULT_PREFERRED_NETWORK.to_string());
        let max_spend = match lookup("PROBE_MAX_SPEND") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                variable: "PROBE_MAX_SPEND",
                message: format!("{e}"),
            })?,
            None => TokenAmount(DEFAULT_MAX_SPEND),
        };
        let poll_secs = match lookup("PROBE_BALANCE_POLL_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                variable: "PROBE_BALANCE_POLL_SECS",
                message: format!("{e}"),
            })?,
            None => DEFAULT_BALANCE_POLL_SECS,
        };
        Ok(Self {
            catalog_url,
            app_origin,
            preferred_network,
            max_spend,
            balance_poll_interval: Duration::from_secs(poll_secs),
        })
    }
}

fn require_url(
    variable: &'static str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Url, ConfigError> {
    let raw = lookup(variable).ok_or(ConfigError::Missing(variable))?;
    raw.parse().map_err(|e| ConfigError::Invalid {
        variable,
        message: format!("{e}"),
    })
}
