//! Polled, display-formatted balance for the connected identity.
//!
//! The actual balance lookup (an RPC call against the settlement
//! asset's ledger) lives behind [`BalanceSource`]; this module owns the
//! polling cadence and the display formatting. A failed poll keeps the
//! previously published value rather than flashing an error at the
//! user.

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use x402_probe_types::TokenAmount;

/// Errors produced by a balance lookup.
#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    #[error("Balance lookup failed: {0}")]
    Lookup(String),
}

/// A source of the connected identity's settlement-asset balance.
#[async_trait::async_trait]
pub trait BalanceSource: Send + Sync {
    /// Returns the current balance in smallest asset units.
    async fn fetch(&self) -> Result<TokenAmount, BalanceError>;
}

/// Formats a raw balance for display with exactly two decimal places,
/// e.g. `1_500_000` at 6 decimals renders `"1.50"`.
pub fn format_balance(amount: TokenAmount, decimals: u32) -> String {
    let Ok(raw) = i128::try_from(amount.0) else {
        return amount.0.to_string();
    };
    match Decimal::try_from_i128_with_scale(raw, decimals) {
        Ok(scaled) => format!("{scaled:.2}"),
        Err(_) => amount.0.to_string(),
    }
}

/// Background poller publishing the latest formatted balance.
///
/// Dropping the watcher stops the poll task.
pub struct BalanceWatcher {
    receiver: watch::Receiver<Option<String>>,
    handle: JoinHandle<()>,
}

impl BalanceWatcher {
    /// Spawns the poll task. The first lookup happens immediately, then
    /// every `interval`.
    pub fn spawn(source: Arc<dyn BalanceSource>, decimals: u32, interval: Duration) -> Self {
        let (sender, receiver) = watch::channel(None);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match source.fetch().await {
                    Ok(amount) => {
                        let _ = sender.send(Some(format_balance(amount, decimals)));
                    }
                    Err(error) => {
                        // Keep showing the last known balance.
                        debug!(%error, "Balance poll failed");
                    }
                }
            }
        });
        Self { receiver, handle }
    }

    /// The latest formatted balance, or `None` before the first
    /// successful poll.
    pub fn display(&self) -> Option<String> {
        self.receiver.borrow().clone()
    }

    /// Like [`display`](Self::display), showing `"0.00"` while no
    /// balance has been observed yet.
    pub fn display_or_zero(&self) -> String {
        self.display().unwrap_or_else(|| "0.00".to_string())
    }

    /// A receiver that observes every published balance update.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.receiver.clone()
    }
}

impl Drop for BalanceWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
