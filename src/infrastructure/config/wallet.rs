//! Wallet configuration for signing ledger writes.

use serde::Deserialize;

/// Wallet configuration for signing ledger writes.
/// Private key is loaded from `WALLET_PRIVATE_KEY` env var at runtime (never from config file).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletConfig {
    /// Optional keystore path for encrypted wallet storage.
    #[serde(default)]
    pub keystore_path: Option<String>,
    /// Private key loaded from `WALLET_PRIVATE_KEY` env var at runtime
    #[serde(skip)]
    pub private_key: Option<String>,
}

impl WalletConfig {
    /// Whether writes can be signed.
    #[must_use]
    pub fn has_signer(&self) -> bool {
        self.private_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}
