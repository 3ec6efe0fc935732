//! Connected account and token metadata shared by every gate service.

use std::sync::Arc;

use alloy_primitives::Address;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::domain::amount::{DEFAULT_TOKEN_DECIMALS, MAX_DECIMALS};
use crate::domain::error::DomainError;
use crate::error::{GateError, GateResult, Result};
use crate::port::{ContractSet, TokenLedger};

/// Token metadata read once per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerMetadata {
    pub contracts: ContractSet,
    pub decimals: u8,
}

/// Session context: the ledger, the bound account and loaded metadata.
///
/// The account is bound on [`connect`](Self::connect) and never mutated by
/// the gate services; they only read it.
pub struct GateContext {
    ledger: Arc<dyn TokenLedger>,
    account: RwLock<Option<Address>>,
    metadata: RwLock<Option<LedgerMetadata>>,
}

impl GateContext {
    #[must_use]
    pub fn new(ledger: Arc<dyn TokenLedger>) -> Self {
        Self {
            ledger,
            account: RwLock::new(None),
            metadata: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn TokenLedger> {
        &self.ledger
    }

    /// Bind the ledger's signer as the account and load token metadata.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::NotConnected`] without a signer, or the ledger
    /// error if metadata cannot be read.
    pub async fn connect(&self) -> Result<Address> {
        let account = self.ledger.signer().ok_or(GateError::NotConnected)?;
        *self.account.write() = Some(account);
        self.load_metadata().await?;
        info!(account = %account, "Account connected");
        Ok(account)
    }

    /// Bind an account for reads only. Writes still need a signer.
    pub async fn watch(&self, account: Address) -> Result<()> {
        *self.account.write() = Some(account);
        self.load_metadata().await?;
        debug!(account = %account, "Watching account");
        Ok(())
    }

    pub fn disconnect(&self) {
        if let Some(account) = self.account.write().take() {
            info!(account = %account, "Account disconnected");
        }
    }

    /// Read token decimals once; later calls return the cached metadata.
    ///
    /// # Errors
    ///
    /// Returns the ledger error on a failed read, or
    /// [`DomainError::UnsupportedDecimals`] for an unusable exponent.
    pub async fn load_metadata(&self) -> Result<LedgerMetadata> {
        if let Some(metadata) = *self.metadata.read() {
            return Ok(metadata);
        }

        let decimals = self.ledger.decimals().await?;
        if decimals > MAX_DECIMALS {
            return Err(DomainError::UnsupportedDecimals {
                decimals,
                max: MAX_DECIMALS,
            }
            .into());
        }

        let metadata = LedgerMetadata {
            contracts: self.ledger.contracts(),
            decimals,
        };
        *self.metadata.write() = Some(metadata);
        debug!(decimals, token = %metadata.contracts.token, "Token metadata loaded");
        Ok(metadata)
    }

    /// The bound account.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::NotConnected`] if no account is bound.
    pub fn account(&self) -> GateResult<Address> {
        self.account.read().ok_or(GateError::NotConnected)
    }

    /// Loaded token metadata.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::NotReady`] before metadata has been read.
    pub fn metadata(&self) -> GateResult<LedgerMetadata> {
        self.metadata.read().ok_or(GateError::NotReady)
    }

    /// Token decimals, or the default exponent before metadata is loaded.
    #[must_use]
    pub fn decimals(&self) -> u8 {
        self.metadata
            .read()
            .map_or(DEFAULT_TOKEN_DECIMALS, |m| m.decimals)
    }
}
