//! Token ledger port for balance, allowance, price and metered writes.
//!
//! Every chain interaction the gate performs goes through [`TokenLedger`].
//! Reads are plain calls; writes return the transaction hash as soon as the
//! signer accepted and broadcast them. Confirmation is observed separately
//! through [`TokenLedger::receipt`].

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use thiserror::Error;

use crate::domain::transaction::{FailureKind, ReceiptStatus};

/// Structured failure at the ledger boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The signer refused to sign or the user cancelled the prompt.
    #[error("signer rejected the request: {0}")]
    UserRejected(String),

    /// The node rejected the call or the transaction reverted.
    #[error("execution reverted: {0}")]
    Reverted(String),

    /// RPC unreachable, timed out or returned garbage.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A write was attempted without a signing key.
    #[error("no signer configured")]
    NoSigner,
}

impl LedgerError {
    /// Build from an untyped provider or wallet error message.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match FailureKind::classify(&message) {
            FailureKind::UserRejected => Self::UserRejected(message),
            FailureKind::Reverted => Self::Reverted(message),
            FailureKind::Transport => Self::Transport(message),
        }
    }

    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::UserRejected(_) => FailureKind::UserRejected,
            Self::Reverted(_) => FailureKind::Reverted,
            Self::Transport(_) | Self::NoSigner => FailureKind::Transport,
        }
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Addresses of the contracts the gate talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractSet {
    /// Metered ERC-20 token.
    pub token: Address,
    /// Payable deposit manager that mints tokens for base currency.
    pub deposit_manager: Address,
    /// Query contract that charges tokens per request.
    pub query_tool: Address,
}

/// Port for the token ledger.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (`Send + Sync`); services share one
/// ledger behind an `Arc`.
///
/// # Errors
///
/// All methods return [`LedgerError`] so callers can tell a wallet rejection
/// from a revert or a transport failure.
#[async_trait]
pub trait TokenLedger: Send + Sync {
    /// Account that signs writes, if a signer is configured.
    fn signer(&self) -> Option<Address>;

    fn contracts(&self) -> ContractSet;

    /// Decimals exponent of the metered token.
    async fn decimals(&self) -> LedgerResult<u8>;

    async fn balance_of(&self, owner: Address) -> LedgerResult<U256>;

    async fn allowance(&self, owner: Address, spender: Address) -> LedgerResult<U256>;

    /// Oracle price as a scaled integer (tokens per base unit).
    async fn price(&self) -> LedgerResult<U256>;

    /// Submit `approve(spender, amount)` on the token.
    async fn approve(&self, spender: Address, amount: U256) -> LedgerResult<TxHash>;

    /// Submit `queryAI(cost)` with an explicit gas ceiling.
    async fn submit_query(&self, cost: U256, gas_limit: u64) -> LedgerResult<TxHash>;

    /// Submit the payable deposit with `value` base units attached.
    async fn deposit(&self, value: U256) -> LedgerResult<TxHash>;

    /// Receipt status of a transaction, `None` while unmined.
    async fn receipt(&self, tx: TxHash) -> LedgerResult<Option<ReceiptStatus>>;
}
