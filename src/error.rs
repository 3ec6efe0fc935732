use alloy_primitives::{TxHash, U256};
use thiserror::Error;

use crate::domain::error::DomainError;
use crate::domain::transaction::TxKind;
use crate::port::outbound::ledger::LedgerError;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Failures of the payment gate.
///
/// Every variant is cheap to clone so a single outcome can be delivered to
/// every waiter observing the same transaction hash.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("no account connected")]
    NotConnected,

    #[error("contract metadata not loaded yet")]
    NotReady,

    #[error("invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("invalid generation request: {reason}")]
    InvalidRequest { reason: String },

    #[error("a query transaction is already in flight for this account")]
    AlreadyInProgress,

    #[error("request cancelled in wallet")]
    UserCancelled,

    #[error("transaction reverted: {reason}")]
    TransactionReverted { reason: String },

    #[error("network error: {reason}")]
    NetworkError { reason: String },

    #[error("allowance {allowance} still below required {required} after a fresh check")]
    StaleAllowanceRace { required: U256, allowance: U256 },

    #[error("payment for {tx} was spent but generation failed: {reason}")]
    GenerationFailed { tx: TxHash, reason: String },

    #[error("{kind} {tx} not confirmed after {waited_secs}s; it may still land on chain")]
    ConfirmationTimeout {
        kind: TxKind,
        tx: TxHash,
        waited_secs: u64,
    },

    #[error("transaction {tx} was not submitted by this gate")]
    UnknownTransaction { tx: TxHash },

    #[error("transaction {tx} was already handled and its result released")]
    AlreadySettled { tx: TxHash },
}

impl GateError {
    /// Wallet-level rejection, which resolves to a neutral idle state.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }

    /// Whether a fresh attempt may succeed without operator action.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UserCancelled
                | Self::TransactionReverted { .. }
                | Self::NetworkError { .. }
                | Self::StaleAllowanceRace { .. }
                | Self::ConfirmationTimeout { .. }
        )
    }

    /// True once the metered request was mined and its tokens consumed.
    #[must_use]
    pub fn spend_consumed(&self) -> bool {
        matches!(self, Self::GenerationFailed { .. })
    }
}

pub type GateResult<T> = std::result::Result<T, GateError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("connection error: {0}")]
    Connection(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        // dialoguer::Error wraps an IO error
        Error::Io(std::io::Error::other(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_retryable_but_not_a_spend() {
        let err = GateError::UserCancelled;
        assert!(err.is_cancellation());
        assert!(err.is_retryable());
        assert!(!err.spend_consumed());
    }

    #[test]
    fn generation_failure_message_mentions_spend() {
        let err = GateError::GenerationFailed {
            tx: TxHash::repeat_byte(0xab),
            reason: "upstream 500".into(),
        };
        assert!(err.spend_consumed());
        assert!(!err.is_retryable());
        let text = err.to_string();
        assert!(text.contains("was spent"), "{text}");
        assert!(text.contains("upstream 500"), "{text}");
    }

    #[test]
    fn gate_error_converts_into_crate_error() {
        let err: Error = GateError::NotConnected.into();
        assert!(matches!(err, Error::Gate(GateError::NotConnected)));
        assert_eq!(err.to_string(), "no account connected");
    }
}
