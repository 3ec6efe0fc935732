//! Locally tracked ledger transactions and their outcomes.

use std::fmt;

use alloy_primitives::TxHash;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a tracked transaction does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Approval,
    Deposit,
    Query,
}

impl TxKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Approval => "approval",
            Self::Deposit => "deposit",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local status of a tracked transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Submitted,
    Confirming,
    Confirmed,
    Reverted,
    Cancelled,
}

impl TxStatus {
    /// Whether the status can no longer change.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Reverted | Self::Cancelled)
    }
}

/// A transaction the gate dispatched and is waiting on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingTransaction {
    pub hash: TxHash,
    pub kind: TxKind,
    pub status: TxStatus,
    pub submitted_at: DateTime<Utc>,
}

impl PendingTransaction {
    #[must_use]
    pub fn submitted(hash: TxHash, kind: TxKind) -> Self {
        Self {
            hash,
            kind,
            status: TxStatus::Submitted,
            submitted_at: Utc::now(),
        }
    }
}

/// Result of a mined transaction as reported by its receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// How waiting on a transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    Confirmed,
    Reverted,
    Cancelled,
    /// No receipt before the stuck ceiling; the ledger may still mine it.
    Stuck,
}

/// Classification of a failed ledger interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    UserRejected,
    Reverted,
    Transport,
}

const REJECTION_PHRASES: &[&str] = &[
    "user rejected",
    "rejected the request",
    "user denied",
    "denied transaction",
    "cancelled",
    "canceled",
];

const REVERT_PHRASES: &[&str] = &[
    "revert",
    "out of gas",
    "insufficient funds",
    "insufficient allowance",
    "exceeds balance",
];

impl FailureKind {
    /// Classify a wallet or node error message.
    ///
    /// Wallet stacks do not share a structured rejection code, so this
    /// matches on known phrases. Unknown messages are transport failures.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if REJECTION_PHRASES.iter().any(|p| lower.contains(p)) {
            Self::UserRejected
        } else if REVERT_PHRASES.iter().any(|p| lower.contains(p)) {
            Self::Reverted
        } else {
            Self::Transport
        }
    }
}
