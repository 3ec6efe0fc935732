//! Transaction monitor.
//!
//! Tracks one current transaction per kind, classifies dispatch failures,
//! polls receipts with bounded backoff and gates outcome handling so each
//! hash is handled once.
//!
//! A transaction with no receipt after the stuck ceiling is not failed on
//! the ledger. Only the local slot is released and [`TxOutcome::Stuck`] is
//! returned; it may still be mined and reconciled later.

mod backoff;
mod once;

pub use backoff::{poll, Backoff, PollOutcome};
pub use once::HandleOnce;

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::TxHash;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::config::MonitorConfig;
use crate::domain::transaction::{
    FailureKind, PendingTransaction, ReceiptStatus, TxKind, TxOutcome, TxStatus,
};
use crate::error::GateError;
use crate::port::{LedgerError, TokenLedger};

pub struct TransactionMonitor {
    ledger: Arc<dyn TokenLedger>,
    config: MonitorConfig,
    current: Mutex<HashMap<TxKind, TxHash>>,
    tracked: DashMap<TxHash, PendingTransaction>,
    handled: HandleOnce,
}

impl TransactionMonitor {
    #[must_use]
    pub fn new(ledger: Arc<dyn TokenLedger>, config: MonitorConfig) -> Self {
        Self {
            ledger,
            config,
            current: Mutex::new(HashMap::new()),
            tracked: DashMap::new(),
            handled: HandleOnce::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Start tracking a freshly dispatched transaction as current for its kind.
    pub fn begin(&self, pending: &PendingTransaction) {
        let replaced = self.current.lock().insert(pending.kind, pending.hash);
        if let Some(previous) = replaced.filter(|h| *h != pending.hash) {
            debug!(kind = %pending.kind, previous = %previous, "Replacing current transaction");
        }
        self.tracked.insert(pending.hash, pending.clone());
        info!(kind = %pending.kind, tx = %pending.hash, "Transaction submitted");
    }

    /// The current transaction of `kind`, if any.
    #[must_use]
    pub fn current(&self, kind: TxKind) -> Option<PendingTransaction> {
        let hash = self.current.lock().get(&kind).copied()?;
        self.tracked.get(&hash).map(|p| p.clone())
    }

    #[must_use]
    pub fn status(&self, hash: &TxHash) -> Option<TxStatus> {
        self.tracked.get(hash).map(|p| p.status)
    }

    /// Free the slot of `kind` if `hash` still holds it.
    pub fn release(&self, kind: TxKind, hash: TxHash) {
        let mut current = self.current.lock();
        if current.get(&kind) == Some(&hash) {
            current.remove(&kind);
        }
    }

    /// Map a ledger failure onto the gate taxonomy.
    ///
    /// A write without a signer means the session only watches an account.
    #[must_use]
    pub fn classify(error: &LedgerError) -> GateError {
        if matches!(error, LedgerError::NoSigner) {
            return GateError::NotConnected;
        }
        match error.kind() {
            FailureKind::UserRejected => GateError::UserCancelled,
            FailureKind::Reverted => GateError::TransactionReverted {
                reason: error.to_string(),
            },
            FailureKind::Transport => GateError::NetworkError {
                reason: error.to_string(),
            },
        }
    }

    /// Log and classify a failed dispatch of `kind`.
    pub fn dispatch_failed(&self, kind: TxKind, error: &LedgerError) -> GateError {
        let classified = Self::classify(error);
        if classified.is_cancellation() {
            info!(kind = %kind, "Transaction cancelled in wallet");
        } else {
            warn!(kind = %kind, error = %error, "Transaction dispatch failed");
        }
        classified
    }

    /// Wait for `hash` to reach a final outcome or the stuck ceiling.
    pub async fn confirm(&self, hash: TxHash) -> TxOutcome {
        let kind = self.tracked.get(&hash).map(|p| p.kind);
        self.set_status(hash, TxStatus::Confirming);

        let ledger = self.ledger.clone();
        let polled = poll(
            &self.config.receipt_backoff(),
            Some(self.config.stuck_ceiling()),
            |attempt| {
                let ledger = ledger.clone();
                async move {
                    match ledger.receipt(hash).await {
                        Ok(Some(ReceiptStatus::Success)) => Some(TxOutcome::Confirmed),
                        Ok(Some(ReceiptStatus::Reverted)) => Some(TxOutcome::Reverted),
                        Ok(None) => None,
                        Err(LedgerError::UserRejected(_)) => Some(TxOutcome::Cancelled),
                        Err(e) => {
                            debug!(tx = %hash, attempt, error = %e, "Receipt read failed");
                            None
                        }
                    }
                }
            },
        )
        .await;

        let outcome = match polled {
            PollOutcome::Ready(outcome) => outcome,
            PollOutcome::Exhausted | PollOutcome::TimedOut => TxOutcome::Stuck,
        };

        match outcome {
            TxOutcome::Confirmed => self.set_status(hash, TxStatus::Confirmed),
            TxOutcome::Reverted => self.set_status(hash, TxStatus::Reverted),
            TxOutcome::Cancelled => self.set_status(hash, TxStatus::Cancelled),
            TxOutcome::Stuck => warn!(
                tx = %hash,
                waited_secs = self.config.stuck_ceiling_secs,
                "No receipt before ceiling, releasing local slot; transaction may still land"
            ),
        }
        if let Some(kind) = kind {
            self.release(kind, hash);
        }
        debug!(tx = %hash, outcome = ?outcome, "Transaction outcome");
        outcome
    }

    /// Idempotent gate: `true` only for the first caller per hash.
    pub fn handle_once(&self, hash: TxHash) -> bool {
        self.handled.try_claim(hash)
    }

    #[must_use]
    pub fn is_handled(&self, hash: &TxHash) -> bool {
        self.handled.is_handled(hash)
    }

    /// Drop local tracking of `hash`. The handled record is kept.
    pub fn forget(&self, hash: &TxHash) {
        self.tracked.remove(hash);
    }

    fn set_status(&self, hash: TxHash, status: TxStatus) {
        if let Some(mut pending) = self.tracked.get_mut(&hash) {
            pending.status = status;
        }
    }
}
