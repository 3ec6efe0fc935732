//! Allowance read-model and coalesced approvals.
//!
//! The cached allowance is only updated by reads and may lag the ledger.
//! Decisions that gate a submission go through
//! [`AllowanceGate::force_check`], which always reads the chain.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::config::AllowanceConfig;
use super::context::GateContext;
use super::flight::{RefreshTrigger, SingleFlight};
use super::monitor::{poll, PollOutcome, TransactionMonitor};
use crate::domain::amount::{to_raw, TokenAmount};
use crate::domain::transaction::{PendingTransaction, TxKind, TxOutcome};
use crate::error::{GateError, GateResult};

/// (owner, spender)
type Pair = (Address, Address);

/// (spender, raw amount)
type ApprovalKey = (Address, U256);

struct Inner {
    context: Arc<GateContext>,
    monitor: Arc<TransactionMonitor>,
    config: AllowanceConfig,
    values: Arc<RwLock<HashMap<Pair, U256>>>,
    reads: SingleFlight<(Pair, RefreshTrigger), ()>,
    dispatches: SingleFlight<ApprovalKey, GateResult<PendingTransaction>>,
    pending: Arc<Mutex<HashMap<ApprovalKey, PendingTransaction>>>,
}

/// Cheap to clone; clones share the same cache.
#[derive(Clone)]
pub struct AllowanceGate {
    inner: Arc<Inner>,
}

impl AllowanceGate {
    #[must_use]
    pub fn new(
        context: Arc<GateContext>,
        monitor: Arc<TransactionMonitor>,
        config: AllowanceConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                context,
                monitor,
                config,
                values: Arc::new(RwLock::new(HashMap::new())),
                reads: SingleFlight::new(),
                dispatches: SingleFlight::new(),
                pending: Arc::new(Mutex::new(HashMap::new())),
            }),
        }
    }

    /// Cached allowance, zero if never read.
    #[must_use]
    pub fn current_allowance(&self, owner: Address, spender: Address) -> TokenAmount {
        let raw = self
            .inner
            .values
            .read()
            .get(&(owner, spender))
            .copied()
            .unwrap_or(U256::ZERO);
        TokenAmount::new(raw, self.inner.context.decimals())
    }

    /// Re-read the allowance into the cache. Concurrent refreshes of the same
    /// pair from the same trigger share one read.
    pub async fn refresh(
        &self,
        owner: Address,
        spender: Address,
        trigger: RefreshTrigger,
    ) -> TokenAmount {
        let ledger = self.inner.context.ledger().clone();
        let values = self.inner.values.clone();

        self.inner
            .reads
            .run(((owner, spender), trigger), move || async move {
                match ledger.allowance(owner, spender).await {
                    Ok(raw) => {
                        values.write().insert((owner, spender), raw);
                        debug!(owner = %owner, spender = %spender, %trigger, allowance = %raw, "Allowance refreshed");
                    }
                    Err(e) => {
                        warn!(owner = %owner, spender = %spender, %trigger, error = %e, "Allowance refresh failed");
                    }
                }
            })
            .await;

        self.current_allowance(owner, spender)
    }

    /// Whether the cached allowance of the bound account covers `cost`.
    ///
    /// Advisory only; use [`force_check`](Self::force_check) before spending.
    #[must_use]
    pub fn has_sufficient_allowance(&self, cost: Decimal) -> bool {
        let (Ok(owner), Ok(metadata)) = (self.inner.context.account(), self.inner.context.metadata())
        else {
            return false;
        };
        let Ok(required) = to_raw(cost, metadata.decimals) else {
            return false;
        };
        self.current_allowance(owner, metadata.contracts.query_tool)
            .covers(required)
    }

    /// Read the allowance from the chain, update the cache and compare it to
    /// `cost`. Falls back to the cached value if the read fails.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidAmount`] for a negative cost.
    pub async fn force_check(
        &self,
        owner: Address,
        spender: Address,
        cost: Decimal,
    ) -> GateResult<bool> {
        let required = to_raw(cost, self.inner.context.decimals())?;
        match self.inner.context.ledger().allowance(owner, spender).await {
            Ok(raw) => {
                self.inner.values.write().insert((owner, spender), raw);
                debug!(owner = %owner, spender = %spender, allowance = %raw, required = %required, "Allowance checked");
                Ok(raw >= required)
            }
            Err(e) => {
                warn!(owner = %owner, spender = %spender, error = %e, "Allowance read failed, using cached value");
                Ok(self.current_allowance(owner, spender).covers(required))
            }
        }
    }

    /// Submit an approval of `amount` tokens for `spender`.
    ///
    /// A second approval for the same spender and amount while one is
    /// pending returns the existing transaction instead of dispatching again.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::NotConnected`] without a bound account, or the
    /// classified dispatch failure.
    pub async fn approve(&self, spender: Address, amount: Decimal) -> GateResult<PendingTransaction> {
        let owner = self.inner.context.account()?;
        let raw = to_raw(amount, self.inner.context.decimals())?;
        let key = (spender, raw);

        if let Some(existing) = self.inner.pending.lock().get(&key).cloned() {
            debug!(tx = %existing.hash, spender = %spender, "Coalescing approval with pending transaction");
            return Ok(existing);
        }

        let ledger = self.inner.context.ledger().clone();
        let monitor = self.inner.monitor.clone();
        let pending = self.inner.pending.clone();

        self.inner
            .dispatches
            .run(key, move || async move {
                let hash = ledger
                    .approve(spender, raw)
                    .await
                    .map_err(|e| monitor.dispatch_failed(TxKind::Approval, &e))?;
                let tx = PendingTransaction::submitted(hash, TxKind::Approval);
                monitor.begin(&tx);
                pending.lock().insert(key, tx.clone());
                info!(owner = %owner, spender = %spender, amount = %raw, tx = %hash, "Approval submitted");
                Ok(tx)
            })
            .await
    }

    /// Wait for an approval to reach a final outcome.
    ///
    /// On confirmation the allowance is refreshed at once and again after
    /// each configured follow-up delay.
    ///
    /// # Errors
    ///
    /// Returns the outcome as an error if the approval reverted, was
    /// cancelled or did not confirm before the stuck ceiling.
    pub async fn await_approval(
        &self,
        spender: Address,
        tx: &PendingTransaction,
    ) -> GateResult<()> {
        let hash = tx.hash;
        let outcome = self.inner.monitor.confirm(hash).await;
        self.inner.pending.lock().retain(|_, p| p.hash != hash);

        match outcome {
            TxOutcome::Confirmed => {
                if self.inner.monitor.handle_once(hash) {
                    let owner = self.inner.context.account()?;
                    self.refresh(owner, spender, RefreshTrigger::Confirmation)
                        .await;
                    self.schedule_follow_ups(owner, spender);
                    self.inner.monitor.forget(&hash);
                    info!(tx = %hash, spender = %spender, "Approval confirmed");
                }
                Ok(())
            }
            TxOutcome::Reverted => Err(GateError::TransactionReverted {
                reason: format!("approval {hash} reverted"),
            }),
            TxOutcome::Cancelled => Err(GateError::UserCancelled),
            TxOutcome::Stuck => Err(GateError::ConfirmationTimeout {
                kind: TxKind::Approval,
                tx: hash,
                waited_secs: self.inner.monitor.config().stuck_ceiling_secs,
            }),
        }
    }

    /// Poll [`force_check`](Self::force_check) until the bound account's
    /// allowance covers `cost` or the settle budget runs out.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::NotConnected`] or [`GateError::NotReady`] if the
    /// session is not set up.
    pub async fn wait_for_allowance(&self, cost: Decimal) -> GateResult<bool> {
        let owner = self.inner.context.account()?;
        let spender = self.inner.context.metadata()?.contracts.query_tool;

        let outcome = poll(&self.inner.config.settle_backoff(), None, |_| async move {
            match self.force_check(owner, spender, cost).await {
                Ok(true) => Some(()),
                _ => None,
            }
        })
        .await;

        match outcome {
            PollOutcome::Ready(()) => Ok(true),
            PollOutcome::Exhausted | PollOutcome::TimedOut => {
                warn!(owner = %owner, spender = %spender, cost = %cost, "Allowance not visible after settle budget");
                Ok(false)
            }
        }
    }

    fn schedule_follow_ups(&self, owner: Address, spender: Address) {
        for delay in self.inner.config.follow_up_delays() {
            let gate = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                gate.refresh(owner, spender, RefreshTrigger::FollowUp).await;
            });
        }
    }
}
