//! Metered query submission and the exactly-once handoff to generation.
//!
//! A query holds a per-account lock from dispatch until a terminal branch:
//! revert, cancellation, stuck recovery, or the end of generation. The
//! generation request is captured against the transaction hash at dispatch.
//!
//! Confirmation signals may arrive from several sources (the receipt poller,
//! an event watcher, an operator reconcile). All of them go through
//! [`QuerySubmitter::on_confirmed`], where the monitor's handle-once gate lets
//! only the first one fire listeners and start generation. Later signals wait
//! for and share the stored completion. Only the most recent settled
//! completions are kept; a signal for an older handled hash is refused
//! without generating.

use std::collections::VecDeque;
use std::sync::Arc;

use alloy_primitives::{Address, TxHash};
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use super::config::QueryConfig;
use super::context::GateContext;
use super::monitor::TransactionMonitor;
use crate::domain::amount::to_raw;
use crate::domain::generation::GenerationResult;
use crate::domain::quote::{GenerationRequest, QueryCostQuote};
use crate::domain::transaction::{PendingTransaction, ReceiptStatus, TxKind, TxOutcome};
use crate::error::{GateError, GateResult};
use crate::port::Generator;

/// Callback fired once per confirmed query hash, before generation starts.
pub type AuthorizedListener = Arc<dyn Fn(TxHash, &GenerationRequest) + Send + Sync>;

type Completion = Option<GateResult<GenerationResult>>;

struct InFlightQuery {
    account: Address,
    cost: QueryCostQuote,
    request: GenerationRequest,
    /// Released on stuck recovery while the request stays captured.
    guard: Option<OwnedMutexGuard<()>>,
}

pub struct QuerySubmitter {
    context: Arc<GateContext>,
    monitor: Arc<TransactionMonitor>,
    generator: Arc<dyn Generator>,
    config: QueryConfig,
    locks: DashMap<Address, Arc<Mutex<()>>>,
    in_flight: DashMap<TxHash, InFlightQuery>,
    completions: DashMap<TxHash, Arc<watch::Sender<Completion>>>,
    /// Settled hashes, oldest first.
    settled: parking_lot::Mutex<VecDeque<TxHash>>,
    listeners: RwLock<Vec<AuthorizedListener>>,
}

impl QuerySubmitter {
    #[must_use]
    pub fn new(
        context: Arc<GateContext>,
        monitor: Arc<TransactionMonitor>,
        generator: Arc<dyn Generator>,
        config: QueryConfig,
    ) -> Self {
        Self {
            context,
            monitor,
            generator,
            config,
            locks: DashMap::new(),
            in_flight: DashMap::new(),
            completions: DashMap::new(),
            settled: parking_lot::Mutex::new(VecDeque::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Dispatch the metered query for `request`.
    ///
    /// # Errors
    ///
    /// - [`GateError::InvalidRequest`] for a malformed request
    /// - [`GateError::NotConnected`] / [`GateError::NotReady`] before setup
    /// - [`GateError::AlreadyInProgress`] while another query of the same
    ///   account is in flight; no ledger call is made
    /// - the classified dispatch failure otherwise
    pub async fn submit_query(
        &self,
        cost: QueryCostQuote,
        request: GenerationRequest,
    ) -> GateResult<PendingTransaction> {
        request.validate()?;
        if !self.generator.supports(&request.model) {
            return Err(GateError::InvalidRequest {
                reason: format!("unknown model '{}'", request.model),
            });
        }
        let account = self.context.account()?;
        let metadata = self.context.metadata()?;

        let lock = Arc::clone(&self.locks.entry(account).or_default());
        let guard = lock.try_lock_owned().map_err(|_| {
            debug!(account = %account, "Query already in flight");
            GateError::AlreadyInProgress
        })?;

        let raw = to_raw(cost.amount(), metadata.decimals)?;
        let hash = self
            .context
            .ledger()
            .submit_query(raw, self.config.gas_limit)
            .await
            .map_err(|e| self.monitor.dispatch_failed(TxKind::Query, &e))?;

        let pending = PendingTransaction::submitted(hash, TxKind::Query);
        self.monitor.begin(&pending);
        self.completions
            .insert(hash, Arc::new(watch::channel(None).0));
        self.in_flight.insert(
            hash,
            InFlightQuery {
                account,
                cost,
                request,
                guard: Some(guard),
            },
        );
        info!(account = %account, cost = %cost, tx = %hash, "Query submitted");
        Ok(pending)
    }

    /// Register a listener fired exactly once per confirmed query.
    pub fn on_authorized<F>(&self, listener: F)
    where
        F: Fn(TxHash, &GenerationRequest) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Handle a confirmation signal for `hash` from any source.
    ///
    /// The first signal fires listeners and runs generation with the captured
    /// request; every signal returns the same completion.
    ///
    /// # Errors
    ///
    /// - [`GateError::UnknownTransaction`] for a hash this gate did not submit
    /// - [`GateError::AlreadySettled`] for a handled hash whose result was
    ///   already released
    /// - [`GateError::GenerationFailed`] if generation failed after the spend
    pub async fn on_confirmed(&self, hash: TxHash) -> GateResult<GenerationResult> {
        let Some(sender) = self.completions.get(&hash).map(|s| Arc::clone(s.value())) else {
            if self.monitor.is_handled(&hash) {
                debug!(tx = %hash, "Signal for a released completion ignored");
                return Err(GateError::AlreadySettled { tx: hash });
            }
            return Err(GateError::UnknownTransaction { tx: hash });
        };

        if self.monitor.handle_once(hash) {
            match self.in_flight.remove(&hash) {
                Some((_, query)) => self.authorize(hash, query, sender.clone()),
                None => {
                    error!(tx = %hash, "Confirmed query has no captured request");
                    sender.send_replace(Some(Err(GateError::UnknownTransaction { tx: hash })));
                }
            }
        } else {
            debug!(tx = %hash, "Duplicate confirmation signal ignored");
        }

        let completion = Self::wait_for(&sender).await;
        self.retire(hash);
        completion
    }

    /// Wait for the query to confirm, then hand off to generation.
    ///
    /// # Errors
    ///
    /// - [`GateError::TransactionReverted`] / [`GateError::UserCancelled`]
    ///   when the query did not go through; the lock is released
    /// - [`GateError::ConfirmationTimeout`] when no receipt arrived before the
    ///   stuck ceiling; the lock is released but the request stays captured
    ///   so a late confirmation still generates once
    /// - [`GateError::GenerationFailed`] as for [`on_confirmed`](Self::on_confirmed)
    pub async fn await_authorization(
        &self,
        pending: &PendingTransaction,
    ) -> GateResult<GenerationResult> {
        let hash = pending.hash;
        match self.monitor.confirm(hash).await {
            TxOutcome::Confirmed => self.on_confirmed(hash).await,
            TxOutcome::Reverted => {
                let err = GateError::TransactionReverted {
                    reason: format!("query {hash} reverted"),
                };
                self.abandon(hash, err.clone());
                Err(err)
            }
            TxOutcome::Cancelled => {
                self.abandon(hash, GateError::UserCancelled);
                Err(GateError::UserCancelled)
            }
            TxOutcome::Stuck => {
                self.force_idle(hash);
                Err(GateError::ConfirmationTimeout {
                    kind: TxKind::Query,
                    tx: hash,
                    waited_secs: self.monitor.config().stuck_ceiling_secs,
                })
            }
        }
    }

    /// One-shot receipt read for a query forced idle earlier.
    ///
    /// Returns `Ok(None)` if the transaction is still unmined.
    ///
    /// # Errors
    ///
    /// Returns the classified read failure, [`GateError::TransactionReverted`]
    /// for a reverted query, or the confirmation errors of
    /// [`on_confirmed`](Self::on_confirmed).
    pub async fn reconcile(&self, hash: TxHash) -> GateResult<Option<GenerationResult>> {
        if self.monitor.is_handled(&hash) {
            return self.on_confirmed(hash).await.map(Some);
        }

        let receipt = self
            .context
            .ledger()
            .receipt(hash)
            .await
            .map_err(|e| TransactionMonitor::classify(&e))?;

        match receipt {
            Some(ReceiptStatus::Success) => {
                info!(tx = %hash, "Reconciled query landed");
                self.on_confirmed(hash).await.map(Some)
            }
            Some(ReceiptStatus::Reverted) => {
                let err = GateError::TransactionReverted {
                    reason: format!("query {hash} reverted"),
                };
                self.abandon(hash, err.clone());
                Err(err)
            }
            None => Ok(None),
        }
    }

    /// Whether `account` currently holds the query lock.
    #[must_use]
    pub fn is_in_flight(&self, account: &Address) -> bool {
        self.locks
            .get(account)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    /// Completions currently stored, settled or pending.
    #[must_use]
    pub fn stored_completions(&self) -> usize {
        self.completions.len()
    }

    /// Hashes forced idle and still awaiting reconciliation.
    #[must_use]
    pub fn unreconciled(&self) -> Vec<TxHash> {
        self.in_flight
            .iter()
            .filter(|entry| entry.guard.is_none())
            .map(|entry| *entry.key())
            .collect()
    }

    fn authorize(
        &self,
        hash: TxHash,
        query: InFlightQuery,
        sender: Arc<watch::Sender<Completion>>,
    ) {
        for listener in self.listeners.read().iter() {
            listener(hash, &query.request);
        }
        info!(account = %query.account, cost = %query.cost, tx = %hash, "Query authorized, generating");

        let generator = self.generator.clone();
        let monitor = self.monitor.clone();
        tokio::spawn(async move {
            let InFlightQuery {
                account,
                request,
                guard,
                ..
            } = query;

            let result = generator
                .generate(&request, account)
                .await
                .map_err(|e| {
                    error!(tx = %hash, error = %e, "Generation failed after paid query");
                    GateError::GenerationFailed {
                        tx: hash,
                        reason: e.to_string(),
                    }
                });

            // the account may submit again only once generation finished
            drop(guard);
            monitor.forget(&hash);
            sender.send_replace(Some(result));
        });
    }

    fn abandon(&self, hash: TxHash, error: GateError) {
        self.monitor.handle_once(hash);
        if let Some((_, query)) = self.in_flight.remove(&hash) {
            debug!(account = %query.account, tx = %hash, "Query abandoned, lock released");
        }
        if let Some(sender) = self.completions.get(&hash) {
            sender.send_replace(Some(Err(error)));
        }
        self.monitor.forget(&hash);
        self.retire(hash);
    }

    /// Mark `hash` settled and release the oldest completions beyond the
    /// retention limit.
    fn retire(&self, hash: TxHash) {
        let mut settled = self.settled.lock();
        if settled.contains(&hash) {
            return;
        }
        settled.push_back(hash);
        while settled.len() > self.config.retained_completions {
            if let Some(evicted) = settled.pop_front() {
                self.completions.remove(&evicted);
                debug!(tx = %evicted, "Completion released");
            }
        }
    }

    fn force_idle(&self, hash: TxHash) {
        if let Some(mut query) = self.in_flight.get_mut(&hash) {
            query.guard = None;
            warn!(
                account = %query.account,
                tx = %hash,
                "Query forced idle; reconcile once it lands"
            );
        }
    }

    async fn wait_for(sender: &watch::Sender<Completion>) -> GateResult<GenerationResult> {
        let mut receiver = sender.subscribe();
        let completion = receiver
            .wait_for(Option::is_some)
            .await
            .map_err(|_| GateError::NetworkError {
                reason: "completion channel closed".into(),
            })?;
        match &*completion {
            Some(result) => result.clone(),
            None => Err(GateError::NetworkError {
                reason: "completion missing".into(),
            }),
        }
    }
}
