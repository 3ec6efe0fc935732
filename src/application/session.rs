//! End-to-end paid generation driven through the flow state machine.

use std::sync::Arc;

use alloy_primitives::{Address, TxHash};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use super::allowance::AllowanceGate;
use super::balance::BalanceTracker;
use super::config::AllowanceConfig;
use super::context::GateContext;
use super::flight::RefreshTrigger;
use super::query::QuerySubmitter;
use crate::domain::amount::to_raw;
use crate::domain::flow::{transition, FlowEvent, FlowState};
use crate::domain::generation::GenerationResult;
use crate::domain::quote::{GenerationRequest, QueryCostQuote};
use crate::domain::transaction::TxKind;
use crate::error::{GateError, GateResult};

/// How a paid generation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Generated {
        tx: TxHash,
        result: GenerationResult,
    },
    /// Declined in the wallet; nothing was spent.
    Cancelled,
    /// The approval or query of `tx` did not confirm in time and may still
    /// land. Only a timed-out query can still be reconciled into content.
    TimedOut { kind: TxKind, tx: TxHash },
    Failed(GateError),
}

pub struct PaidGeneration {
    context: Arc<GateContext>,
    allowance: AllowanceGate,
    query: Arc<QuerySubmitter>,
    balance: Arc<BalanceTracker>,
    config: AllowanceConfig,
    state: Mutex<FlowState>,
}

impl PaidGeneration {
    #[must_use]
    pub fn new(
        context: Arc<GateContext>,
        allowance: AllowanceGate,
        query: Arc<QuerySubmitter>,
        balance: Arc<BalanceTracker>,
        config: AllowanceConfig,
    ) -> Self {
        Self {
            context,
            allowance,
            query,
            balance,
            config,
            state: Mutex::new(FlowState::idle()),
        }
    }

    #[must_use]
    pub fn state(&self) -> FlowState {
        self.state.lock().clone()
    }

    /// Run a full paid generation for `request`.
    pub async fn run(&self, request: GenerationRequest) -> SessionOutcome {
        let cost = QueryCostQuote::for_request(&request);
        {
            let mut state = self.state.lock();
            match transition(&state, &FlowEvent::Start { cost: cost.tokens() }) {
                Ok(next) => *state = next,
                Err(e) => {
                    debug!(error = %e, "Paid generation already running");
                    return SessionOutcome::Failed(GateError::AlreadyInProgress);
                }
            }
        }
        info!(topic = %request.topic, kind = %request.kind, cost = %cost, "Paid generation started");

        match self.drive(cost, request).await {
            Ok((tx, result)) => {
                self.apply(FlowEvent::QueryConfirmed);
                self.balance.refresh(RefreshTrigger::Confirmation).await;
                SessionOutcome::Generated { tx, result }
            }
            Err(e) if e.is_cancellation() => {
                self.apply(FlowEvent::Cancelled);
                info!("Paid generation cancelled in wallet");
                SessionOutcome::Cancelled
            }
            Err(GateError::ConfirmationTimeout { kind, tx, .. }) => {
                self.apply(FlowEvent::TimedOut { tx });
                SessionOutcome::TimedOut { kind, tx }
            }
            Err(e) => {
                if e.spend_consumed() {
                    self.balance.refresh(RefreshTrigger::Confirmation).await;
                }
                warn!(error = %e, "Paid generation failed");
                self.apply(FlowEvent::Failed { error: e.clone() });
                SessionOutcome::Failed(e)
            }
        }
    }

    async fn drive(
        &self,
        cost: QueryCostQuote,
        request: GenerationRequest,
    ) -> GateResult<(TxHash, GenerationResult)> {
        request.validate()?;
        let account = self.context.account()?;
        let spender = self.context.metadata()?.contracts.query_tool;
        let amount = cost.amount();

        if self.allowance.force_check(account, spender, amount).await? {
            self.apply(FlowEvent::AllowanceSufficient);
        } else {
            self.apply(FlowEvent::AllowanceInsufficient);
            let approval = self.allowance.approve(spender, amount).await?;
            self.apply(FlowEvent::ApprovalSubmitted { tx: approval.hash });
            self.allowance.await_approval(spender, &approval).await?;
            if !self.allowance.wait_for_allowance(amount).await? {
                debug!("Approval confirmed but allowance not visible yet");
            }
            self.apply(FlowEvent::ApprovalConfirmed);
            self.ensure_allowance(account, spender, amount).await?;
        }

        let pending = self.query.submit_query(cost, request).await?;
        self.apply(FlowEvent::QuerySubmitted { tx: pending.hash });
        let result = self.query.await_authorization(&pending).await?;
        Ok((pending.hash, result))
    }

    /// Fresh check before spending, retried once after a short pause.
    async fn ensure_allowance(
        &self,
        owner: Address,
        spender: Address,
        amount: Decimal,
    ) -> GateResult<()> {
        if self.allowance.force_check(owner, spender, amount).await? {
            return Ok(());
        }
        debug!("Allowance stale at submission, re-checking once");
        tokio::time::sleep(self.config.stale_retry_delay()).await;
        if self.allowance.force_check(owner, spender, amount).await? {
            return Ok(());
        }
        Err(GateError::StaleAllowanceRace {
            required: to_raw(amount, self.context.decimals())?,
            allowance: self.allowance.current_allowance(owner, spender).raw(),
        })
    }

    fn apply(&self, event: FlowEvent) {
        let mut state = self.state.lock();
        match transition(&state, &event) {
            Ok(next) => {
                debug!(from = state.name(), to = next.name(), "Flow transition");
                *state = next;
            }
            Err(e) => error!(error = %e, "Rejected flow transition"),
        }
    }
}
