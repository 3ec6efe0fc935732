//! Payable deposits that mint metered tokens.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use super::balance::BalanceTracker;
use super::config::DepositConfig;
use super::context::GateContext;
use super::conversion::ConversionEstimator;
use super::flight::RefreshTrigger;
use super::monitor::TransactionMonitor;
use crate::domain::amount::{to_raw, TokenAmount, NATIVE_DECIMALS};
use crate::domain::rate::ConversionRate;
use crate::domain::transaction::{PendingTransaction, TxKind, TxOutcome};
use crate::error::{GateError, GateResult};

/// Preview of a deposit before it is submitted.
#[derive(Debug, Clone, Serialize)]
pub struct DepositQuote {
    pub base: Decimal,
    pub estimate: TokenAmount,
    pub rate: ConversionRate,
    /// Below the recommended minimum; allowed but warned about.
    pub below_minimum: bool,
}

pub struct DepositOrchestrator {
    context: Arc<GateContext>,
    monitor: Arc<TransactionMonitor>,
    estimator: Arc<ConversionEstimator>,
    balance: Arc<BalanceTracker>,
    config: DepositConfig,
}

impl DepositOrchestrator {
    #[must_use]
    pub fn new(
        context: Arc<GateContext>,
        monitor: Arc<TransactionMonitor>,
        estimator: Arc<ConversionEstimator>,
        balance: Arc<BalanceTracker>,
        config: DepositConfig,
    ) -> Self {
        Self {
            context,
            monitor,
            estimator,
            balance,
            config,
        }
    }

    #[must_use]
    pub fn quote(&self, base: Decimal) -> DepositQuote {
        DepositQuote {
            base,
            estimate: self.estimator.estimate(base),
            rate: self.estimator.rate(),
            below_minimum: base > Decimal::ZERO && base < self.config.min_deposit,
        }
    }

    /// Submit a deposit of `base` units of base currency.
    ///
    /// # Errors
    ///
    /// - [`GateError::InvalidAmount`] for non-positive `base`
    /// - [`GateError::NotConnected`] without a bound account
    /// - the classified dispatch failure otherwise
    pub async fn deposit(&self, base: Decimal) -> GateResult<PendingTransaction> {
        if base <= Decimal::ZERO {
            return Err(GateError::InvalidAmount {
                reason: format!("deposit must be positive, got {base}"),
            });
        }
        let account = self.context.account()?;
        if base < self.config.min_deposit {
            warn!(
                base = %base,
                minimum = %self.config.min_deposit,
                "Deposit below recommended minimum"
            );
        }

        let value = to_raw(base, NATIVE_DECIMALS)?;
        let hash = self
            .context
            .ledger()
            .deposit(value)
            .await
            .map_err(|e| self.monitor.dispatch_failed(TxKind::Deposit, &e))?;

        let pending = PendingTransaction::submitted(hash, TxKind::Deposit);
        self.monitor.begin(&pending);
        info!(account = %account, base = %base, tx = %hash, "Deposit submitted");
        Ok(pending)
    }

    /// Wait for a deposit and refresh the balance once it confirms.
    ///
    /// Returns the refreshed balance.
    ///
    /// # Errors
    ///
    /// Returns the outcome as an error if the deposit reverted, was cancelled
    /// or did not confirm before the stuck ceiling.
    pub async fn await_deposit(&self, pending: &PendingTransaction) -> GateResult<TokenAmount> {
        let hash = pending.hash;
        match self.monitor.confirm(hash).await {
            TxOutcome::Confirmed => {
                if self.monitor.handle_once(hash) {
                    self.balance.refresh(RefreshTrigger::Confirmation).await;
                    self.monitor.forget(&hash);
                    info!(tx = %hash, balance = %self.balance.get_balance(), "Deposit confirmed");
                }
                Ok(self.balance.get_balance())
            }
            TxOutcome::Reverted => Err(GateError::TransactionReverted {
                reason: format!("deposit {hash} reverted"),
            }),
            TxOutcome::Cancelled => Err(GateError::UserCancelled),
            TxOutcome::Stuck => Err(GateError::ConfirmationTimeout {
                kind: TxKind::Deposit,
                tx: hash,
                waited_secs: self.monitor.config().stuck_ceiling_secs,
            }),
        }
    }
}
