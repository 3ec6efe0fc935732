//! Cached token balance of the bound account.

use std::sync::Arc;

use alloy_primitives::Address;
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::context::GateContext;
use super::flight::{RefreshTrigger, SingleFlight};
use crate::domain::amount::TokenAmount;

/// Last successfully read balance, keyed by the account it belongs to.
type Cached = Arc<RwLock<Option<(Address, TokenAmount)>>>;

pub struct BalanceTracker {
    context: Arc<GateContext>,
    cached: Cached,
    flights: SingleFlight<RefreshTrigger, ()>,
}

impl BalanceTracker {
    #[must_use]
    pub fn new(context: Arc<GateContext>) -> Self {
        Self {
            context,
            cached: Arc::new(RwLock::new(None)),
            flights: SingleFlight::new(),
        }
    }

    /// Last read balance of the bound account, zero if never read.
    #[must_use]
    pub fn get_balance(&self) -> TokenAmount {
        let decimals = self.context.decimals();
        let Ok(account) = self.context.account() else {
            return TokenAmount::zero(decimals);
        };
        match *self.cached.read() {
            Some((owner, amount)) if owner == account => amount,
            _ => TokenAmount::zero(decimals),
        }
    }

    /// Re-read the balance. Concurrent refreshes from the same trigger share
    /// one read; a failed read keeps the previous value.
    pub async fn refresh(&self, trigger: RefreshTrigger) -> TokenAmount {
        let Ok(account) = self.context.account() else {
            return self.get_balance();
        };
        let ledger = self.context.ledger().clone();
        let decimals = self.context.decimals();
        let cached = self.cached.clone();

        self.flights
            .run(trigger, move || async move {
                match ledger.balance_of(account).await {
                    Ok(raw) => {
                        let amount = TokenAmount::new(raw, decimals);
                        *cached.write() = Some((account, amount));
                        debug!(account = %account, %trigger, balance = %amount, "Balance refreshed");
                    }
                    Err(e) => {
                        warn!(account = %account, %trigger, error = %e, "Balance refresh failed, keeping previous value");
                    }
                }
            })
            .await;

        self.get_balance()
    }

    /// Balance formatted for display.
    #[must_use]
    pub fn display(&self) -> String {
        self.get_balance().display()
    }
}
