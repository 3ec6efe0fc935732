//! In-memory token ledger with scripted mining.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::{account, contracts};
use crate::domain::rate::{ConversionRate, PRICE_SCALE_DECIMALS};
use crate::domain::transaction::ReceiptStatus;
use crate::port::{ContractSet, LedgerError, LedgerResult, TokenLedger};

/// State change applied once a successful write becomes visible.
#[derive(Debug, Clone, Copy)]
enum Effect {
    Approve {
        owner: Address,
        spender: Address,
        amount: U256,
    },
    Query {
        owner: Address,
        spender: Address,
        cost: U256,
    },
    Deposit {
        owner: Address,
        value: U256,
    },
}

#[derive(Debug, Clone, Copy)]
struct Mined {
    at: Instant,
    status: ReceiptStatus,
}

#[derive(Default)]
struct State {
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    receipts: HashMap<TxHash, Mined>,
    effects: HashMap<TxHash, Effect>,
    last_query: Option<(U256, u64)>,
    last_deposit: Option<U256>,
    next_write_error: Option<LedgerError>,
}

/// Ledger double for gate tests.
///
/// Writes return fresh hashes. A write is mined when a test calls
/// [`mine`](Self::mine) or automatically when built
/// [`with_auto_mine`](Self::with_auto_mine). Effects of a successful write
/// (allowance, balance) become visible to reads after the receipt plus an
/// optional lag, which models a lagging read-model.
pub struct ScriptedLedger {
    signer: Option<Address>,
    contracts: ContractSet,
    decimals: u8,
    price: Mutex<U256>,
    state: Mutex<State>,
    auto_mine: Option<(Duration, ReceiptStatus)>,
    effect_lag: Duration,
    read_delay: Duration,
    write_delay: Duration,
    fail_reads: AtomicBool,
    next_hash: AtomicU64,
    approve_calls: AtomicUsize,
    query_calls: AtomicUsize,
    deposit_calls: AtomicUsize,
    balance_reads: AtomicUsize,
    allowance_reads: AtomicUsize,
}

impl Default for ScriptedLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLedger {
    /// Ledger signed by [`account()`], 18 decimals, oracle at 1800 tokens
    /// per base unit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signer: Some(account()),
            contracts: contracts(),
            decimals: 18,
            price: Mutex::new(U256::from(180_000_000_000u64)),
            state: Mutex::new(State::default()),
            auto_mine: None,
            effect_lag: Duration::ZERO,
            read_delay: Duration::ZERO,
            write_delay: Duration::ZERO,
            fail_reads: AtomicBool::new(false),
            next_hash: AtomicU64::new(1),
            approve_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
            deposit_calls: AtomicUsize::new(0),
            balance_reads: AtomicUsize::new(0),
            allowance_reads: AtomicUsize::new(0),
        }
    }

    // ----- Builders -----

    #[must_use]
    pub fn without_signer(mut self) -> Self {
        self.signer = None;
        self
    }

    #[must_use]
    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    #[must_use]
    pub fn with_balance(self, owner: Address, raw: U256) -> Self {
        self.set_balance(owner, raw);
        self
    }

    #[must_use]
    pub fn with_allowance(self, owner: Address, spender: Address, raw: U256) -> Self {
        self.set_allowance(owner, spender, raw);
        self
    }

    #[must_use]
    pub fn with_price(self, scaled: U256) -> Self {
        *self.price.lock() = scaled;
        self
    }

    /// Mine every write `delay` after dispatch with `status`.
    #[must_use]
    pub fn with_auto_mine(mut self, delay: Duration, status: ReceiptStatus) -> Self {
        self.auto_mine = Some((delay, status));
        self
    }

    /// Delay between a receipt and its effect becoming readable.
    #[must_use]
    pub fn with_effect_lag(mut self, lag: Duration) -> Self {
        self.effect_lag = lag;
        self
    }

    #[must_use]
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    #[must_use]
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    // ----- Controls -----

    pub fn set_balance(&self, owner: Address, raw: U256) {
        self.state.lock().balances.insert(owner, raw);
    }

    pub fn set_allowance(&self, owner: Address, spender: Address, raw: U256) {
        self.state.lock().allowances.insert((owner, spender), raw);
    }

    /// Make every read fail with a transport error until reset.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Fail the next write with `error`.
    pub fn fail_next_write(&self, error: LedgerError) {
        self.state.lock().next_write_error = Some(error);
    }

    /// Mine `hash` now.
    pub fn mine(&self, hash: TxHash, status: ReceiptStatus) {
        self.mine_at(hash, Instant::now(), status);
    }

    /// Mine `hash` once `delay` has elapsed from now.
    pub fn mine_after(&self, hash: TxHash, delay: Duration, status: ReceiptStatus) {
        self.mine_at(hash, Instant::now() + delay, status);
    }

    // ----- Observations -----

    /// Calls to `approve`, including failed ones.
    pub fn approve_dispatches(&self) -> usize {
        self.approve_calls.load(Ordering::SeqCst)
    }

    /// Calls to `submit_query`, including failed ones.
    pub fn query_dispatches(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    /// Calls to `deposit`, including failed ones.
    pub fn deposit_dispatches(&self) -> usize {
        self.deposit_calls.load(Ordering::SeqCst)
    }

    pub fn balance_reads(&self) -> usize {
        self.balance_reads.load(Ordering::SeqCst)
    }

    pub fn allowance_reads(&self) -> usize {
        self.allowance_reads.load(Ordering::SeqCst)
    }

    /// Raw cost and gas limit of the last query dispatch.
    pub fn last_query(&self) -> Option<(U256, u64)> {
        self.state.lock().last_query
    }

    pub fn last_deposit_value(&self) -> Option<U256> {
        self.state.lock().last_deposit
    }

    /// Balance as stored, ignoring effects that are not yet visible.
    pub fn balance(&self, owner: Address) -> U256 {
        self.settle();
        self.state
            .lock()
            .balances
            .get(&owner)
            .copied()
            .unwrap_or(U256::ZERO)
    }

    // ----- Internals -----

    fn mine_at(&self, hash: TxHash, at: Instant, status: ReceiptStatus) {
        self.state.lock().receipts.insert(hash, Mined { at, status });
    }

    async fn read_gate(&self) -> LedgerResult<()> {
        if !self.read_delay.is_zero() {
            tokio::time::sleep(self.read_delay).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("scripted read failure".into()));
        }
        self.settle();
        Ok(())
    }

    async fn write(&self, effect: Effect) -> LedgerResult<TxHash> {
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        if self.signer.is_none() {
            return Err(LedgerError::NoSigner);
        }
        let mut state = self.state.lock();
        if let Some(error) = state.next_write_error.take() {
            return Err(error);
        }

        let hash = TxHash::left_padding_from(
            &self.next_hash.fetch_add(1, Ordering::SeqCst).to_be_bytes(),
        );
        state.effects.insert(hash, effect);
        if let Some((delay, status)) = self.auto_mine {
            state.receipts.insert(
                hash,
                Mined {
                    at: Instant::now() + delay,
                    status,
                },
            );
        }
        Ok(hash)
    }

    /// Apply effects of successful receipts whose lag has passed.
    fn settle(&self) {
        let now = Instant::now();
        let price = *self.price.lock();
        let mut state = self.state.lock();

        let ready: Vec<TxHash> = state
            .effects
            .keys()
            .filter(|hash| {
                state.receipts.get(*hash).is_some_and(|mined| {
                    mined.status == ReceiptStatus::Success && mined.at + self.effect_lag <= now
                })
            })
            .copied()
            .collect();

        for hash in ready {
            let Some(effect) = state.effects.remove(&hash) else {
                continue;
            };
            match effect {
                Effect::Approve {
                    owner,
                    spender,
                    amount,
                } => {
                    state.allowances.insert((owner, spender), amount);
                }
                Effect::Query {
                    owner,
                    spender,
                    cost,
                } => {
                    let allowance = state.allowances.entry((owner, spender)).or_default();
                    *allowance = allowance.saturating_sub(cost);
                    let balance = state.balances.entry(owner).or_default();
                    *balance = balance.saturating_sub(cost);
                }
                Effect::Deposit { owner, value } => {
                    let minted = ConversionRate::from_oracle(price, PRICE_SCALE_DECIMALS)
                        .map_or(U256::ZERO, |rate| rate.apply(value, 18, self.decimals));
                    *state.balances.entry(owner).or_default() += minted;
                }
            }
        }
    }

    fn owner(&self) -> Address {
        self.signer.unwrap_or(Address::ZERO)
    }
}

#[async_trait]
impl TokenLedger for ScriptedLedger {
    fn signer(&self) -> Option<Address> {
        self.signer
    }

    fn contracts(&self) -> ContractSet {
        self.contracts
    }

    async fn decimals(&self) -> LedgerResult<u8> {
        self.read_gate().await?;
        Ok(self.decimals)
    }

    async fn balance_of(&self, owner: Address) -> LedgerResult<U256> {
        self.balance_reads.fetch_add(1, Ordering::SeqCst);
        self.read_gate().await?;
        Ok(self
            .state
            .lock()
            .balances
            .get(&owner)
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn allowance(&self, owner: Address, spender: Address) -> LedgerResult<U256> {
        self.allowance_reads.fetch_add(1, Ordering::SeqCst);
        self.read_gate().await?;
        Ok(self
            .state
            .lock()
            .allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn price(&self) -> LedgerResult<U256> {
        self.read_gate().await?;
        Ok(*self.price.lock())
    }

    async fn approve(&self, spender: Address, amount: U256) -> LedgerResult<TxHash> {
        self.approve_calls.fetch_add(1, Ordering::SeqCst);
        self.write(Effect::Approve {
            owner: self.owner(),
            spender,
            amount,
        })
        .await
    }

    async fn submit_query(&self, cost: U256, gas_limit: u64) -> LedgerResult<TxHash> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().last_query = Some((cost, gas_limit));
        self.write(Effect::Query {
            owner: self.owner(),
            spender: self.contracts.query_tool,
            cost,
        })
        .await
    }

    async fn deposit(&self, value: U256) -> LedgerResult<TxHash> {
        self.deposit_calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().last_deposit = Some(value);
        self.write(Effect::Deposit {
            owner: self.owner(),
            value,
        })
        .await
    }

    async fn receipt(&self, tx: TxHash) -> LedgerResult<Option<ReceiptStatus>> {
        self.read_gate().await?;
        let now = Instant::now();
        Ok(self
            .state
            .lock()
            .receipts
            .get(&tx)
            .filter(|mined| mined.at <= now)
            .map(|mined| mined.status))
    }
}
