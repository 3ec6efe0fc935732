//! Tunables for the gate services.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use super::monitor::Backoff;
use crate::domain::rate::PRICE_SCALE_DECIMALS;

/// Receipt polling and stuck-transaction handling.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// First delay between receipt reads in milliseconds.
    #[serde(default = "default_poll_initial_ms")]
    pub poll_initial_ms: u64,
    /// Upper bound on the delay between receipt reads in milliseconds.
    #[serde(default = "default_poll_max_ms")]
    pub poll_max_ms: u64,
    /// Growth factor applied after each empty read.
    #[serde(default = "default_poll_multiplier")]
    pub poll_multiplier: f64,
    /// Random extra delay as a fraction of the base delay (0.0 to 1.0).
    #[serde(default = "default_jitter")]
    pub jitter: f64,
    /// Seconds without a receipt before the local slot is forced idle.
    #[serde(default = "default_stuck_ceiling_secs")]
    pub stuck_ceiling_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_initial_ms: default_poll_initial_ms(),
            poll_max_ms: default_poll_max_ms(),
            poll_multiplier: default_poll_multiplier(),
            jitter: default_jitter(),
            stuck_ceiling_secs: default_stuck_ceiling_secs(),
        }
    }
}

impl MonitorConfig {
    #[must_use]
    pub fn receipt_backoff(&self) -> Backoff {
        Backoff {
            initial: Duration::from_millis(self.poll_initial_ms),
            max: Duration::from_millis(self.poll_max_ms),
            multiplier: self.poll_multiplier,
            jitter: self.jitter,
            max_attempts: u32::MAX,
        }
    }

    #[must_use]
    pub const fn stuck_ceiling(&self) -> Duration {
        Duration::from_secs(self.stuck_ceiling_secs)
    }
}

/// Allowance read-model settling after an approval.
#[derive(Debug, Clone, Deserialize)]
pub struct AllowanceConfig {
    /// Delays after a confirmed approval at which the allowance is re-read.
    #[serde(default = "default_follow_up_delays_ms")]
    pub follow_up_delays_ms: Vec<u64>,
    #[serde(default = "default_settle_initial_ms")]
    pub settle_initial_ms: u64,
    #[serde(default = "default_settle_max_ms")]
    pub settle_max_ms: u64,
    /// Forced reads attempted while waiting for an approval to show up.
    #[serde(default = "default_settle_attempts")]
    pub settle_attempts: u32,
    /// Pause before the single re-check of a stale allowance at submission.
    #[serde(default = "default_stale_retry_delay_ms")]
    pub stale_retry_delay_ms: u64,
}

impl Default for AllowanceConfig {
    fn default() -> Self {
        Self {
            follow_up_delays_ms: default_follow_up_delays_ms(),
            settle_initial_ms: default_settle_initial_ms(),
            settle_max_ms: default_settle_max_ms(),
            settle_attempts: default_settle_attempts(),
            stale_retry_delay_ms: default_stale_retry_delay_ms(),
        }
    }
}

impl AllowanceConfig {
    #[must_use]
    pub fn settle_backoff(&self) -> Backoff {
        Backoff {
            initial: Duration::from_millis(self.settle_initial_ms),
            max: Duration::from_millis(self.settle_max_ms),
            multiplier: 2.0,
            jitter: 0.0,
            max_attempts: self.settle_attempts,
        }
    }

    #[must_use]
    pub fn follow_up_delays(&self) -> Vec<Duration> {
        self.follow_up_delays_ms
            .iter()
            .copied()
            .map(Duration::from_millis)
            .collect()
    }

    #[must_use]
    pub const fn stale_retry_delay(&self) -> Duration {
        Duration::from_millis(self.stale_retry_delay_ms)
    }
}

/// Deposit quoting and minimums.
#[derive(Debug, Clone, Deserialize)]
pub struct DepositConfig {
    /// Recommended minimum deposit in base currency. Smaller deposits warn.
    #[serde(default = "default_min_deposit")]
    pub min_deposit: Decimal,
    /// Tokens per base unit used until the oracle has been read.
    #[serde(default = "default_fallback_rate")]
    pub fallback_rate: Decimal,
    /// Scale exponent of the oracle price.
    #[serde(default = "default_price_scale")]
    pub price_scale: u8,
}

impl Default for DepositConfig {
    fn default() -> Self {
        Self {
            min_deposit: default_min_deposit(),
            fallback_rate: default_fallback_rate(),
            price_scale: default_price_scale(),
        }
    }
}

/// Metered query submission.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    /// Gas ceiling attached to every query transaction.
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    /// Settled results kept for late confirmation signals.
    #[serde(default = "default_retained_completions")]
    pub retained_completions: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            gas_limit: default_gas_limit(),
            retained_completions: default_retained_completions(),
        }
    }
}

const fn default_poll_initial_ms() -> u64 {
    500
}

const fn default_poll_max_ms() -> u64 {
    4_000
}

const fn default_poll_multiplier() -> f64 {
    2.0
}

const fn default_jitter() -> f64 {
    0.2
}

const fn default_stuck_ceiling_secs() -> u64 {
    15
}

fn default_follow_up_delays_ms() -> Vec<u64> {
    vec![1_000, 4_000]
}

const fn default_settle_initial_ms() -> u64 {
    250
}

const fn default_settle_max_ms() -> u64 {
    2_000
}

const fn default_settle_attempts() -> u32 {
    6
}

const fn default_stale_retry_delay_ms() -> u64 {
    1_000
}

fn default_min_deposit() -> Decimal {
    dec!(0.01)
}

fn default_fallback_rate() -> Decimal {
    dec!(1800)
}

const fn default_price_scale() -> u8 {
    PRICE_SCALE_DECIMALS
}

const fn default_gas_limit() -> u64 {
    500_000
}

const fn default_retained_completions() -> usize {
    64
}
