//! Deposit-to-token conversion estimates from the price oracle.

use std::sync::Arc;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::context::GateContext;
use crate::domain::amount::{to_raw, TokenAmount, NATIVE_DECIMALS};
use crate::domain::rate::ConversionRate;

pub struct ConversionEstimator {
    context: Arc<GateContext>,
    price_scale: u8,
    rate: RwLock<ConversionRate>,
}

impl ConversionEstimator {
    /// Start with `fallback` tokens per base unit until the oracle is read.
    #[must_use]
    pub fn new(context: Arc<GateContext>, fallback: Decimal, price_scale: u8) -> Self {
        Self {
            context,
            price_scale,
            rate: RwLock::new(ConversionRate::fallback(fallback)),
        }
    }

    /// Read the oracle price. Keeps the previous rate on failure.
    pub async fn refresh_rate(&self) -> ConversionRate {
        match self.context.ledger().price().await {
            Ok(scaled) => match ConversionRate::from_oracle(scaled, self.price_scale) {
                Some(rate) => {
                    *self.rate.write() = rate;
                    debug!(tokens_per_base = %rate.tokens_per_base(), "Conversion rate refreshed");
                }
                None => warn!("Oracle returned a zero price, keeping previous rate"),
            },
            Err(e) => warn!(error = %e, "Price read failed, keeping previous rate"),
        }
        self.rate()
    }

    #[must_use]
    pub fn rate(&self) -> ConversionRate {
        *self.rate.read()
    }

    /// Estimated tokens minted for `base` units of base currency.
    ///
    /// Non-positive input estimates zero. The estimate is advisory; the
    /// balance read after confirmation is authoritative.
    #[must_use]
    pub fn estimate(&self, base: Decimal) -> TokenAmount {
        let decimals = self.context.decimals();
        if base <= Decimal::ZERO {
            return TokenAmount::zero(decimals);
        }
        let Ok(base_raw) = to_raw(base, NATIVE_DECIMALS) else {
            return TokenAmount::zero(decimals);
        };
        let raw = self.rate().apply(base_raw, NATIVE_DECIMALS, decimals);
        TokenAmount::new(raw, decimals)
    }
}
