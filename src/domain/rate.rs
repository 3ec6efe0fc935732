//! Oracle conversion rate from base currency to metered tokens.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::Serialize;

use super::amount::{pow10, to_raw};

/// Scale exponent of the oracle's fixed-point price.
pub const PRICE_SCALE_DECIMALS: u8 = 8;

/// Where the current rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    Oracle,
    Fallback,
}

/// Tokens minted per whole unit of base currency, as a scaled integer.
///
/// `tokens_per_base = scaled / 10^scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConversionRate {
    scaled: U256,
    scale: u8,
    source: RateSource,
}

impl ConversionRate {
    /// Rate read from the oracle. A zero price is treated as no reading.
    #[must_use]
    pub fn from_oracle(scaled: U256, scale: u8) -> Option<Self> {
        if scaled.is_zero() {
            return None;
        }
        Some(Self {
            scaled,
            scale,
            source: RateSource::Oracle,
        })
    }

    /// Fixed rate used until the first successful oracle read.
    #[must_use]
    pub fn fallback(tokens_per_base: Decimal) -> Self {
        let scaled = to_raw(tokens_per_base, PRICE_SCALE_DECIMALS).unwrap_or(U256::ZERO);
        Self {
            scaled,
            scale: PRICE_SCALE_DECIMALS,
            source: RateSource::Fallback,
        }
    }

    #[must_use]
    pub const fn scaled(&self) -> U256 {
        self.scaled
    }

    #[must_use]
    pub const fn scale(&self) -> u8 {
        self.scale
    }

    #[must_use]
    pub const fn source(&self) -> RateSource {
        self.source
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.source == RateSource::Fallback
    }

    /// Tokens per base unit as a decimal, for display.
    #[must_use]
    pub fn tokens_per_base(&self) -> Decimal {
        let text = super::amount::to_display(self.scaled, self.scale);
        text.parse().unwrap_or(Decimal::ZERO)
    }

    /// Convert a raw base amount into raw token units.
    ///
    /// `base_raw * scaled * 10^token_decimals / (10^scale * 10^base_decimals)`,
    /// truncated. Saturates rather than overflowing.
    #[must_use]
    pub fn apply(&self, base_raw: U256, base_decimals: u8, token_decimals: u8) -> U256 {
        let numerator = base_raw
            .saturating_mul(self.scaled)
            .saturating_mul(pow10(token_decimals));
        let denominator = pow10(self.scale).saturating_mul(pow10(base_decimals));
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn zero_oracle_price_is_not_a_rate() {
        assert!(ConversionRate::from_oracle(U256::ZERO, 8).is_none());
    }

    #[test]
    fn fallback_scales_to_price_decimals() {
        let rate = ConversionRate::fallback(dec!(1800));
        assert!(rate.is_fallback());
        assert_eq!(rate.scaled(), U256::from(180_000_000_000u64));
        assert_eq!(rate.tokens_per_base(), dec!(1800));
    }

    #[test]
    fn apply_converts_between_decimals() {
        // 2000.00000000 tokens per base unit
        let rate = ConversionRate::from_oracle(U256::from(200_000_000_000u64), 8).unwrap();
        // 0.02 base at 18 decimals
        let base = to_raw(dec!(0.02), 18).unwrap();
        let tokens = rate.apply(base, 18, 18);
        assert_eq!(tokens, to_raw(dec!(40), 18).unwrap());
    }

    #[test]
    fn apply_truncates_fractional_raw() {
        let rate = ConversionRate::from_oracle(U256::from(150_000_000u64), 8).unwrap();
        // 3 raw base units * 1.5 = 4.5 raw tokens, truncated to 4
        assert_eq!(rate.apply(U256::from(3u64), 0, 0), U256::from(4u64));
    }
}
