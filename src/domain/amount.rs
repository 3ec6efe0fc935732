//! Conversion between human decimal amounts and raw fixed-point integers.
//!
//! Raw amounts are `U256` values in a token's smallest unit. Conversion into
//! raw space is exact: it works on the decimal mantissa and scale and
//! truncates anything finer than `decimals`. Conversion back to text is
//! lossy, keeping at most [`DISPLAY_FRACTION_DIGITS`] fractional digits, so
//! `to_raw(to_display(raw))` does not round-trip in general.
//!
//! # Examples
//!
//! ```
//! use paygate::domain::amount::{to_display, to_raw};
//! use rust_decimal_macros::dec;
//!
//! let raw = to_raw(dec!(1.5), 18).unwrap();
//! assert_eq!(raw.to_string(), "1500000000000000000");
//! assert_eq!(to_display(raw, 18), "1.5");
//! ```

use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{GateError, GateResult};

/// Maximum fractional digits rendered by [`to_display`].
pub const DISPLAY_FRACTION_DIGITS: usize = 6;

/// Decimals of the native base currency attached to deposits.
pub const NATIVE_DECIMALS: u8 = 18;

/// Decimals assumed before token metadata has been read.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

/// Largest decimals exponent accepted from a token contract.
pub const MAX_DECIMALS: u8 = 36;

/// `10^exp` in raw space.
#[must_use]
pub fn pow10(exp: u8) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

/// Convert a decimal amount to raw units, truncating below `decimals`.
///
/// # Errors
///
/// Returns [`GateError::InvalidAmount`] for negative amounts or when the
/// result does not fit in 256 bits.
pub fn to_raw(amount: Decimal, decimals: u8) -> GateResult<U256> {
    if amount < Decimal::ZERO {
        return Err(GateError::InvalidAmount {
            reason: format!("{amount} is negative"),
        });
    }

    let mantissa = U256::from(amount.mantissa().unsigned_abs());
    let scale = amount.scale();
    let decimals_u32 = u32::from(decimals);

    if decimals_u32 >= scale {
        // scale is at most 28, so the difference fits in u8
        let shift = (decimals_u32 - scale) as u8;
        mantissa
            .checked_mul(pow10(shift))
            .ok_or_else(|| GateError::InvalidAmount {
                reason: format!("{amount} overflows at {decimals} decimals"),
            })
    } else {
        let shift = (scale - decimals_u32) as u8;
        Ok(mantissa / pow10(shift))
    }
}

/// Convert a floating-point amount to raw units.
///
/// # Errors
///
/// Returns [`GateError::InvalidAmount`] for NaN, infinite or negative input.
pub fn to_raw_f64(amount: f64, decimals: u8) -> GateResult<U256> {
    if !amount.is_finite() {
        return Err(GateError::InvalidAmount {
            reason: format!("{amount} is not a finite number"),
        });
    }
    let amount = Decimal::try_from(amount).map_err(|e| GateError::InvalidAmount {
        reason: e.to_string(),
    })?;
    to_raw(amount, decimals)
}

/// Parse user-entered text into a non-negative decimal amount.
///
/// # Errors
///
/// Returns [`GateError::InvalidAmount`] if the text is not a number or is
/// negative.
pub fn parse_amount(text: &str) -> GateResult<Decimal> {
    let amount = Decimal::from_str(text.trim()).map_err(|_| GateError::InvalidAmount {
        reason: format!("'{}' is not a decimal number", text.trim()),
    })?;
    if amount < Decimal::ZERO {
        return Err(GateError::InvalidAmount {
            reason: format!("{amount} is negative"),
        });
    }
    Ok(amount)
}

/// Render a raw amount as trimmed decimal text.
///
/// Keeps at most six fractional digits (truncated, not rounded) and strips
/// trailing zeros. Whole numbers render without a decimal point.
#[must_use]
pub fn to_display(raw: U256, decimals: u8) -> String {
    let divisor = pow10(decimals);
    let whole = raw / divisor;
    let frac = raw % divisor;

    let digits = usize::from(decimals).min(DISPLAY_FRACTION_DIGITS);
    if digits == 0 || frac.is_zero() {
        return whole.to_string();
    }

    let padded = format!("{:0>width$}", frac.to_string(), width = usize::from(decimals));
    let kept = padded[..digits].trim_end_matches('0');
    if kept.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{kept}")
    }
}

/// A token quantity in raw units paired with its decimals exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TokenAmount {
    raw: U256,
    decimals: u8,
}

impl TokenAmount {
    #[must_use]
    pub const fn new(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    #[must_use]
    pub const fn zero(decimals: u8) -> Self {
        Self::new(U256::ZERO, decimals)
    }

    /// Build from a human decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidAmount`] for negative amounts.
    pub fn from_decimal(amount: Decimal, decimals: u8) -> GateResult<Self> {
        Ok(Self::new(to_raw(amount, decimals)?, decimals))
    }

    #[must_use]
    pub const fn raw(&self) -> U256 {
        self.raw
    }

    #[must_use]
    pub const fn decimals(&self) -> u8 {
        self.decimals
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    /// Whether this amount is at least `required` raw units.
    #[must_use]
    pub fn covers(&self, required: U256) -> bool {
        self.raw >= required
    }

    #[must_use]
    pub fn display(&self) -> String {
        to_display(self.raw, self.decimals)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn raw(s: &str) -> U256 {
        U256::from_str_radix(s, 10).unwrap()
    }

    // -------------------------------------------------------------------------
    // to_raw
    // -------------------------------------------------------------------------

    #[test]
    fn to_raw_scales_whole_amounts() {
        assert_eq!(to_raw(dec!(5), 18).unwrap(), raw("5000000000000000000"));
        assert_eq!(to_raw(dec!(1), 6).unwrap(), U256::from(1_000_000u64));
    }

    #[test]
    fn to_raw_truncates_below_decimals() {
        // 1.1234567 at 6 decimals keeps 1.123456
        assert_eq!(to_raw(dec!(1.1234567), 6).unwrap(), U256::from(1_123_456u64));
        assert_eq!(to_raw(dec!(0.0000009), 6).unwrap(), U256::ZERO);
    }

    #[test]
    fn to_raw_matches_floor_of_scaled_amount() {
        let cases = [
            (dec!(0.02), 18u8),
            (dec!(123.456789), 6),
            (dec!(0.999999999), 8),
            (dec!(42), 0),
            (dec!(7.5), 1),
        ];
        for (amount, decimals) in cases {
            let scaled = (amount * Decimal::from(10u64.pow(u32::from(decimals)))).floor();
            let expected = raw(&scaled.to_string());
            assert_eq!(to_raw(amount, decimals).unwrap(), expected, "{amount} @ {decimals}");
        }
    }

    #[test]
    fn to_raw_handles_zero() {
        assert_eq!(to_raw(dec!(0), 18).unwrap(), U256::ZERO);
        assert_eq!(to_raw(dec!(0.000), 18).unwrap(), U256::ZERO);
    }

    #[test]
    fn to_raw_rejects_negative() {
        let err = to_raw(dec!(-0.5), 18).unwrap_err();
        assert!(matches!(err, GateError::InvalidAmount { .. }));
    }

    #[test]
    fn to_raw_f64_rejects_non_finite() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -1.0] {
            assert!(
                matches!(to_raw_f64(value, 18), Err(GateError::InvalidAmount { .. })),
                "{value}"
            );
        }
        assert_eq!(to_raw_f64(0.25, 2).unwrap(), U256::from(25u64));
    }

    // -------------------------------------------------------------------------
    // parse_amount
    // -------------------------------------------------------------------------

    #[test]
    fn parse_amount_accepts_trimmed_decimal() {
        assert_eq!(parse_amount(" 0.05 ").unwrap(), dec!(0.05));
    }

    #[test]
    fn parse_amount_rejects_garbage_and_negative() {
        assert!(parse_amount("NaN").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("-3").is_err());
    }

    // -------------------------------------------------------------------------
    // to_display
    // -------------------------------------------------------------------------

    #[test]
    fn to_display_renders_whole_numbers_without_point() {
        assert_eq!(to_display(raw("36000000000000000000"), 18), "36");
        assert_eq!(to_display(U256::ZERO, 18), "0");
        assert_eq!(to_display(U256::from(42u64), 0), "42");
    }

    #[test]
    fn to_display_strips_trailing_zeros() {
        assert_eq!(to_display(raw("1500000000000000000"), 18), "1.5");
        assert_eq!(to_display(U256::from(500_000u64), 6), "0.5");
    }

    #[test]
    fn to_display_truncates_to_six_digits() {
        // 1.23456789 tokens
        assert_eq!(to_display(raw("1234567890000000000"), 18), "1.234567");
        // dust below the sixth digit renders as a whole number
        assert_eq!(to_display(raw("2000000000001"), 12), "2");
    }

    #[test]
    fn display_is_lossy_so_round_trip_is_not_guaranteed() {
        let original = raw("1234567890000000000");
        let shown = to_display(original, 18);
        let back = to_raw(Decimal::from_str(&shown).unwrap(), 18).unwrap();
        assert_ne!(back, original);
        assert!(back < original);
    }

    // -------------------------------------------------------------------------
    // TokenAmount
    // -------------------------------------------------------------------------

    #[test]
    fn token_amount_covers_compares_raw() {
        let three = TokenAmount::from_decimal(dec!(3), 18).unwrap();
        assert!(!three.covers(to_raw(dec!(5), 18).unwrap()));
        assert!(three.covers(to_raw(dec!(3), 18).unwrap()));
        assert_eq!(three.to_string(), "3");
    }
}
