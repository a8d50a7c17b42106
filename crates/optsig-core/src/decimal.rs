//! Precision-safe decimal types for option signals.
//!
//! Uses `rust_decimal` for exact decimal arithmetic so that a strike of
//! `2.5` always composes to `2500` and a quoted premium of `0.85` is never
//! rounded through a float.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Option premium quoted in a message.
///
/// Wraps `Decimal` to keep premiums apart from strikes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(parse_loose_decimal(s)?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// Contract strike price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Strike(pub Decimal);

impl Strike {
    /// Multiplier used by the canonical symbol's strike suffix.
    const SYMBOL_SCALE: i64 = 1000;

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    /// Strike scaled by 1000 and truncated, as used in canonical symbols.
    ///
    /// Returns None if the scaled value does not fit in a `u64`.
    pub fn symbol_code(&self) -> Option<u64> {
        use rust_decimal::prelude::ToPrimitive;
        (self.0 * Decimal::from(Self::SYMBOL_SCALE)).trunc().to_u64()
    }

    /// Inverse of [`Strike::symbol_code`].
    pub fn from_symbol_code(code: u64) -> Self {
        Self((Decimal::from(code) / Decimal::from(Self::SYMBOL_SCALE)).normalize())
    }
}

impl fmt::Display for Strike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Strike {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(parse_loose_decimal(s)?))
    }
}

impl From<Decimal> for Strike {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// Parse a decimal written with any of the separators seen in chat text.
///
/// Accepts `.`, the full-width stop `。`, the full-width period `．` and `,`
/// as the decimal separator. A leading `$` is ignored.
pub fn parse_loose_decimal(s: &str) -> Result<Decimal, rust_decimal::Error> {
    let cleaned: String = s
        .trim()
        .trim_start_matches('$')
        .chars()
        .map(|c| match c {
            '。' | '．' | ',' => '.',
            other => other,
        })
        .collect();
    Decimal::from_str(&cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_loose_decimal_separators() {
        assert_eq!(parse_loose_decimal("15。03").unwrap(), dec!(15.03));
        assert_eq!(parse_loose_decimal("1．5").unwrap(), dec!(1.5));
        assert_eq!(parse_loose_decimal("0,85").unwrap(), dec!(0.85));
        assert_eq!(parse_loose_decimal("$2.5").unwrap(), dec!(2.5));
        assert!(parse_loose_decimal("abc").is_err());
    }

    #[test]
    fn test_strike_symbol_code() {
        assert_eq!(Strike::new(dec!(150)).symbol_code(), Some(150000));
        assert_eq!(Strike::new(dec!(2.5)).symbol_code(), Some(2500));
        // Sub-thousandth strikes are truncated, not rounded.
        assert_eq!(Strike::new(dec!(7.0009)).symbol_code(), Some(7000));
        assert_eq!(Strike::new(dec!(-1)).symbol_code(), None);
    }

    #[test]
    fn test_strike_code_roundtrip() {
        let strike = Strike::new(dec!(612.5));
        let code = strike.symbol_code().unwrap();
        assert_eq!(Strike::from_symbol_code(code), strike);
    }

    #[test]
    fn test_price_display_normalizes() {
        assert_eq!(Price::new(dec!(1.50)).to_string(), "1.5");
        assert_eq!(Strike::new(dec!(440.0)).to_string(), "440");
    }
}
