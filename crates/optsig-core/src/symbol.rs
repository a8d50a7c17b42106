//! Canonical option symbols.
//!
//! Format: `{TICKER}{YYMMDD}{C|P}{strike*1000}.US`, for example
//! `AAPL260131C150000.US`. The strike suffix is a plain integer with no zero
//! padding.

use crate::error::CoreError;
use crate::expiry::{is_symbol_year, ExpiryDescriptor};
use crate::instruction::Instruction;
use crate::types::OptionType;
use crate::Strike;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::trace;

const MARKET_SUFFIX: &str = ".US";

/// Default hour (message local time) after which "this week" on a Friday
/// means the following Friday.
pub const DEFAULT_WEEKLY_CUTOFF_HOUR: u32 = 16;

/// Validated canonical symbol string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalSymbol(String);

/// Fields recovered from a canonical symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolParts {
    pub ticker: String,
    pub expiry: NaiveDate,
    pub option_type: OptionType,
    pub strike: Strike,
}

impl CanonicalSymbol {
    /// Build from already-resolved fields.
    ///
    /// Returns None for an empty ticker, a strike that cannot be encoded, or
    /// an expiry outside 2000-2099.
    pub fn from_parts(
        ticker: &str,
        expiry: NaiveDate,
        option_type: OptionType,
        strike: Strike,
    ) -> Option<Self> {
        let ticker = ticker.trim().to_ascii_uppercase();
        if ticker.is_empty() || !ticker.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        if !is_symbol_year(&expiry) {
            return None;
        }
        let code = strike.symbol_code()?;
        Some(Self(format!(
            "{}{}{}{}{}",
            ticker,
            expiry.format("%y%m%d"),
            option_type.code(),
            code,
            MARKET_SUFFIX
        )))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split back into ticker, expiry, type and strike.
    pub fn parts(&self) -> crate::Result<SymbolParts> {
        split_symbol(&self.0)
    }

    /// Ticker prefix of the symbol.
    pub fn ticker(&self) -> &str {
        let end = self
            .0
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

fn split_symbol(s: &str) -> Result<SymbolParts, CoreError> {
    let invalid = || CoreError::InvalidSymbol(s.to_string());

    let body = s.strip_suffix(MARKET_SUFFIX).ok_or_else(invalid)?;
    let ticker_end = body.find(|c: char| c.is_ascii_digit()).ok_or_else(invalid)?;
    let (ticker, rest) = body.split_at(ticker_end);
    if ticker.is_empty() || !ticker.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(invalid());
    }
    if rest.len() < 8 || !rest.is_char_boundary(6) {
        return Err(invalid());
    }
    let (date, rest) = rest.split_at(6);
    let expiry = NaiveDate::parse_from_str(&format!("20{date}"), "%Y%m%d").map_err(|_| invalid())?;

    let mut chars = rest.chars();
    let option_type = chars
        .next()
        .filter(|c| c.is_ascii_uppercase())
        .and_then(OptionType::from_code)
        .ok_or_else(invalid)?;
    let digits = chars.as_str();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let code: u64 = digits.parse().map_err(|_| invalid())?;

    Ok(SymbolParts {
        ticker: ticker.to_string(),
        expiry,
        option_type,
        strike: Strike::from_symbol_code(code),
    })
}

impl fmt::Display for CanonicalSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CanonicalSymbol {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        split_symbol(s)?;
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for CanonicalSymbol {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CanonicalSymbol> for String {
    fn from(value: CanonicalSymbol) -> Self {
        value.0
    }
}

/// Builds canonical symbols, dating partial and relative expiries against
/// the message time.
#[derive(Debug, Clone, Copy)]
pub struct SymbolComposer {
    weekly_cutoff_hour: u32,
}

impl SymbolComposer {
    pub fn new(weekly_cutoff_hour: u32) -> Self {
        Self { weekly_cutoff_hour }
    }

    pub fn weekly_cutoff_hour(&self) -> u32 {
        self.weekly_cutoff_hour
    }

    /// Compose a symbol, or None when any field is missing or the expiry
    /// cannot be dated.
    pub fn compose(
        &self,
        ticker: Option<&str>,
        option_type: Option<OptionType>,
        strike: Option<Strike>,
        expiry: Option<&ExpiryDescriptor>,
        as_of: Option<NaiveDateTime>,
    ) -> Option<CanonicalSymbol> {
        let ticker = ticker?;
        let option_type = option_type?;
        let strike = strike?;
        let date = expiry?.resolve(as_of, self.weekly_cutoff_hour)?;
        CanonicalSymbol::from_parts(ticker, date, option_type, strike)
    }

    /// Fill `canonical_symbol` on an instruction.
    ///
    /// An instruction that already has a symbol is returned unchanged.
    pub fn apply(&self, mut instruction: Instruction, as_of: Option<NaiveDateTime>) -> Instruction {
        if instruction.canonical_symbol.is_some() || !instruction.is_instrument_bearing() {
            return instruction;
        }
        let id = &instruction.identity;
        let symbol = self.compose(
            id.ticker.as_deref(),
            id.option_type,
            id.strike,
            id.expiry.as_ref(),
            as_of,
        );
        if let Some(symbol) = &symbol {
            trace!(symbol = %symbol, "Composed canonical symbol");
        }
        instruction.canonical_symbol = symbol;
        instruction
    }
}

impl Default for SymbolComposer {
    fn default() -> Self {
        Self::new(DEFAULT_WEEKLY_CUTOFF_HOUR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expiry::RelativeTerm;
    use crate::instruction::{Action, InstrumentIdentity};
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_compose_month_day() {
        let composer = SymbolComposer::default();
        let symbol = composer
            .compose(
                Some("aapl"),
                Some(OptionType::Call),
                Some(Strike::new(dec!(150))),
                Some(&ExpiryDescriptor::MonthDay { month: 1, day: 31 }),
                Some(at(2026, 1, 20, 10)),
            )
            .unwrap();
        assert_eq!(symbol.as_str(), "AAPL260131C150000.US");
    }

    #[test]
    fn test_compose_fractional_strike_unpadded() {
        let composer = SymbolComposer::default();
        let symbol = composer
            .compose(
                Some("F"),
                Some(OptionType::Put),
                Some(Strike::new(dec!(2.5))),
                Some(&"260320".parse().unwrap()),
                None,
            )
            .unwrap();
        assert_eq!(symbol.as_str(), "F260320P2500.US");
    }

    #[test]
    fn test_compose_relative_this_week() {
        let composer = SymbolComposer::default();
        // 2026-01-21 is a Wednesday.
        let symbol = composer
            .compose(
                Some("GILD"),
                Some(OptionType::Call),
                Some(Strike::new(dec!(130))),
                Some(&ExpiryDescriptor::relative(RelativeTerm::ThisWeek)),
                Some(at(2026, 1, 21, 10)),
            )
            .unwrap();
        assert_eq!(symbol.as_str(), "GILD260123C130000.US");
    }

    #[test]
    fn test_compose_missing_fields_is_none() {
        let composer = SymbolComposer::default();
        let expiry = ExpiryDescriptor::MonthDay { month: 1, day: 31 };
        let as_of = Some(at(2026, 1, 20, 10));
        assert!(composer
            .compose(None, Some(OptionType::Call), Some(Strike::new(dec!(1))), Some(&expiry), as_of)
            .is_none());
        assert!(composer
            .compose(Some("A"), None, Some(Strike::new(dec!(1))), Some(&expiry), as_of)
            .is_none());
        assert!(composer
            .compose(Some("A"), Some(OptionType::Call), None, Some(&expiry), as_of)
            .is_none());
        assert!(composer
            .compose(Some("A"), Some(OptionType::Call), Some(Strike::new(dec!(1))), None, as_of)
            .is_none());
        // Partial date with no as-of time cannot be dated.
        assert!(composer
            .compose(Some("A"), Some(OptionType::Call), Some(Strike::new(dec!(1))), Some(&expiry), None)
            .is_none());
    }

    #[test]
    fn test_compose_rejects_dates_outside_two_digit_years() {
        let composer = SymbolComposer::default();
        let old = ExpiryDescriptor::Absolute(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap());
        assert!(composer
            .compose(Some("SPY"), Some(OptionType::Put), Some(Strike::new(dec!(400))), Some(&old), None)
            .is_none());
        assert!(CanonicalSymbol::from_parts(
            "SPY",
            NaiveDate::from_ymd_opt(2100, 1, 15).unwrap(),
            OptionType::Put,
            Strike::new(dec!(400)),
        )
        .is_none());
    }

    #[test]
    fn test_compose_then_parse_recovers_fields() {
        let composer = SymbolComposer::default();
        let symbol = composer
            .compose(
                Some("QQQ"),
                Some(OptionType::Put),
                Some(Strike::new(dec!(609.5))),
                Some(&ExpiryDescriptor::MonthDay { month: 11, day: 20 }),
                Some(at(2025, 11, 18, 9)),
            )
            .unwrap();
        let parts = symbol.parts().unwrap();
        assert_eq!(parts.ticker, "QQQ");
        assert_eq!(parts.option_type, OptionType::Put);
        assert_eq!(parts.strike, Strike::new(dec!(609.5)));
        assert_eq!(parts.expiry, NaiveDate::from_ymd_opt(2025, 11, 20).unwrap());
        assert_eq!(symbol.ticker(), "QQQ");

        let again = composer
            .compose(
                Some(&parts.ticker),
                Some(parts.option_type),
                Some(parts.strike),
                Some(&ExpiryDescriptor::Absolute(parts.expiry)),
                None,
            )
            .unwrap();
        assert_eq!(again, symbol);
    }

    #[test]
    fn test_apply_is_passthrough_for_existing_symbol() {
        let composer = SymbolComposer::default();
        let existing: CanonicalSymbol = "TSLA260209C440000.US".parse().unwrap();
        let mut instr = Instruction::new("x", Action::Close { scope: Default::default() })
            .with_identity(InstrumentIdentity {
                ticker: Some("TSLA".to_string()),
                option_type: Some(OptionType::Call),
                strike: Some(Strike::new(dec!(999))),
                expiry: Some(ExpiryDescriptor::MonthDay { month: 3, day: 1 }),
            });
        instr.canonical_symbol = Some(existing.clone());
        let out = composer.apply(instr.clone(), Some(at(2026, 2, 5, 10)));
        assert_eq!(out, instr);
        let twice = composer.apply(out, Some(at(2026, 2, 5, 10)));
        assert_eq!(twice.canonical_symbol, Some(existing));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("TSLA260209C440000".parse::<CanonicalSymbol>().is_err());
        assert!("260209C440000.US".parse::<CanonicalSymbol>().is_err());
        assert!("TSLA260209X440000.US".parse::<CanonicalSymbol>().is_err());
        assert!("TSLA261309C440000.US".parse::<CanonicalSymbol>().is_err());
        assert!("TSLA260209C.US".parse::<CanonicalSymbol>().is_err());
        assert!("tsla260209C440000.US".parse::<CanonicalSymbol>().is_err());
    }
}
