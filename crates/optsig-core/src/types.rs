//! Small value types shared by instructions.
//!
//! Contains the option right, quoted prices (single or range) and sell
//! quantities.

use crate::error::CoreError;
use crate::Price;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Option right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Single-letter code used in canonical symbols.
    pub fn code(&self) -> char {
        match self {
            Self::Call => 'C',
            Self::Put => 'P',
        }
    }

    pub fn from_code(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'C' => Some(Self::Call),
            'P' => Some(Self::Put),
            _ => None,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

impl FromStr for OptionType {
    type Err = CoreError;

    /// Accepts `c`, `call`, `calls`, `p`, `put`, `puts` in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "call" | "calls" => Ok(Self::Call),
            "p" | "put" | "puts" => Ok(Self::Put),
            other => Err(CoreError::InvalidSymbol(format!("unknown option type: {other}"))),
        }
    }
}

/// Inclusive price range, always stored with `low <= high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub low: Price,
    pub high: Price,
}

impl PriceRange {
    /// Create a range, ordering the bounds.
    pub fn new(a: Price, b: Price) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

/// A quoted price: either one value or a range.
///
/// A range is never collapsed to its midpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceQuote {
    Range(PriceRange),
    Single(Price),
}

impl PriceQuote {
    pub fn single(value: Decimal) -> Self {
        Self::Single(Price::new(value))
    }

    pub fn range(a: Decimal, b: Decimal) -> Self {
        Self::Range(PriceRange::new(Price::new(a), Price::new(b)))
    }

    pub fn as_single(&self) -> Option<Price> {
        match self {
            Self::Single(p) => Some(*p),
            Self::Range(_) => None,
        }
    }

    pub fn as_range(&self) -> Option<PriceRange> {
        match self {
            Self::Range(r) => Some(*r),
            Self::Single(_) => None,
        }
    }
}

impl fmt::Display for PriceQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(p) => write!(f, "{p}"),
            Self::Range(r) => write!(f, "{r}"),
        }
    }
}

/// How much of a position a Sell reduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SellQuantity {
    /// Absolute number of contracts.
    Count { count: u32 },
    /// Portion of the position, e.g. 1/3.
    Fraction { numerator: u32, denominator: u32 },
    /// Percent of the position, e.g. 50.
    Percent { percent: Decimal },
}

impl SellQuantity {
    pub fn fraction(numerator: u32, denominator: u32) -> Self {
        Self::Fraction {
            numerator,
            denominator,
        }
    }
}

impl fmt::Display for SellQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count { count } => write!(f, "{count}"),
            Self::Fraction {
                numerator,
                denominator,
            } => write!(f, "{numerator}/{denominator}"),
            Self::Percent { percent } => write!(f, "{}%", percent.normalize()),
        }
    }
}
