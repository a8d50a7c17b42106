//! Structured trading instructions.
//!
//! An [`Instruction`] is created by the classifier, has its identity filled
//! at most once by context resolution, and its symbol filled at most once by
//! the composer.

use crate::expiry::ExpiryDescriptor;
use crate::symbol::CanonicalSymbol;
use crate::types::{OptionType, PriceQuote, SellQuantity};
use crate::Strike;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a Close applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseScope {
    /// The remainder of one instrument.
    #[default]
    Position,
    /// Every open position; carries no instrument.
    AllPositions,
}

/// Action variant with its variant-specific fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Buy {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position_size: Option<String>,
    },
    Sell {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quantity: Option<SellQuantity>,
    },
    Close {
        #[serde(default)]
        scope: CloseScope,
    },
    Modify {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stop_loss: Option<PriceQuote>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        take_profit: Option<PriceQuote>,
    },
    Unclassified,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Buy { .. } => "BUY",
            Self::Sell { .. } => "SELL",
            Self::Close { .. } => "CLOSE",
            Self::Modify { .. } => "MODIFY",
            Self::Unclassified => "UNCLASSIFIED",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The four fields that identify an option contract.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstrumentIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_type: Option<OptionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strike: Option<Strike>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<ExpiryDescriptor>,
}

impl InstrumentIdentity {
    pub fn is_complete(&self) -> bool {
        self.ticker.is_some()
            && self.option_type.is_some()
            && self.strike.is_some()
            && self.expiry.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.ticker.is_none()
            && self.option_type.is_none()
            && self.strike.is_none()
            && self.expiry.is_none()
    }

    /// A ticker and nothing else.
    pub fn is_bare_ticker(&self) -> bool {
        self.ticker.is_some()
            && self.option_type.is_none()
            && self.strike.is_none()
            && self.expiry.is_none()
    }

    /// Case-insensitive ticker comparison; false when either side lacks one.
    pub fn same_ticker(&self, other: &InstrumentIdentity) -> bool {
        match (&self.ticker, &other.ticker) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }

    /// Fill every missing field from `donor`. Present fields are kept.
    pub fn fill_missing_from(&mut self, donor: &InstrumentIdentity) {
        if self.ticker.is_none() {
            self.ticker = donor.ticker.clone();
        }
        if self.option_type.is_none() {
            self.option_type = donor.option_type;
        }
        if self.strike.is_none() {
            self.strike = donor.strike;
        }
        if self.expiry.is_none() {
            self.expiry = donor.expiry.clone();
        }
    }
}

/// Where a missing identity was borrowed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionSource {
    /// Earlier message in the same thread.
    History,
    /// The quoted message.
    Refer,
    /// Recent messages regardless of thread.
    Recent,
    /// Open positions store.
    Positions,
}

impl CompletionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::History => "history",
            Self::Refer => "refer",
            Self::Recent => "recent",
            Self::Positions => "positions",
        }
    }
}

impl fmt::Display for CompletionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of a borrowed identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub source: CompletionSource,
    /// Raw text of the donor message, if it had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donor_text: Option<String>,
    /// More than one open position matched; the first was taken.
    #[serde(default)]
    pub ambiguous: bool,
}

/// How the ticker got onto an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickerOrigin {
    /// Captured by a shape match.
    Shape,
    /// Guessed from an isolated uppercase token.
    Sniffed,
}

/// A structured trading instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub raw_text: String,
    #[serde(flatten)]
    pub action: Action,
    #[serde(flatten)]
    pub identity: InstrumentIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<PriceQuote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_symbol: Option<CanonicalSymbol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<Completion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker_origin: Option<TickerOrigin>,
}

impl Instruction {
    pub fn new(raw_text: impl Into<String>, action: Action) -> Self {
        Self {
            raw_text: raw_text.into(),
            action,
            identity: InstrumentIdentity::default(),
            price: None,
            canonical_symbol: None,
            completion: None,
            ticker_origin: None,
        }
    }

    /// Not actionable; carries no instrument fields.
    pub fn unclassified(raw_text: impl Into<String>) -> Self {
        Self::new(raw_text, Action::Unclassified)
    }

    pub fn with_identity(mut self, identity: InstrumentIdentity) -> Self {
        if identity.ticker.is_some() && self.ticker_origin.is_none() {
            self.ticker_origin = Some(TickerOrigin::Shape);
        }
        self.identity = identity;
        self
    }

    pub fn with_price(mut self, price: Option<PriceQuote>) -> Self {
        self.price = price;
        self
    }

    #[inline]
    pub fn ticker(&self) -> Option<&str> {
        self.identity.ticker.as_deref()
    }

    #[inline]
    pub fn is_buy(&self) -> bool {
        matches!(self.action, Action::Buy { .. })
    }

    #[inline]
    pub fn is_unclassified(&self) -> bool {
        matches!(self.action, Action::Unclassified)
    }

    /// Whether this variant refers to a single instrument.
    pub fn is_instrument_bearing(&self) -> bool {
        match &self.action {
            Action::Buy { .. } | Action::Sell { .. } | Action::Modify { .. } => true,
            Action::Close { scope } => *scope == CloseScope::Position,
            Action::Unclassified => false,
        }
    }

    /// Symbol set, or all four identity fields set on an instrument-bearing
    /// variant.
    pub fn is_complete(&self) -> bool {
        self.canonical_symbol.is_some()
            || (self.is_instrument_bearing() && self.identity.is_complete())
    }

    /// Whether context resolution should try to complete this instruction.
    pub fn needs_completion(&self) -> bool {
        self.is_instrument_bearing() && !self.is_buy() && !self.is_complete()
    }

    pub fn source_of_completion(&self) -> Option<CompletionSource> {
        self.completion.as_ref().map(|c| c.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tsla_identity() -> InstrumentIdentity {
        InstrumentIdentity {
            ticker: Some("TSLA".to_string()),
            option_type: Some(OptionType::Call),
            strike: Some(Strike::new(dec!(440))),
            expiry: Some(ExpiryDescriptor::MonthDay { month: 2, day: 9 }),
        }
    }

    #[test]
    fn test_completeness_rules() {
        let buy = Instruction::new("TSLA 440c 2/9 3.1", Action::Buy { position_size: None })
            .with_identity(tsla_identity());
        assert!(buy.is_complete());
        assert!(!buy.needs_completion());

        let modify = Instruction::new(
            "止损在2.9",
            Action::Modify {
                stop_loss: Some(PriceQuote::single(dec!(2.9))),
                take_profit: None,
            },
        );
        assert!(!modify.is_complete());
        assert!(modify.needs_completion());

        let unclassified = Instruction::unclassified("hello");
        assert!(!unclassified.is_complete());
        assert!(!unclassified.needs_completion());

        let close_all = Instruction::new(
            "清仓所有",
            Action::Close {
                scope: CloseScope::AllPositions,
            },
        );
        assert!(!close_all.is_instrument_bearing());
        assert!(!close_all.needs_completion());
    }

    #[test]
    fn test_fill_missing_keeps_present_fields() {
        let mut partial = InstrumentIdentity {
            ticker: Some("tsla".to_string()),
            strike: Some(Strike::new(dec!(450))),
            ..Default::default()
        };
        partial.fill_missing_from(&tsla_identity());
        assert_eq!(partial.ticker.as_deref(), Some("tsla"));
        assert_eq!(partial.strike, Some(Strike::new(dec!(450))));
        assert_eq!(partial.option_type, Some(OptionType::Call));
        assert!(partial.is_complete());
        assert!(partial.same_ticker(&tsla_identity()));
    }

    #[test]
    fn test_bare_ticker() {
        let bare = InstrumentIdentity {
            ticker: Some("AMD".to_string()),
            ..Default::default()
        };
        assert!(bare.is_bare_ticker());
        assert!(!tsla_identity().is_bare_ticker());
        assert!(InstrumentIdentity::default().is_empty());
    }

    #[test]
    fn test_instruction_json_shape() {
        let instr = Instruction::new(
            "1.6出三分之一",
            Action::Sell {
                quantity: Some(SellQuantity::fraction(1, 3)),
            },
        )
        .with_price(Some(PriceQuote::single(dec!(1.6))));
        let value = serde_json::to_value(&instr).unwrap();
        assert_eq!(value["action"], "SELL");
        assert_eq!(value["quantity"]["kind"], "fraction");
        assert!(value.get("ticker").is_none());

        let back: Instruction = serde_json::from_value(value).unwrap();
        assert_eq!(back, instr);
    }
}
