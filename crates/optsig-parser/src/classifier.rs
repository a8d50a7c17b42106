//! Message classification.
//!
//! Turns one chat text into a candidate [`Instruction`]. Expiry text is kept
//! as written; dating it needs the message timestamp and happens in the
//! symbol composer.

use crate::normalize::normalize;
use crate::shapes::{Shape, SHAPES};
use crate::sniff::sniff_ticker;
use chrono::NaiveDateTime;
use optsig_core::{Instruction, TickerOrigin};
use tracing::{debug, trace};

/// Classifier over the ordered shape list.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    shapes: &'static [Shape],
}

/// Classification result with the name of the shape that produced it.
#[derive(Debug, Clone)]
pub struct Classified {
    pub instruction: Instruction,
    /// `None` when nothing matched.
    pub shape: Option<&'static str>,
}

impl Classifier {
    pub fn new() -> Self {
        Self { shapes: SHAPES }
    }

    /// Shapes in the order they are tried.
    pub fn shapes(&self) -> &'static [Shape] {
        self.shapes
    }

    /// Classify `text`. Never fails: unmatched text is `Unclassified`.
    pub fn classify(&self, text: &str, as_of: Option<NaiveDateTime>) -> Instruction {
        self.classify_detailed(text, as_of).instruction
    }

    /// Classify and report which shape matched.
    pub fn classify_detailed(&self, text: &str, as_of: Option<NaiveDateTime>) -> Classified {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return Classified {
                instruction: Instruction::unclassified(text),
                shape: None,
            };
        }

        for shape in self.shapes {
            let Some(matched) = shape.try_match(&normalized) else {
                continue;
            };

            debug!(
                shape = shape.name,
                family = %shape.family,
                action = matched.action.name(),
                "Matched instruction shape"
            );

            let mut instruction = Instruction::new(text, matched.action)
                .with_identity(matched.identity)
                .with_price(matched.price);

            if instruction.identity.ticker.is_none()
                && instruction.is_instrument_bearing()
                && !instruction.is_buy()
            {
                if let Some(ticker) = sniff_ticker(&normalized) {
                    debug!(ticker = %ticker, shape = shape.name, "Attached sniffed ticker");
                    instruction.identity.ticker = Some(ticker);
                    instruction.ticker_origin = Some(TickerOrigin::Sniffed);
                }
            }

            return Classified {
                instruction,
                shape: Some(shape.name),
            };
        }

        trace!(as_of = ?as_of, "No instruction shape matched");
        Classified {
            instruction: Instruction::unclassified(text),
            shape: None,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}
