//! Donor search over the history buffer.
//!
//! Two backward walks share one eligibility rule:
//! - the same-thread walk stops after the record that opened the thread
//! - the recency walk ignores threads and is bounded by a record count
//!
//! Both resume below the record's `checked_index` and push it down as they
//! prove entries empty.

use optsig_core::{
    Action, CanonicalSymbol, Instruction, InstrumentIdentity, MessageRecord,
};
use optsig_parser::Classifier;
use tracing::trace;

use crate::history::{HistoryBuffer, HistoryEntry};

/// An instruction whose identity can complete a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Donor {
    pub identity: InstrumentIdentity,
    /// Symbol already composed for the donor, if any.
    pub symbol: Option<CanonicalSymbol>,
    /// Raw text of the donor message.
    pub text: String,
    /// Buffer index; `None` for donors classified on the fly.
    pub index: Option<usize>,
}

impl Donor {
    fn from_entry(index: usize, entry: &HistoryEntry) -> Self {
        Self {
            identity: entry.instruction.identity.clone(),
            symbol: entry.instruction.canonical_symbol.clone(),
            text: entry.instruction.raw_text.clone(),
            index: Some(index),
        }
    }

    fn from_classified(instruction: Instruction) -> Self {
        Self {
            identity: instruction.identity,
            symbol: instruction.canonical_symbol,
            text: instruction.raw_text,
            index: None,
        }
    }
}

/// Whether `donor` may lend its identity to `candidate`.
///
/// The donor needs a complete identity. A candidate naming a ticker only
/// accepts a donor with the same ticker (case-insensitive); a candidate
/// without one accepts any Buy, Sell or Modify.
pub fn is_eligible(candidate: &InstrumentIdentity, donor: &Instruction) -> bool {
    if !donor.identity.is_complete() {
        return false;
    }
    if candidate.ticker.is_some() {
        candidate.same_ticker(&donor.identity)
    } else {
        matches!(
            donor.action,
            Action::Buy { .. } | Action::Sell { .. } | Action::Modify { .. }
        )
    }
}

/// Backward donor search with a bounded recency window.
#[derive(Debug, Clone, Copy)]
pub struct DonorSearch {
    recent_window: usize,
}

impl DonorSearch {
    #[must_use]
    pub fn new(recent_window: usize) -> Self {
        Self { recent_window }
    }

    pub fn recent_window(&self) -> usize {
        self.recent_window
    }

    /// Walk the buffer backward within the record's thread.
    ///
    /// Only `middle`/`last` records have a thread to walk. The walk examines
    /// the record that opened the thread and stops there.
    pub fn search_thread(
        &self,
        candidate: &Instruction,
        record: &MessageRecord,
        history: &mut HistoryBuffer,
    ) -> Option<Donor> {
        if !record.group_position.continues_thread() {
            return None;
        }
        let cursor = history.cursor(&record.id);
        if cursor.thread_exhausted {
            return None;
        }

        let floor = history.first_index();
        let mut index = cursor.checked_index.min(cursor.anchor);
        while index > floor {
            index -= 1;
            let Some(entry) = history.get(index) else {
                break;
            };
            if is_eligible(&candidate.identity, &entry.instruction) {
                let donor = Donor::from_entry(index, entry);
                history.mark_checked(&record.id, index + 1);
                trace!(record_id = %record.id, donor_index = index, "Thread donor found");
                return Some(donor);
            }
            if entry.record.group_position.starts_thread() {
                break;
            }
        }

        history.mark_checked(&record.id, index);
        history.mark_thread_exhausted(&record.id);
        None
    }

    /// Classify the record's own earlier thread texts, newest first.
    ///
    /// Used when the buffer does not hold the thread.
    pub fn search_thread_texts(
        &self,
        classifier: &Classifier,
        candidate: &Instruction,
        record: &MessageRecord,
    ) -> Option<Donor> {
        if !record.group_position.continues_thread() {
            return None;
        }
        record
            .history
            .iter()
            .rev()
            .map(|text| classifier.classify(text, record.timestamp))
            .find(|instruction| is_eligible(&candidate.identity, instruction))
            .map(Donor::from_classified)
    }

    /// Walk the last `recent_window` entries before the record, ignoring
    /// thread boundaries.
    pub fn search_recent(
        &self,
        candidate: &Instruction,
        record: &MessageRecord,
        history: &mut HistoryBuffer,
    ) -> Option<Donor> {
        let cursor = history.cursor(&record.id);
        let floor = cursor
            .anchor
            .saturating_sub(self.recent_window)
            .max(history.first_index());

        let mut index = cursor.checked_index.min(cursor.anchor);
        while index > floor {
            index -= 1;
            let Some(entry) = history.get(index) else {
                break;
            };
            if is_eligible(&candidate.identity, &entry.instruction) {
                let donor = Donor::from_entry(index, entry);
                history.mark_checked(&record.id, index + 1);
                trace!(record_id = %record.id, donor_index = index, "Recent donor found");
                return Some(donor);
            }
        }

        history.mark_checked(&record.id, index);
        None
    }
}

impl Default for DonorSearch {
    fn default() -> Self {
        Self::new(crate::resolver::DEFAULT_RECENT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optsig_core::{ExpiryDescriptor, GroupPosition, OptionType, PriceQuote, Strike};
    use rust_decimal_macros::dec;

    fn buy(ticker: &str, strike: rust_decimal::Decimal) -> Instruction {
        Instruction::new(
            format!("{ticker} {strike}c 2/9 3.1"),
            Action::Buy {
                position_size: None,
            },
        )
        .with_identity(InstrumentIdentity {
            ticker: Some(ticker.to_string()),
            option_type: Some(OptionType::Call),
            strike: Some(Strike::new(strike)),
            expiry: Some(ExpiryDescriptor::MonthDay { month: 2, day: 9 }),
        })
    }

    fn stop(ticker: Option<&str>) -> Instruction {
        Instruction::new(
            "止损在2.9",
            Action::Modify {
                stop_loss: Some(PriceQuote::single(dec!(2.9))),
                take_profit: None,
            },
        )
        .with_identity(InstrumentIdentity {
            ticker: ticker.map(str::to_string),
            ..Default::default()
        })
    }

    fn push(history: &mut HistoryBuffer, id: &str, pos: GroupPosition, instr: Instruction) {
        let record = MessageRecord::new(id, instr.raw_text.clone()).with_group_position(pos);
        history.append(record, instr);
    }

    #[test]
    fn test_eligibility_rules() {
        let donor = buy("TSLA", dec!(440));
        assert!(is_eligible(&stop(None).identity, &donor));
        assert!(is_eligible(&stop(Some("tsla")).identity, &donor));
        assert!(!is_eligible(&stop(Some("NVDA")).identity, &donor));

        let incomplete = stop(Some("TSLA"));
        assert!(!is_eligible(&stop(None).identity, &incomplete));

        let mut close = buy("TSLA", dec!(440));
        close.action = Action::Close {
            scope: Default::default(),
        };
        assert!(!is_eligible(&stop(None).identity, &close));
        assert!(is_eligible(&stop(Some("TSLA")).identity, &close));
    }

    #[test]
    fn test_thread_walk_stops_at_boundary() {
        let mut history = HistoryBuffer::new();
        push(&mut history, "0", GroupPosition::Single, buy("TSLA", dec!(440)));
        push(&mut history, "1", GroupPosition::First, Instruction::unclassified("hi"));
        push(&mut history, "2", GroupPosition::Middle, Instruction::unclassified("..."));

        let record = MessageRecord::new("3", "止损在2.9").with_group_position(GroupPosition::Last);
        let search = DonorSearch::new(10);
        assert!(search.search_thread(&stop(None), &record, &mut history).is_none());
        assert_eq!(history.checked_index("3"), Some(1));

        let donor = search.search_recent(&stop(None), &record, &mut history).unwrap();
        assert_eq!(donor.index, Some(0));
        assert_eq!(donor.identity.ticker.as_deref(), Some("TSLA"));
    }

    #[test]
    fn test_recent_window_bound() {
        let mut history = HistoryBuffer::new();
        push(&mut history, "0", GroupPosition::Single, buy("TSLA", dec!(440)));
        for i in 1..4 {
            push(
                &mut history,
                &i.to_string(),
                GroupPosition::Single,
                Instruction::unclassified("chatter"),
            );
        }
        let record = MessageRecord::new("4", "止损在2.9");
        let narrow = DonorSearch::new(3);
        assert!(narrow.search_recent(&stop(None), &record, &mut history).is_none());
        assert_eq!(history.checked_index("4"), Some(1));

        let record = MessageRecord::new("5", "止损在2.9");
        let wide = DonorSearch::new(4);
        assert!(wide.search_recent(&stop(None), &record, &mut history).is_some());
    }

    #[test]
    fn test_thread_texts_newest_first() {
        let classifier = Classifier::new();
        let record = MessageRecord::new("x", "止损在1.0")
            .with_group_position(GroupPosition::Last)
            .with_history(vec![
                "TSLA 440c 2/9 3.1".to_string(),
                "NVDA 190c 1/30 2.1".to_string(),
            ]);
        let donor = DonorSearch::new(10)
            .search_thread_texts(&classifier, &stop(None), &record)
            .unwrap();
        assert_eq!(donor.identity.ticker.as_deref(), Some("NVDA"));
        assert_eq!(donor.text, "NVDA 190c 1/30 2.1");
        assert!(donor.index.is_none());
    }
}
