//! Low-confidence ticker guessing.
//!
//! Used only when a matched shape left the ticker empty. A candidate is a
//! run of 2-5 uppercase ASCII letters with no letter on either side that is
//! not a common trading word.

use once_cell::sync::Lazy;
use regex::Regex;

static LETTER_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z]+").expect("letter run regex"));

/// Words that look like tickers but never are.
const STOPLIST: &[&str] = &[
    "CALL", "CALLS", "PUT", "PUTS", "ETF", "SL", "TP", "EXP", "USD", "AM", "PM", "ET", "EST",
    "PST", "OK", "ATM", "OTM", "ITM", "DTE", "IV", "ALL", "BUY", "SELL", "STOP", "LOSS", "OUT",
    "HOLD", "AT", "TO", "OF", "THE", "AND", "FOR", "IN", "ON", "US", "REST", "HALF", "TRIM",
    "EXPIRATION",
];

pub(crate) fn is_stopword(token: &str) -> bool {
    STOPLIST.iter().any(|w| w.eq_ignore_ascii_case(token))
}

/// Uppercase a shape-captured ticker, dropping stoplisted words.
pub(crate) fn accept_ticker(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || is_stopword(raw) {
        return None;
    }
    Some(raw.to_ascii_uppercase())
}

/// Find the first isolated uppercase token that could be a ticker.
pub fn sniff_ticker(text: &str) -> Option<String> {
    LETTER_RUN_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|run| {
            (2..=5).contains(&run.len())
                && run.chars().all(|c| c.is_ascii_uppercase())
                && !is_stopword(run)
        })
        .map(str::to_string)
}
