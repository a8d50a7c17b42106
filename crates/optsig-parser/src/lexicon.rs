//! Vocabulary shared by the shape matchers.
//!
//! Pattern fragments use named groups so a shape can splice them into its
//! own regex: `lo`/`hi` for prices, `exp` for expiry text, `qty` for sell
//! quantities.

use once_cell::sync::Lazy;
use optsig_core::{parse_loose_decimal, ExpiryDescriptor, PriceQuote, SellQuantity};
use regex::{Captures, Match, Regex};
use rust_decimal::Decimal;

/// Single price or `low-high` range, optional `$`.
pub(crate) const PRICE: &str =
    r"\$?(?P<lo>[0-9]+(?:\.[0-9]+)?)(?:\s*-\s*\$?(?P<hi>[0-9]+(?:\.[0-9]+)?))?";

/// Explicit date, localized month/day, or relative term.
pub(crate) const EXPIRY: &str = r"(?P<exp>[0-9]{8}|[0-9]{6}|[0-9]{1,2}/[0-9]{1,2}|[0-9]{1,2}月[0-9]{1,2}[日号]?|今天|今日|本周|这周|当周|下周|today|this week|next week)";

/// Sell quantity: fractional words, `n/d`, percent, or a contract count.
pub(crate) const QUANTITY: &str =
    r"(?P<qty>三分之一|三分之二|四分之一|四分之三|一半|[0-9]+/[0-9]+|[0-9]+(?:\.[0-9]+)?%|[0-9]+\s*张)";

/// Strike followed by a one-letter right, as in `614c`.
pub(crate) const STRIKE_RIGHT: &str = r"\$?(?P<strike>[0-9]+(?:\.[0-9]+)?)\s*(?P<right>[cp])";

static PRICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&["^", PRICE, "$"].concat()).expect("price regex")
});

static POSITION_SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"小仓位|中仓位|大仓位|轻仓|重仓|半仓|满仓").expect("position size regex"));

const INTRADAY_TAG: &str = "日内";

/// Portion of a position named by a quantity word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Portion {
    Partial(SellQuantity),
    /// Everything that is left.
    All,
}

/// Price quote from `lo`/`hi` captures.
pub(crate) fn price_from_captures(caps: &Captures<'_>) -> Option<PriceQuote> {
    let low = parse_loose_decimal(caps.name("lo")?.as_str()).ok()?;
    match caps.name("hi") {
        Some(hi) => {
            let high = parse_loose_decimal(hi.as_str()).ok()?;
            Some(PriceQuote::range(low, high))
        }
        None => Some(PriceQuote::single(low)),
    }
}

/// Whether a numeric capture ends where the number in `text` ends.
///
/// `regex` has no lookahead, so a shape checks this after matching. A date
/// or price followed by a digit, `/`, `月` or a decimal part was cut short
/// by backtracking.
pub(crate) fn ends_at_number_boundary(text: &str, m: Match<'_>) -> bool {
    if !m.as_str().ends_with(|c: char| c.is_ascii_digit()) {
        return true;
    }
    let mut rest = text[m.end()..].chars();
    match rest.next() {
        None => true,
        Some(c) if c.is_ascii_digit() || c == '/' || c == '月' => false,
        Some('.') => !rest.next().is_some_and(|c| c.is_ascii_digit()),
        Some(_) => true,
    }
}

/// Parse a standalone price or range, e.g. `1.5`, `$2.5`, `0.83-0.85`.
pub fn parse_price_text(text: &str) -> Option<PriceQuote> {
    let normalized = crate::normalize::normalize(text);
    let caps = PRICE_RE.captures(&normalized)?;
    price_from_captures(&caps)
}

/// Parse a quantity word into a portion.
pub fn parse_portion(word: &str) -> Option<Portion> {
    let word = word.trim();
    let lowered = word.to_ascii_lowercase();
    let fixed = match lowered.as_str() {
        "三分之一" => Some((1, 3)),
        "三分之二" => Some((2, 3)),
        "四分之一" => Some((1, 4)),
        "四分之三" => Some((3, 4)),
        "一半" | "half" => Some((1, 2)),
        "全部" | "剩下" | "剩余" | "all" | "rest" | "remaining" => return Some(Portion::All),
        _ => None,
    };
    if let Some((n, d)) = fixed {
        return Some(Portion::Partial(SellQuantity::fraction(n, d)));
    }

    if let Some(pct) = lowered.strip_suffix('%') {
        let percent = parse_loose_decimal(pct).ok()?;
        if percent >= Decimal::ONE_HUNDRED {
            return Some(Portion::All);
        }
        return Some(Portion::Partial(SellQuantity::Percent { percent }));
    }

    if let Some((n, d)) = lowered.split_once('/') {
        let numerator: u32 = n.trim().parse().ok()?;
        let denominator: u32 = d.trim().parse().ok()?;
        if denominator == 0 || numerator == 0 {
            return None;
        }
        if numerator >= denominator {
            return Some(Portion::All);
        }
        return Some(Portion::Partial(SellQuantity::fraction(numerator, denominator)));
    }

    let count: u32 = lowered.trim_end_matches('张').trim().parse().ok()?;
    if count == 0 {
        return None;
    }
    Some(Portion::Partial(SellQuantity::Count { count }))
}

/// Position-size tag of a Buy, e.g. `小仓位`.
///
/// A sizing word wins over the intraday tag when both appear.
pub fn position_size(text: &str) -> Option<String> {
    if let Some(m) = POSITION_SIZE_RE.find(text) {
        return Some(m.as_str().to_string());
    }
    text.contains(INTRADAY_TAG).then(|| INTRADAY_TAG.to_string())
}

/// Expiry descriptor from matched text; relative terms stay unresolved.
pub fn parse_expiry_text(text: &str) -> Option<ExpiryDescriptor> {
    text.parse().ok()
}
