//! Instruction shapes.
//!
//! Each shape is an independent matcher over normalised text that returns a
//! structured partial result. [`SHAPES`] holds them in priority order:
//! Buy shapes, then Modify, then Sell/Close, then fixed whole phrases. The
//! first shape that matches wins; there is no scoring and no backtracking
//! across families.

use crate::lexicon::{
    ends_at_number_boundary, parse_expiry_text, parse_portion, position_size,
    price_from_captures, Portion, EXPIRY, PRICE, QUANTITY, STRIKE_RIGHT,
};
use crate::sniff::accept_ticker;
use once_cell::sync::Lazy;
use optsig_core::{Action, CloseScope, InstrumentIdentity, OptionType, PriceQuote, Strike};
use regex::{Captures, Regex};
use std::fmt;

/// Family a shape belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeFamily {
    Buy,
    Modify,
    SellClose,
    Phrase,
}

impl fmt::Display for ShapeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Modify => write!(f, "modify"),
            Self::SellClose => write!(f, "sell_close"),
            Self::Phrase => write!(f, "phrase"),
        }
    }
}

/// Fields extracted by one shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMatch {
    pub action: Action,
    pub identity: InstrumentIdentity,
    pub price: Option<PriceQuote>,
}

/// A named matcher in the priority list.
pub struct Shape {
    pub name: &'static str,
    pub family: ShapeFamily,
    matcher: fn(&str) -> Option<ShapeMatch>,
}

impl Shape {
    /// Run the matcher against normalised text.
    #[inline]
    pub fn try_match(&self, text: &str) -> Option<ShapeMatch> {
        (self.matcher)(text)
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("name", &self.name)
            .field("family", &self.family)
            .finish()
    }
}

/// All shapes, highest priority first.
pub static SHAPES: &[Shape] = &[
    Shape {
        name: "buy_contract_label",
        family: ShapeFamily::Buy,
        matcher: match_buy_contract,
    },
    Shape {
        name: "buy_dash",
        family: ShapeFamily::Buy,
        matcher: match_buy_dash,
    },
    Shape {
        name: "buy_compact",
        family: ShapeFamily::Buy,
        matcher: match_buy_compact,
    },
    Shape {
        name: "buy_expiry_first",
        family: ShapeFamily::Buy,
        matcher: match_buy_expiry_first,
    },
    Shape {
        name: "modify_adjust_stop",
        family: ShapeFamily::Modify,
        matcher: match_adjust_stop,
    },
    Shape {
        name: "modify_stop_at",
        family: ShapeFamily::Modify,
        matcher: match_stop_at,
    },
    Shape {
        name: "modify_stop_reverse",
        family: ShapeFamily::Modify,
        matcher: match_stop_reverse,
    },
    Shape {
        name: "modify_take_profit",
        family: ShapeFamily::Modify,
        matcher: match_take_profit,
    },
    Shape {
        name: "sell_portion",
        family: ShapeFamily::SellClose,
        matcher: match_sell_portion,
    },
    Shape {
        name: "close_remaining",
        family: ShapeFamily::SellClose,
        matcher: match_close_remaining,
    },
    Shape {
        name: "sell_english",
        family: ShapeFamily::SellClose,
        matcher: match_sell_english,
    },
    Shape {
        name: "close_all_phrase",
        family: ShapeFamily::Phrase,
        matcher: match_close_all,
    },
];

// === Patterns ===

const KW_STOP: &str = r"(?:止损|(?:^|[^a-z])(?:sl|stop\s*loss))";
const KW_TAKE_PROFIT: &str = r"(?:止盈|(?:^|[^a-z])(?:tp|take\s*profit))";
const TICKER_BEFORE: &str = r"(?:(?P<tk>[a-z]{1,5})\s*(?:在\s*)?)?";
const TICKER_AFTER: &str = r"(?:\s*(?P<tk3>[a-z]{1,5})(?P<tag>\s*期权)?(?:[^a-z]|$))?";

/// Thread words a lowercase trailing ticker may follow directly.
const TICKER_LEADS: &[&str] = &["剩下的", "剩余的", "剩下", "剩余"];

fn build(parts: &[&str]) -> Regex {
    let pattern = parts.concat();
    Regex::new(&pattern).unwrap_or_else(|e| panic!("invalid shape regex {pattern}: {e}"))
}

static BUY_CONTRACT_RE: Lazy<Regex> = Lazy::new(|| {
    build(&[
        r"(?i)合约\s*:?\s*(?P<tk>[a-z]{1,5})\s+",
        EXPIRY,
        r"\s+",
        STRIKE_RIGHT,
        r"[^0-9$]*?",
        PRICE,
    ])
});

static BUY_DASH_RE: Lazy<Regex> = Lazy::new(|| {
    build(&[
        r"(?i)(?:^|[^a-z])(?P<tk>[a-z]{1,5})\s*-?\s*\$?(?P<strike>[0-9]+(?:\.[0-9]+)?)\s*(?P<right>calls?|puts?)",
        r"(?:\s*(?:expiration|exp)\.?)?(?:\s*",
        EXPIRY,
        r")?\s*",
        PRICE,
    ])
});

static BUY_COMPACT_RE: Lazy<Regex> = Lazy::new(|| {
    build(&[
        r"(?i)(?:^|[^a-z])(?P<tk>[a-z]{1,5})\s+",
        STRIKE_RIGHT,
        r"\s+",
        EXPIRY,
        r"[^0-9$]*?",
        PRICE,
    ])
});

static BUY_EXPIRY_FIRST_RE: Lazy<Regex> = Lazy::new(|| {
    build(&[
        r"(?i)(?:^|[^a-z])(?P<tk>[a-z]{1,5})\s+",
        EXPIRY,
        r"\s+",
        STRIKE_RIGHT,
        r"[^a-z0-9][^0-9$]*?",
        PRICE,
    ])
});

static ADJUST_STOP_RE: Lazy<Regex> = Lazy::new(|| {
    build(&[
        "(?i)",
        KW_STOP,
        r"\s*(?:设置)?\s*(?:提高|调整|调高|调|移动|上调|上移|下调|下移|raised?|moved?|adjust(?:ed)?)\s*(?:到|至|to)?\s*",
        PRICE,
        TICKER_AFTER,
    ])
});

static STOP_AT_RE: Lazy<Regex> = Lazy::new(|| {
    build(&[
        "(?i)",
        KW_STOP,
        r"\s*(?:设置|设|放|移)?\s*(?:在|为|到|:|at|@)?\s*",
        PRICE,
        TICKER_AFTER,
    ])
});

static STOP_REVERSE_RE: Lazy<Regex> = Lazy::new(|| {
    build(&[
        r"(?i)(?:^|[^0-9.])",
        PRICE,
        r"\s*(?:止损|sl)(?:\s*(?:剩下的?|剩余的?))?",
        TICKER_AFTER,
    ])
});

static TAKE_PROFIT_RE: Lazy<Regex> = Lazy::new(|| {
    build(&[
        "(?i)",
        KW_TAKE_PROFIT,
        r"\s*(?:设置|设|放)?\s*(?:在|为|到|:|at|@)?\s*",
        PRICE,
        TICKER_AFTER,
    ])
});

static SELL_PORTION_RE: Lazy<Regex> = Lazy::new(|| {
    build(&[
        r"(?i)(?:^|[^a-z0-9.])",
        TICKER_BEFORE,
        PRICE,
        r"\s*(?:附近|左右|位置)?\s*(?:开始)?\s*(?:减仓|减|卖出|卖|出)\s*(?:剩下的?|剩余的?)?\s*",
        QUANTITY,
        TICKER_AFTER,
    ])
});

static CLOSE_REMAINING_RE: Lazy<Regex> = Lazy::new(|| {
    build(&[
        r"(?i)(?:^|[^a-z0-9.])",
        TICKER_BEFORE,
        PRICE,
        r"\s*(?:附近|左右|位置)?\s*(?:把)?\s*(?:(?P<tk2>[a-z]{1,5})\s*)?(?:剩下的?|剩余的?)?\s*",
        r"(?:都出|全出|全部出|出全部|全部卖出|全卖|出完|清仓|出剩下的?|出剩余的?)(?:了)?",
        TICKER_AFTER,
    ])
});

static SELL_ENGLISH_RE: Lazy<Regex> = Lazy::new(|| {
    build(&[
        r"(?i)(?:^|[^a-z])(?:sell|sold|trim|trimmed|out)\s+",
        r"(?P<qty>all|rest|remaining|half|[0-9]+/[0-9]+|[0-9]+(?:\.[0-9]+)?%|[0-9]+)",
        r"(?:\s+(?:of\s+)?(?P<tk>[a-z]{1,5}))?\s*(?:at|@)\s*",
        PRICE,
    ])
});

static CLOSE_ALL_RE: Lazy<Regex> = Lazy::new(|| {
    build(&[
        r"(?i)^\s*(?:清仓所有(?:仓位)?|全部清仓|所有仓位清仓|清空所有仓位|(?:clear|close)\s+all(?:\s+positions)?)\s*[!.]*\s*$",
    ])
});

// === Extraction helpers ===

/// First acceptable ticker among the named groups.
fn ticker_from(caps: &Captures<'_>, groups: &[&str]) -> Option<String> {
    groups
        .iter()
        .filter_map(|g| caps.name(g))
        .find_map(|m| accept_ticker(m.as_str()))
}

/// Ticker written after the price.
///
/// Lowercase words are taken only right after a thread word (`剩下的ba`)
/// or when tagged `期权`. Anything else must be written in uppercase.
fn trailing_ticker(caps: &Captures<'_>, text: &str) -> Option<String> {
    let m = caps.name("tk3")?;
    let raw = m.as_str();
    let glued = caps.name("tag").is_some()
        || TICKER_LEADS
            .iter()
            .any(|lead| text[..m.start()].trim_end().ends_with(lead));
    let uppercase = raw.len() >= 2 && raw.chars().all(|c| c.is_ascii_uppercase());
    if glued || uppercase {
        accept_ticker(raw)
    } else {
        None
    }
}

fn identity_with_ticker(ticker: Option<String>) -> InstrumentIdentity {
    InstrumentIdentity {
        ticker,
        ..Default::default()
    }
}

fn buy_from(caps: &Captures<'_>, text: &str) -> Option<ShapeMatch> {
    let cut_short = ["exp", "lo", "hi"]
        .iter()
        .filter_map(|g| caps.name(g))
        .any(|m| !ends_at_number_boundary(text, m));
    if cut_short {
        return None;
    }
    let ticker = ticker_from(caps, &["tk"])?;
    let strike: Strike = caps.name("strike")?.as_str().parse().ok()?;
    let option_type: OptionType = caps.name("right")?.as_str().parse().ok()?;
    let expiry = caps.name("exp").and_then(|m| parse_expiry_text(m.as_str()));
    Some(ShapeMatch {
        action: Action::Buy {
            position_size: position_size(text),
        },
        identity: InstrumentIdentity {
            ticker: Some(ticker),
            option_type: Some(option_type),
            strike: Some(strike),
            expiry,
        },
        price: price_from_captures(caps),
    })
}

fn stop_loss_from(caps: &Captures<'_>, text: &str) -> Option<ShapeMatch> {
    let stop = price_from_captures(caps)?;
    Some(ShapeMatch {
        action: Action::Modify {
            stop_loss: Some(stop),
            take_profit: None,
        },
        identity: identity_with_ticker(trailing_ticker(caps, text)),
        price: None,
    })
}

fn portion_action(portion: Portion) -> Action {
    match portion {
        Portion::Partial(quantity) => Action::Sell {
            quantity: Some(quantity),
        },
        Portion::All => Action::Close {
            scope: CloseScope::Position,
        },
    }
}

// === Buy shapes ===

fn match_buy_contract(text: &str) -> Option<ShapeMatch> {
    buy_from(&BUY_CONTRACT_RE.captures(text)?, text)
}

fn match_buy_dash(text: &str) -> Option<ShapeMatch> {
    buy_from(&BUY_DASH_RE.captures(text)?, text)
}

fn match_buy_compact(text: &str) -> Option<ShapeMatch> {
    buy_from(&BUY_COMPACT_RE.captures(text)?, text)
}

fn match_buy_expiry_first(text: &str) -> Option<ShapeMatch> {
    buy_from(&BUY_EXPIRY_FIRST_RE.captures(text)?, text)
}

// === Modify shapes ===

fn match_adjust_stop(text: &str) -> Option<ShapeMatch> {
    stop_loss_from(&ADJUST_STOP_RE.captures(text)?, text)
}

fn match_stop_at(text: &str) -> Option<ShapeMatch> {
    stop_loss_from(&STOP_AT_RE.captures(text)?, text)
}

fn match_stop_reverse(text: &str) -> Option<ShapeMatch> {
    stop_loss_from(&STOP_REVERSE_RE.captures(text)?, text)
}

fn match_take_profit(text: &str) -> Option<ShapeMatch> {
    let caps = TAKE_PROFIT_RE.captures(text)?;
    Some(ShapeMatch {
        action: Action::Modify {
            stop_loss: None,
            take_profit: Some(price_from_captures(&caps)?),
        },
        identity: identity_with_ticker(trailing_ticker(&caps, text)),
        price: None,
    })
}

// === Sell / Close shapes ===

fn match_sell_portion(text: &str) -> Option<ShapeMatch> {
    let caps = SELL_PORTION_RE.captures(text)?;
    let portion = parse_portion(caps.name("qty")?.as_str())?;
    Some(ShapeMatch {
        action: portion_action(portion),
        identity: identity_with_ticker(
            ticker_from(&caps, &["tk"]).or_else(|| trailing_ticker(&caps, text)),
        ),
        price: price_from_captures(&caps),
    })
}

fn match_close_remaining(text: &str) -> Option<ShapeMatch> {
    let caps = CLOSE_REMAINING_RE.captures(text)?;
    Some(ShapeMatch {
        action: Action::Close {
            scope: CloseScope::Position,
        },
        identity: identity_with_ticker(
            ticker_from(&caps, &["tk", "tk2"]).or_else(|| trailing_ticker(&caps, text)),
        ),
        price: price_from_captures(&caps),
    })
}

fn match_sell_english(text: &str) -> Option<ShapeMatch> {
    let caps = SELL_ENGLISH_RE.captures(text)?;
    let portion = parse_portion(caps.name("qty")?.as_str())?;
    Some(ShapeMatch {
        action: portion_action(portion),
        identity: identity_with_ticker(ticker_from(&caps, &["tk"])),
        price: price_from_captures(&caps),
    })
}

// === Phrase shapes ===

fn match_close_all(text: &str) -> Option<ShapeMatch> {
    CLOSE_ALL_RE.is_match(text).then(|| ShapeMatch {
        action: Action::Close {
            scope: CloseScope::AllPositions,
        },
        identity: InstrumentIdentity::default(),
        price: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use optsig_core::{ExpiryDescriptor, RelativeTerm, SellQuantity};
    use rust_decimal_macros::dec;

    fn first_match(text: &str) -> Option<(&'static str, ShapeMatch)> {
        let text = normalize(text);
        SHAPES
            .iter()
            .find_map(|s| s.try_match(&text).map(|m| (s.name, m)))
    }

    fn expect_match(text: &str, shape: &str) -> ShapeMatch {
        match first_match(text) {
            Some((name, m)) => {
                assert_eq!(name, shape, "wrong shape for {text:?}");
                m
            }
            None => panic!("Expected {shape} to match {text:?}"),
        }
    }

    fn month_day(month: u32, day: u32) -> Option<ExpiryDescriptor> {
        Some(ExpiryDescriptor::MonthDay { month, day })
    }

    #[test]
    fn test_shape_order_is_family_order() {
        let families: Vec<ShapeFamily> = SHAPES.iter().map(|s| s.family).collect();
        let mut sorted = families.clone();
        sorted.sort_by_key(|f| match f {
            ShapeFamily::Buy => 0,
            ShapeFamily::Modify => 1,
            ShapeFamily::SellClose => 2,
            ShapeFamily::Phrase => 3,
        });
        assert_eq!(families, sorted);
    }

    // === Buy shape tests ===

    #[test]
    fn test_buy_contract_label() {
        let m = expect_match("合约：QQQ 11/20 614c 入场价：1.1 备注：小仓位", "buy_contract_label");
        assert_eq!(m.identity.ticker.as_deref(), Some("QQQ"));
        assert_eq!(m.identity.option_type, Some(OptionType::Call));
        assert_eq!(m.identity.strike, Some(Strike::new(dec!(614))));
        assert_eq!(m.identity.expiry, month_day(11, 20));
        assert_eq!(m.price, Some(PriceQuote::single(dec!(1.1))));
        assert_eq!(
            m.action,
            Action::Buy {
                position_size: Some("小仓位".to_string())
            }
        );

        let m = expect_match("合约：QQQ 11/20 609P 入场价：1.5", "buy_contract_label");
        assert_eq!(m.identity.option_type, Some(OptionType::Put));
        assert_eq!(m.action, Action::Buy { position_size: None });
    }

    #[test]
    fn test_buy_dash_variants() {
        let m = expect_match("AAPL - $150 CALLS 1/31 $2.5", "buy_dash");
        assert_eq!(m.identity.ticker.as_deref(), Some("AAPL"));
        assert_eq!(m.identity.option_type, Some(OptionType::Call));
        assert_eq!(m.identity.strike, Some(Strike::new(dec!(150))));
        assert_eq!(m.identity.expiry, month_day(1, 31));
        assert_eq!(m.price, Some(PriceQuote::single(dec!(2.5))));
        assert_eq!(m.action, Action::Buy { position_size: None });

        let m = expect_match("AAPL $150 PUTS 1/31 $2.5", "buy_dash");
        assert_eq!(m.identity.option_type, Some(OptionType::Put));

        let m = expect_match("INTC - $48 CALLS 本周 $1.2", "buy_dash");
        assert!(matches!(
            m.identity.expiry,
            Some(ExpiryDescriptor::Relative {
                term: RelativeTerm::ThisWeek,
                ..
            })
        ));

        let m = expect_match("TSLA - 250 CALL $3.0 小仓位", "buy_dash");
        assert_eq!(m.identity.expiry, None);
        assert_eq!(m.price, Some(PriceQuote::single(dec!(3.0))));
        assert_eq!(
            m.action,
            Action::Buy {
                position_size: Some("小仓位".to_string())
            }
        );

        let m = expect_match("SPY - $680 CALLS 今天 $2.3", "buy_dash");
        assert!(matches!(
            m.identity.expiry,
            Some(ExpiryDescriptor::Relative {
                term: RelativeTerm::Today,
                ..
            })
        ));
    }

    #[test]
    fn test_buy_dash_expiration_keyword() {
        let m = expect_match("BA - $240 CALLS EXPIRATION 2月13 $2.8", "buy_dash");
        assert_eq!(m.identity.ticker.as_deref(), Some("BA"));
        assert_eq!(m.identity.strike, Some(Strike::new(dec!(240))));
        assert_eq!(m.identity.expiry, month_day(2, 13));
        assert_eq!(m.price, Some(PriceQuote::single(dec!(2.8))));
    }

    #[test]
    fn test_buy_dash_range_price() {
        let m = expect_match("GILD - $130 CALLS 这周 1.5-1.60", "buy_dash");
        assert_eq!(m.price, Some(PriceQuote::range(dec!(1.5), dec!(1.60))));
    }

    #[test]
    fn test_buy_compact() {
        let m = expect_match("TSLA 460c 1/16 小仓位日内交易 4.10", "buy_compact");
        assert_eq!(m.identity.ticker.as_deref(), Some("TSLA"));
        assert_eq!(m.identity.strike, Some(Strike::new(dec!(460))));
        assert_eq!(m.identity.expiry, month_day(1, 16));
        assert_eq!(m.price, Some(PriceQuote::single(dec!(4.10))));
        assert_eq!(
            m.action,
            Action::Buy {
                position_size: Some("小仓位".to_string())
            }
        );

        let m = expect_match("RIVN 16c 3/20 1.35", "buy_compact");
        assert_eq!(m.identity.strike, Some(Strike::new(dec!(16))));
        assert_eq!(m.price, Some(PriceQuote::single(dec!(1.35))));

        let m = expect_match("AMZN 250c 2/20 4.00 小仓位", "buy_compact");
        assert_eq!(m.identity.ticker.as_deref(), Some("AMZN"));

        let m = expect_match("TSLA 440c 2/9 3.1", "buy_compact");
        assert_eq!(m.identity.expiry, month_day(2, 9));
    }

    #[test]
    fn test_buy_compact_range_not_averaged() {
        let m = expect_match("NVDA 190c 1/30 2-2.1 小仓位", "buy_compact");
        assert_eq!(m.price, Some(PriceQuote::range(dec!(2), dec!(2.1))));
    }

    #[test]
    fn test_buy_expiry_first() {
        let m = expect_match("QQQ 11/20 614c 1.1", "buy_expiry_first");
        assert_eq!(m.identity.ticker.as_deref(), Some("QQQ"));
        assert_eq!(m.identity.expiry, month_day(11, 20));
        assert_eq!(m.identity.strike, Some(Strike::new(dec!(614))));
    }

    fn matched_family(text: &str) -> Option<ShapeFamily> {
        let text = normalize(text);
        SHAPES
            .iter()
            .find(|s| s.try_match(&text).is_some())
            .map(|s| s.family)
    }

    #[test]
    fn test_buy_without_price_is_not_buy() {
        for text in [
            "合约：QQQ 11/20 614c",
            "AAPL - $150 CALLS 1/31",
            "BA - $240 CALLS EXPIRATION 2月13",
            "AAPL - $150 CALLS 20260131",
            "TSLA 460c 1/16",
            "TSLA 460c 1/16 小仓位",
            "QQQ 11/20 614c",
            "QQQ 11/20 614c 小仓位",
        ] {
            assert_ne!(matched_family(text), Some(ShapeFamily::Buy), "{text}");
        }
    }

    #[test]
    fn test_buy_dash_price_not_taken_from_date() {
        // With no expiry and no price, the date digits must not become a price.
        assert_ne!(
            matched_family("SPY - $680 CALLS 12/19"),
            Some(ShapeFamily::Buy)
        );
        let m = expect_match("SPY - $680 CALLS 12/19 $2.3.", "buy_dash");
        assert_eq!(m.identity.expiry, month_day(12, 19));
        assert_eq!(m.price, Some(PriceQuote::single(dec!(2.3))));
    }

    #[test]
    fn test_buy_compact_full_date_kept() {
        let m = expect_match("TSLA 460c 1/16 4.1", "buy_compact");
        assert_eq!(m.identity.expiry, month_day(1, 16));
        assert_eq!(m.price, Some(PriceQuote::single(dec!(4.1))));
    }

    // === Modify shape tests ===

    #[test]
    fn test_stop_loss_shapes() {
        for (text, shape, price) in [
            ("止损设置在0.6", "modify_stop_at", dec!(0.6)),
            ("止损在1.00", "modify_stop_at", dec!(1.00)),
            ("小仓位 止损 在 1.3", "modify_stop_at", dec!(1.3)),
            ("SL 1.5", "modify_stop_at", dec!(1.5)),
            ("止损 0.95", "modify_stop_at", dec!(0.95)),
            ("止损提高到1.5", "modify_adjust_stop", dec!(1.5)),
            ("止损设置上移到2.16", "modify_adjust_stop", dec!(2.16)),
        ] {
            let m = expect_match(text, shape);
            assert_eq!(
                m.action,
                Action::Modify {
                    stop_loss: Some(PriceQuote::single(price)),
                    take_profit: None
                },
                "{text}"
            );
            assert!(m.identity.is_empty(), "{text}");
        }
    }

    #[test]
    fn test_stop_loss_trailing_ticker() {
        let m = expect_match("止损提高到3.2 tsla期权今天也是日内的", "modify_adjust_stop");
        assert_eq!(m.identity.ticker.as_deref(), Some("TSLA"));
    }

    #[test]
    fn test_stop_loss_trailing_chat_word_is_not_ticker() {
        for (text, shape) in [
            ("止损在2.9 guys", "modify_stop_at"),
            ("止损提高到1.5 now", "modify_adjust_stop"),
            ("2.5止损 ok", "modify_stop_reverse"),
            ("止损 1.5 tsla", "modify_stop_at"),
        ] {
            let m = expect_match(text, shape);
            assert_eq!(m.identity.ticker, None, "{text}");
        }

        let m = expect_match("止损在2.9 TSLA", "modify_stop_at");
        assert_eq!(m.identity.ticker.as_deref(), Some("TSLA"));
        let m = expect_match("2.5止损剩下的 ba", "modify_stop_reverse");
        assert_eq!(m.identity.ticker.as_deref(), Some("BA"));
    }

    #[test]
    fn test_take_profit_trailing_ticker() {
        let m = expect_match("止盈 2.5 thx", "modify_take_profit");
        assert_eq!(m.identity.ticker, None);
        let m = expect_match("止盈 2.5 amd期权", "modify_take_profit");
        assert_eq!(m.identity.ticker.as_deref(), Some("AMD"));
    }

    #[test]
    fn test_stop_loss_reverse() {
        let m = expect_match("2.5止损剩下的ba 横盘有磨损了", "modify_stop_reverse");
        assert_eq!(m.identity.ticker.as_deref(), Some("BA"));
        let m = expect_match("3.0止损剩下的tsla", "modify_stop_reverse");
        assert_eq!(m.identity.ticker.as_deref(), Some("TSLA"));
        let m = expect_match("1.8SL剩下的nvda", "modify_stop_reverse");
        assert_eq!(m.identity.ticker.as_deref(), Some("NVDA"));
        let m = expect_match("2.5止损", "modify_stop_reverse");
        assert_eq!(m.identity.ticker, None);
    }

    #[test]
    fn test_take_profit() {
        let m = expect_match("止盈 2.5", "modify_take_profit");
        assert_eq!(
            m.action,
            Action::Modify {
                stop_loss: None,
                take_profit: Some(PriceQuote::single(dec!(2.5)))
            }
        );
    }

    // === Sell / Close shape tests ===

    #[test]
    fn test_sell_portions() {
        for (text, price, quantity) in [
            ("1.6出三分之一", PriceQuote::single(dec!(1.6)), SellQuantity::fraction(1, 3)),
            ("1.42出一半", PriceQuote::single(dec!(1.42)), SellQuantity::fraction(1, 2)),
            ("0.85出三分之一", PriceQuote::single(dec!(0.85)), SellQuantity::fraction(1, 3)),
            ("1.65附近出剩下三分之二", PriceQuote::single(dec!(1.65)), SellQuantity::fraction(2, 3)),
            ("1.52出剩下一半", PriceQuote::single(dec!(1.52)), SellQuantity::fraction(1, 2)),
            (
                "1.2-1.3开始减三分之一",
                PriceQuote::range(dec!(1.2), dec!(1.3)),
                SellQuantity::fraction(1, 3),
            ),
        ] {
            let m = expect_match(text, "sell_portion");
            assert_eq!(m.price, Some(price), "{text}");
            assert_eq!(
                m.action,
                Action::Sell {
                    quantity: Some(quantity)
                },
                "{text}"
            );
            assert_eq!(m.identity.ticker, None, "{text}");
        }
    }

    #[test]
    fn test_sell_with_ticker_positions() {
        let m = expect_match("TSLA 在 4.40 减仓一半", "sell_portion");
        assert_eq!(m.identity.ticker.as_deref(), Some("TSLA"));
        assert_eq!(m.price, Some(PriceQuote::single(dec!(4.40))));

        let m = expect_match("0.92出三分之一cmcsa期权", "sell_portion");
        assert_eq!(m.identity.ticker.as_deref(), Some("CMCSA"));

        let m = expect_match("2.72出三分之一 NDAQ", "sell_portion");
        assert_eq!(m.identity.ticker.as_deref(), Some("NDAQ"));
    }

    #[test]
    fn test_sell_trailing_lowercase_word_is_not_ticker() {
        let m = expect_match("2.72出三分之一 ndaq", "sell_portion");
        assert_eq!(m.identity.ticker, None);
        let m = expect_match("1.6出三分之一 guys", "sell_portion");
        assert_eq!(m.identity.ticker, None);
        let m = expect_match("1.6出三分之一 nice", "sell_portion");
        assert!(m.identity.is_empty());
    }

    #[test]
    fn test_close_remaining() {
        let close = Action::Close {
            scope: CloseScope::Position,
        };
        let m = expect_match("0.9剩下都出", "close_remaining");
        assert_eq!(m.action, close);
        assert_eq!(m.price, Some(PriceQuote::single(dec!(0.9))));

        let m = expect_match("1.5附近把剩下都出了", "close_remaining");
        assert_eq!(m.action, close);

        let m = expect_match("4.75 amd全出", "close_remaining");
        assert_eq!(m.identity.ticker.as_deref(), Some("AMD"));

        let m = expect_match("2.75都出 HON", "close_remaining");
        assert_eq!(m.identity.ticker.as_deref(), Some("HON"));

        let m = expect_match("2.75都出 thanks", "close_remaining");
        assert_eq!(m.identity.ticker, None);
    }

    #[test]
    fn test_sell_english() {
        let m = expect_match("sell 1/3 at 1.6", "sell_english");
        assert_eq!(
            m.action,
            Action::Sell {
                quantity: Some(SellQuantity::fraction(1, 3))
            }
        );
        let m = expect_match("trim 50% @ 2.1", "sell_english");
        assert_eq!(
            m.action,
            Action::Sell {
                quantity: Some(SellQuantity::Percent { percent: dec!(50) })
            }
        );
        let m = expect_match("sell 2 @ 1.5", "sell_english");
        assert_eq!(
            m.action,
            Action::Sell {
                quantity: Some(SellQuantity::Count { count: 2 })
            }
        );
        let m = expect_match("sell all at 2.0", "sell_english");
        assert_eq!(
            m.action,
            Action::Close {
                scope: CloseScope::Position
            }
        );
        let m = expect_match("sell half tsla at 2", "sell_english");
        assert_eq!(m.identity.ticker.as_deref(), Some("TSLA"));
    }

    // === Phrase tests ===

    #[test]
    fn test_close_all_phrases() {
        for text in ["清仓所有", "全部清仓", "clear all positions", "Close all positions!"] {
            let m = expect_match(text, "close_all_phrase");
            assert_eq!(
                m.action,
                Action::Close {
                    scope: CloseScope::AllPositions
                }
            );
            assert!(m.identity.is_empty());
        }
    }

    #[test]
    fn test_no_shape_for_chatter() {
        assert!(first_match("今天行情不错").is_none());
        assert!(first_match("").is_none());
        assert!(first_match("good morning everyone").is_none());
    }
}
