//! Expiry descriptors.
//!
//! An expiry is kept as written until a timestamp is available to date it:
//! - `Absolute`: a full date (`260131`, `20260131`, `2026-01-31`)
//! - `MonthDay`: a partial date (`1/31`, `1月31日`, `2月13`)
//! - `Relative`: a term such as `today`, `本周`, `next week`

use crate::error::CoreError;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Relative expiry vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelativeTerm {
    Today,
    ThisWeek,
    NextWeek,
}

impl RelativeTerm {
    /// Look up a relative term, English matched case-insensitively.
    pub fn lookup(text: &str) -> Option<Self> {
        let lowered = text.trim().to_lowercase();
        match lowered.as_str() {
            "today" | "今天" | "今日" => Some(Self::Today),
            "this week" | "本周" | "这周" | "当周" | "本週" | "這週" => Some(Self::ThisWeek),
            "next week" | "下周" | "下週" => Some(Self::NextWeek),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::ThisWeek => "this week",
            Self::NextWeek => "next week",
        }
    }
}

/// As-parsed expiration expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExpiryDescriptor {
    /// Fully dated expiry.
    Absolute(NaiveDate),
    /// Month and day; the year comes from the message time.
    MonthDay { month: u32, day: u32 },
    /// Relative term, with the text it was written as.
    Relative { term: RelativeTerm, text: String },
}

impl ExpiryDescriptor {
    pub fn relative(term: RelativeTerm) -> Self {
        Self::Relative {
            term,
            text: term.as_str().to_string(),
        }
    }

    /// Whether dating this descriptor needs an as-of time.
    pub fn needs_as_of(&self) -> bool {
        !matches!(self, Self::Absolute(_))
    }

    /// Resolve to a calendar date.
    ///
    /// A month/day takes the as-of year, moved forward one year when the
    /// month is earlier than the as-of month. "This week" is the Friday on or
    /// after `as_of`; a Friday at or past `cutoff_hour` rolls to the next one.
    /// "Next week" is seven days after that.
    pub fn resolve(&self, as_of: Option<NaiveDateTime>, cutoff_hour: u32) -> Option<NaiveDate> {
        match self {
            Self::Absolute(date) => Some(*date),
            Self::MonthDay { month, day } => {
                let as_of = as_of?;
                let mut year = as_of.year();
                if *month < as_of.month() {
                    year += 1;
                }
                NaiveDate::from_ymd_opt(year, *month, *day)
            }
            Self::Relative { term, .. } => {
                let as_of = as_of?;
                match term {
                    RelativeTerm::Today => Some(as_of.date()),
                    RelativeTerm::ThisWeek => Some(week_friday(as_of, cutoff_hour)),
                    RelativeTerm::NextWeek => {
                        Some(week_friday(as_of, cutoff_hour) + Duration::days(7))
                    }
                }
            }
        }
    }
}

fn week_friday(as_of: NaiveDateTime, cutoff_hour: u32) -> NaiveDate {
    let today = as_of.date();
    let from_monday = today.weekday().num_days_from_monday() as i64;
    let friday = Weekday::Fri.num_days_from_monday() as i64;
    let mut ahead = (friday - from_monday).rem_euclid(7);
    if ahead == 0 && as_of.hour() >= cutoff_hour {
        ahead = 7;
    }
    today + Duration::days(ahead)
}

/// Symbols carry a two-digit year read back as 20yy.
pub(crate) fn is_symbol_year(date: &NaiveDate) -> bool {
    (2000..=2099).contains(&date.year())
}

impl fmt::Display for ExpiryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute(date) => write!(f, "{}", date.format("%y%m%d")),
            Self::MonthDay { month, day } => write!(f, "{month}/{day}"),
            Self::Relative { text, .. } => write!(f, "{text}"),
        }
    }
}

impl FromStr for ExpiryDescriptor {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if let Some(term) = RelativeTerm::lookup(text) {
            return Ok(Self::Relative {
                term,
                text: text.to_string(),
            });
        }

        let invalid = || CoreError::InvalidExpiry(text.to_string());

        if text.chars().all(|c| c.is_ascii_digit()) {
            let date = match text.len() {
                6 => NaiveDate::parse_from_str(&format!("20{text}"), "%Y%m%d"),
                8 => NaiveDate::parse_from_str(text, "%Y%m%d"),
                _ => return Err(invalid()),
            };
            return date
                .ok()
                .filter(is_symbol_year)
                .map(Self::Absolute)
                .ok_or_else(invalid);
        }

        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            if !is_symbol_year(&date) {
                return Err(invalid());
            }
            return Ok(Self::Absolute(date));
        }

        let (month, day) = if let Some((m, d)) = text.split_once('/') {
            (m, d)
        } else if let Some((m, d)) = text.split_once('月') {
            (m, d.trim_end_matches(['日', '号']))
        } else {
            return Err(invalid());
        };

        let month: u32 = month.trim().parse().map_err(|_| invalid())?;
        let day: u32 = day.trim().parse().map_err(|_| invalid())?;
        // Leap day is valid in some year, so check against 2000.
        if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
            return Err(invalid());
        }
        Ok(Self::MonthDay { month, day })
    }
}

impl TryFrom<String> for ExpiryDescriptor {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExpiryDescriptor> for String {
    fn from(value: ExpiryDescriptor) -> Self {
        value.to_string()
    }
}
