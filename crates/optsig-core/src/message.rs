//! Incoming chat message records.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Adjacency of a message to its neighbours in a visual thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupPosition {
    #[default]
    Single,
    First,
    Middle,
    Last,
}

impl GroupPosition {
    /// `first` and `single` open a thread.
    #[inline]
    pub fn starts_thread(&self) -> bool {
        matches!(self, Self::Single | Self::First)
    }

    /// `middle` and `last` continue a thread opened earlier.
    #[inline]
    pub fn continues_thread(&self) -> bool {
        !self.starts_thread()
    }
}

impl fmt::Display for GroupPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::First => write!(f, "first"),
            Self::Middle => write!(f, "middle"),
            Self::Last => write!(f, "last"),
        }
    }
}

/// One chat message as delivered by the acquisition side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    /// Best-effort message time; `None` when the source gave nothing usable.
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        serialize_with = "serialize_timestamp"
    )]
    pub timestamp: Option<NaiveDateTime>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_text: Option<String>,
    #[serde(default)]
    pub group_position: GroupPosition,
    /// Earlier texts of the same thread, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<String>,
}

impl MessageRecord {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp: None,
            text: text.into(),
            quoted_text: None,
            group_position: GroupPosition::Single,
            history: Vec::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_quote(mut self, quoted: impl Into<String>) -> Self {
        self.quoted_text = Some(quoted.into());
        self
    }

    pub fn with_group_position(mut self, position: GroupPosition) -> Self {
        self.group_position = position;
        self
    }

    pub fn with_history(mut self, history: Vec<String>) -> Self {
        self.history = history;
        self
    }
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%b %d, %Y %I:%M %p",
    "%b %d, %Y %I:%M:%S %p",
];

const SERIALIZE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Parse a message timestamp in any of the forms sources are known to emit.
///
/// RFC 3339 values keep their local wall-clock time. Returns `None` instead
/// of failing on unrecognised input.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn serialize_timestamp<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(ts) => serializer.serialize_str(&ts.format(SERIALIZE_FORMAT).to_string()),
        None => serializer.serialize_none(),
    }
}
