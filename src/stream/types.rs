// src/stream/types.rs
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Wire format of `created_at`, always UTC.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Placeholder written when a message carries no sentiment annotation.
pub const NIL_SENTIMENT: &str = "NIL";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Bullish,
    Bearish,
    /// Any other label the API sends, kept verbatim.
    Other(String),
}

impl Sentiment {
    pub fn from_label(label: &str) -> Self {
        match label {
            "Bullish" => Self::Bullish,
            "Bearish" => Self::Bearish,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Bullish => "Bullish",
            Self::Bearish => "Bearish",
            Self::Other(label) => label,
        }
    }
}

/// Output label for an optional sentiment ("NIL" when absent).
pub fn sentiment_tag(s: Option<&Sentiment>) -> &str {
    s.map(Sentiment::as_str).unwrap_or(NIL_SENTIMENT)
}

/// One normalized stream message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message {
    pub message_id: u64,
    pub created_at: String,
    /// Calendar day of `created_at` in UTC; only used for window filtering.
    pub date: NaiveDate,
    pub user_name: String,
    pub user_id: u64,
    pub sentiment: Option<Sentiment>,
    pub text: String,
}

/// Inclusive calendar window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, thiserror::Error)]
#[error("start date {start} is after end date {end}")]
pub struct InvalidWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidWindow> {
        if start > end {
            return Err(InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, d: NaiveDate) -> bool {
        self.start <= d && d <= self.end
    }
}

/// Opaque "since" token used to ask for the next older page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        // The API sends integers, but nothing forbids strings.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Text(String),
        }
        Ok(match Raw::deserialize(d)? {
            Raw::Int(n) => Cursor(n.to_string()),
            Raw::Text(s) => Cursor(s),
        })
    }
}

/// Key must be present, value may be `null`.
///
/// A plain `Option<T>` field would also accept a missing key; routing it
/// through `deserialize_with` turns a missing key into a decode error.
fn required_nullable<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d)
}

/// One decoded page of `GET /streams/symbol/{SYMBOL}.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub messages: Vec<RawMessage>,
    pub cursor: PageCursor,
}

impl Page {
    /// Cursor for the next older page, `None` once history is exhausted.
    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.cursor.since.as_ref()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageCursor {
    #[serde(deserialize_with = "required_nullable")]
    pub since: Option<Cursor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    pub id: u64,
    pub body: String,
    pub created_at: String,
    pub user: RawUser,
    #[serde(deserialize_with = "required_nullable")]
    pub entities: Option<RawEntities>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    pub id: u64,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEntities {
    #[serde(deserialize_with = "required_nullable")]
    pub sentiment: Option<RawSentiment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSentiment {
    /// `null` is read as "no annotation"; a missing key is still a shape error.
    #[serde(deserialize_with = "required_nullable")]
    pub basic: Option<String>,
}

/// Messages gathered so far in one run, in fetch order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    records: Vec<Message>,
    min_date: Option<NaiveDate>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, m: Message) {
        self.min_date = Some(match self.min_date {
            Some(d) => d.min(m.date),
            None => m.date,
        });
        self.records.push(m);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Oldest calendar day seen, `None` while empty.
    pub fn min_date(&self) -> Option<NaiveDate> {
        self.min_date
    }

    /// True while the oldest record has not yet gone past `start`.
    pub fn needs_older_than(&self, start: NaiveDate) -> bool {
        self.min_date.map_or(true, |d| d >= start)
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.min_date = None;
    }

    pub fn records(&self) -> &[Message] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Message> {
        self.records
    }
}
