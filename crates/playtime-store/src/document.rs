//! The playtime document
//!
//! On disk the document is plain JSON:
//!
//! ```json
//! {
//!   "2025-12-25": {
//!     "ELDEN RING": { "total": 3661, "last_open": "2025-12-25 20:00:00", "last_close": "2025-12-25 21:01:01" }
//!   }
//! }
//! ```
//!
//! Loading classifies every day bucket and every game record as well-formed
//! or malformed. Malformed values are kept verbatim so a save never drops
//! data the loader did not understand.

use chrono::{NaiveDate, NaiveDateTime};
use playtime_util::{DATETIME_FORMAT, format_date, parse_naive_datetime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::StoreResult;

const TOTAL: &str = "total";
const LAST_OPEN: &str = "last_open";
const LAST_CLOSE: &str = "last_close";

/// Aggregate playtime for one game on one day
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyGameRecord {
    /// Seconds played; only ever grows
    pub total: u64,

    /// Start of the most recently completed session
    pub last_open: Option<NaiveDateTime>,

    /// End of the most recently completed session
    pub last_close: Option<NaiveDateTime>,

    /// Fields this version does not know about, written back untouched
    pub extra: Map<String, Value>,
}

impl DailyGameRecord {
    /// Validate a raw JSON record.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let Value::Object(fields) = value else {
            return Err(format!("expected an object, found {}", kind_of(value)));
        };

        let total = match fields.get(TOTAL) {
            Some(total) => total
                .as_u64()
                .ok_or_else(|| format!("'total' is not a non-negative integer: {}", total))?,
            None => return Err("missing 'total'".to_string()),
        };

        let last_open = parse_timestamp_field(fields, LAST_OPEN)?;
        let last_close = parse_timestamp_field(fields, LAST_CLOSE)?;

        let extra = fields
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), TOTAL | LAST_OPEN | LAST_CLOSE))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            total,
            last_open,
            last_close,
            extra,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut fields = Map::new();
        fields.insert(TOTAL.into(), Value::from(self.total));
        fields.insert(LAST_OPEN.into(), timestamp_value(self.last_open));
        fields.insert(LAST_CLOSE.into(), timestamp_value(self.last_close));
        for (k, v) in &self.extra {
            fields.insert(k.clone(), v.clone());
        }
        Value::Object(fields)
    }

    /// Fold one completed session into this record.
    pub fn add_session(&mut self, seconds: u64, opened: NaiveDateTime, closed: NaiveDateTime) {
        self.total = self.total.saturating_add(seconds);
        self.last_open = Some(opened);
        self.last_close = Some(closed);
    }
}

fn parse_timestamp_field(
    fields: &Map<String, Value>,
    key: &str,
) -> Result<Option<NaiveDateTime>, String> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => parse_naive_datetime(s)
            .map(Some)
            .ok_or_else(|| format!("'{}' is not '{}': {:?}", key, DATETIME_FORMAT, s)),
        Some(other) => Err(format!("'{}' must be a string or null, found {}", key, kind_of(other))),
    }
}

fn timestamp_value(ts: Option<NaiveDateTime>) -> Value {
    match ts {
        Some(ts) => Value::String(ts.format(DATETIME_FORMAT).to_string()),
        None => Value::Null,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A game slot inside a day bucket
#[derive(Debug, Clone, PartialEq)]
pub enum GameEntry {
    Record(DailyGameRecord),
    Malformed(Value),
}

impl GameEntry {
    pub fn as_record(&self) -> Option<&DailyGameRecord> {
        match self {
            Self::Record(record) => Some(record),
            Self::Malformed(_) => None,
        }
    }
}

/// A date bucket
#[derive(Debug, Clone, PartialEq)]
pub enum DayEntry {
    Games(BTreeMap<String, GameEntry>),
    Malformed(Value),
}

/// Something the loader could not interpret; kept verbatim in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub date: Option<String>,
    pub game: Option<String>,
    pub reason: String,
}

impl std::fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.date, &self.game) {
            (Some(date), Some(game)) => write!(f, "{} / {}: {}", date, game, self.reason),
            (Some(date), None) => write!(f, "{}: {}", date, self.reason),
            _ => write!(f, "{}", self.reason),
        }
    }
}

/// Date -> game -> record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaytimeDocument {
    days: BTreeMap<String, DayEntry>,
}

impl PlaytimeDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a parsed JSON value.
    ///
    /// A top-level value that is not an object cannot be kept and yields an
    /// empty document.
    pub fn from_value(value: Value) -> (Self, Vec<SchemaIssue>) {
        let mut issues = Vec::new();

        let Value::Object(top) = value else {
            issues.push(SchemaIssue {
                date: None,
                game: None,
                reason: format!("document root is {}, not an object", kind_of(&value)),
            });
            return (Self::new(), issues);
        };

        let mut days = BTreeMap::new();
        for (date, day) in top {
            let entry = match day {
                Value::Object(games) => {
                    let mut entries = BTreeMap::new();
                    for (game, raw) in games {
                        let entry = match DailyGameRecord::from_value(&raw) {
                            Ok(record) => GameEntry::Record(record),
                            Err(reason) => {
                                issues.push(SchemaIssue {
                                    date: Some(date.clone()),
                                    game: Some(game.clone()),
                                    reason,
                                });
                                GameEntry::Malformed(raw)
                            }
                        };
                        entries.insert(game, entry);
                    }
                    DayEntry::Games(entries)
                }
                other => {
                    issues.push(SchemaIssue {
                        date: Some(date.clone()),
                        game: None,
                        reason: format!("day bucket is {}, not an object", kind_of(&other)),
                    });
                    DayEntry::Malformed(other)
                }
            };
            days.insert(date, entry);
        }

        (Self { days }, issues)
    }

    pub fn to_value(&self) -> Value {
        let top = self
            .days
            .iter()
            .map(|(date, day)| {
                let value = match day {
                    DayEntry::Games(games) => Value::Object(
                        games
                            .iter()
                            .map(|(game, entry)| {
                                let value = match entry {
                                    GameEntry::Record(record) => record.to_value(),
                                    GameEntry::Malformed(raw) => raw.clone(),
                                };
                                (game.clone(), value)
                            })
                            .collect(),
                    ),
                    DayEntry::Malformed(raw) => raw.clone(),
                };
                (date.clone(), value)
            })
            .collect();
        Value::Object(top)
    }

    /// Parse document text. Fails only on invalid JSON.
    pub fn from_json_str(text: &str) -> StoreResult<(Self, Vec<SchemaIssue>)> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(value))
    }

    /// Pretty-printed JSON with two-space indentation; non-ASCII is kept as-is.
    pub fn to_json_pretty(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Iterate date buckets in ascending key order.
    pub fn days(&self) -> impl Iterator<Item = (&str, &DayEntry)> {
        self.days.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn day(&self, date: &str) -> Option<&DayEntry> {
        self.days.get(date)
    }

    /// Well-formed record for (date, game), if any.
    pub fn record(&self, date: &str, game: &str) -> Option<&DailyGameRecord> {
        match self.days.get(date)? {
            DayEntry::Games(games) => games.get(game)?.as_record(),
            DayEntry::Malformed(_) => None,
        }
    }

    /// Merge a completed session into the (date, game) record, creating the
    /// bucket and record on first use.
    ///
    /// A malformed bucket or record in that slot is replaced; the discarded
    /// value is returned so the caller can report it.
    pub fn add_session(
        &mut self,
        date: NaiveDate,
        game: &str,
        seconds: u64,
        opened: NaiveDateTime,
        closed: NaiveDateTime,
    ) -> (DailyGameRecord, Option<Value>) {
        let mut discarded = None;

        let day = self
            .days
            .entry(format_date(date))
            .or_insert_with(|| DayEntry::Games(BTreeMap::new()));
        if let DayEntry::Malformed(raw) = day {
            discarded = Some(std::mem::take(raw));
            *day = DayEntry::Games(BTreeMap::new());
        }
        let DayEntry::Games(games) = day else {
            unreachable!("day bucket was just normalized");
        };

        let slot = games
            .entry(game.to_string())
            .or_insert_with(|| GameEntry::Record(DailyGameRecord::default()));
        if let GameEntry::Malformed(raw) = slot {
            discarded = Some(std::mem::take(raw));
            *slot = GameEntry::Record(DailyGameRecord::default());
        }
        let GameEntry::Record(record) = slot else {
            unreachable!("game slot was just normalized");
        };

        record.add_session(seconds, opened, closed);
        (record.clone(), discarded)
    }
}

impl Serialize for PlaytimeDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PlaytimeDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(value).0)
    }
}
