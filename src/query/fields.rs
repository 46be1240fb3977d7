//! The atomic condition vocabulary and its per-field serialization rules.
//!
//! Each condition maps to one service-facing key (`keyword`,
//! `conceptUri`, `dateStart`, ...). A few fields carry a companion key
//! alongside the value: `keywordLoc` for keywords and
//! `categoryIncludeSub` for categories.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::error::{QueryError, QueryResult};

/// Where keyword matching should look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordLoc {
    Body,
    Title,
    BodyTitle,
}

impl KeywordLoc {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordLoc::Body => "body",
            KeywordLoc::Title => "title",
            KeywordLoc::BodyTitle => "body,title",
        }
    }

    pub(crate) fn from_str(s: &str) -> QueryResult<Self> {
        match s {
            "body" => Ok(KeywordLoc::Body),
            "title" => Ok(KeywordLoc::Title),
            "body,title" => Ok(KeywordLoc::BodyTitle),
            other => Err(QueryError::MalformedQuery(format!(
                "unknown keywordLoc value '{other}'"
            ))),
        }
    }
}

/// A date supplied either as an already-formatted `YYYY-MM-DD` string or
/// as a calendar date value. Text is validated when the query compiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateArg {
    Date(NaiveDate),
    Text(String),
}

impl DateArg {
    pub(crate) fn resolve(&self) -> QueryResult<NaiveDate> {
        match self {
            DateArg::Date(d) => Ok(*d),
            DateArg::Text(s) => parse_date(s),
        }
    }
}

impl From<NaiveDate> for DateArg {
    fn from(d: NaiveDate) -> Self {
        DateArg::Date(d)
    }
}

impl From<&str> for DateArg {
    fn from(s: &str) -> Self {
        DateArg::Text(s.to_string())
    }
}

impl From<String> for DateArg {
    fn from(s: String) -> Self {
        DateArg::Text(s)
    }
}

/// Parse a `YYYY-MM-DD` string into a calendar date.
pub fn parse_date(input: &str) -> QueryResult<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| QueryError::InvalidDate {
        input: input.to_string(),
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// A single named filter condition from the fixed vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Keyword {
        value: String,
        loc: Option<KeywordLoc>,
    },
    ConceptUri(String),
    CategoryUri {
        uri: String,
        include_sub: Option<bool>,
    },
    SourceUri(String),
    SourceLocationUri(String),
    SourceGroupUri(String),
    LocationUri(String),
    Lang(String),
    DateStart(NaiveDate),
    DateEnd(NaiveDate),
    DateMention(NaiveDate),
    DateMentionStart(NaiveDate),
    DateMentionEnd(NaiveDate),
    MinArticlesInEvent(u32),
    MaxArticlesInEvent(u32),
}

impl Condition {
    /// The primary service-facing key for this condition.
    pub fn field_name(&self) -> &'static str {
        match self {
            Condition::Keyword { .. } => "keyword",
            Condition::ConceptUri(_) => "conceptUri",
            Condition::CategoryUri { .. } => "categoryUri",
            Condition::SourceUri(_) => "sourceUri",
            Condition::SourceLocationUri(_) => "sourceLocationUri",
            Condition::SourceGroupUri(_) => "sourceGroupUri",
            Condition::LocationUri(_) => "locationUri",
            Condition::Lang(_) => "lang",
            Condition::DateStart(_) => "dateStart",
            Condition::DateEnd(_) => "dateEnd",
            Condition::DateMention(_) => "dateMention",
            Condition::DateMentionStart(_) => "dateMentionStart",
            Condition::DateMentionEnd(_) => "dateMentionEnd",
            Condition::MinArticlesInEvent(_) => "minArticlesInEvent",
            Condition::MaxArticlesInEvent(_) => "maxArticlesInEvent",
        }
    }

    /// Write this condition's key(s) into a serialized clause object.
    pub(crate) fn write_into(&self, map: &mut Map<String, Value>) {
        let name = self.field_name().to_string();
        match self {
            Condition::Keyword { value, loc } => {
                map.insert(name, Value::String(value.clone()));
                if let Some(loc) = loc {
                    map.insert("keywordLoc".to_string(), Value::String(loc.as_str().into()));
                }
            }
            Condition::CategoryUri { uri, include_sub } => {
                map.insert(name, Value::String(uri.clone()));
                if let Some(include_sub) = include_sub {
                    map.insert("categoryIncludeSub".to_string(), Value::Bool(*include_sub));
                }
            }
            Condition::ConceptUri(v)
            | Condition::SourceUri(v)
            | Condition::SourceLocationUri(v)
            | Condition::SourceGroupUri(v)
            | Condition::LocationUri(v)
            | Condition::Lang(v) => {
                map.insert(name, Value::String(v.clone()));
            }
            Condition::DateStart(d)
            | Condition::DateEnd(d)
            | Condition::DateMention(d)
            | Condition::DateMentionStart(d)
            | Condition::DateMentionEnd(d) => {
                map.insert(name, Value::String(format_date(*d)));
            }
            Condition::MinArticlesInEvent(n) | Condition::MaxArticlesInEvent(n) => {
                map.insert(name, Value::Number((*n).into()));
            }
        }
    }

    /// Serialize as a standalone one-condition clause object.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        self.write_into(&mut map);
        Value::Object(map)
    }

    /// Reconstruct a condition from a serialized key and scalar value.
    ///
    /// Companion keys (`keywordLoc`, `categoryIncludeSub`) are attached
    /// by the clause parser, not here.
    pub(crate) fn from_scalar(key: &str, value: &Value) -> QueryResult<Self> {
        let as_string = |v: &Value| -> QueryResult<String> {
            v.as_str().map(str::to_string).ok_or_else(|| {
                QueryError::MalformedQuery(format!("field '{key}' expects a string, got {v}"))
            })
        };
        let as_date = |v: &Value| -> QueryResult<NaiveDate> {
            let s = v.as_str().ok_or_else(|| {
                QueryError::MalformedQuery(format!("field '{key}' expects a date string, got {v}"))
            })?;
            parse_date(s)
        };
        let as_count = |v: &Value| -> QueryResult<u32> {
            v.as_u64().and_then(|n| u32::try_from(n).ok()).ok_or_else(|| {
                QueryError::MalformedQuery(format!(
                    "field '{key}' expects a non-negative integer, got {v}"
                ))
            })
        };

        match key {
            "keyword" => Ok(Condition::Keyword {
                value: as_string(value)?,
                loc: None,
            }),
            "conceptUri" => Ok(Condition::ConceptUri(as_string(value)?)),
            "categoryUri" => Ok(Condition::CategoryUri {
                uri: as_string(value)?,
                include_sub: None,
            }),
            "sourceUri" => Ok(Condition::SourceUri(as_string(value)?)),
            "sourceLocationUri" => Ok(Condition::SourceLocationUri(as_string(value)?)),
            "sourceGroupUri" => Ok(Condition::SourceGroupUri(as_string(value)?)),
            "locationUri" => Ok(Condition::LocationUri(as_string(value)?)),
            "lang" => Ok(Condition::Lang(as_string(value)?)),
            "dateStart" => Ok(Condition::DateStart(as_date(value)?)),
            "dateEnd" => Ok(Condition::DateEnd(as_date(value)?)),
            "dateMention" => Ok(Condition::DateMention(as_date(value)?)),
            "dateMentionStart" => Ok(Condition::DateMentionStart(as_date(value)?)),
            "dateMentionEnd" => Ok(Condition::DateMentionEnd(as_date(value)?)),
            "minArticlesInEvent" => Ok(Condition::MinArticlesInEvent(as_count(value)?)),
            "maxArticlesInEvent" => Ok(Condition::MaxArticlesInEvent(as_count(value)?)),
            other => Err(QueryError::MalformedQuery(format!(
                "unknown query field '{other}'"
            ))),
        }
    }

    /// Whether `key` is a companion key rather than a condition field.
    pub(crate) fn is_companion_key(key: &str) -> bool {
        matches!(key, "keywordLoc" | "categoryIncludeSub")
    }
}
