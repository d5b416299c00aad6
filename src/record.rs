//! Bibliography records as the remote service sends and receives them.
//!
//! The wire format is camelCase JSON. Several fields are loosely typed on the
//! wire (`isbn`/`issn` arrive as strings or numbers, `year` sometimes as a
//! string) and are normalised here during deserialization. Timestamps are kept
//! as the raw strings the server sent; [`parse_wire_timestamp`] turns them into
//! instants when a caller actually needs one.

use jiff::civil::{Date, DateTime};
use jiff::tz::TimeZone;
use jiff::Timestamp;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{BibError, Result};

/// Editable fields of a bibliography entry.
///
/// Only `title` and `author` are required. Everything else is optional and
/// omitted from request bodies when blank.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFields {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(
        default,
        deserialize_with = "lenient_year",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub publication: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub source: Option<String>,
    /// Comma-joined keyword string
    #[serde(default, skip_serializing_if = "is_blank")]
    pub keywords: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub language_published: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub language_researched: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub country_of_research: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub language_family: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "is_blank"
    )]
    pub isbn: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "is_blank"
    )]
    pub issn: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub date_of_entry: Option<String>,
}

/// A record under construction, not yet known to the server.
pub type RecordDraft = RecordFields;

impl RecordFields {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            ..Default::default()
        }
    }

    /// Check the required fields before anything is sent.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(BibError::Validation("title cannot be empty".to_string()));
        }
        if self.author.trim().is_empty() {
            return Err(BibError::Validation("author cannot be empty".to_string()));
        }
        Ok(())
    }

    /// JSON body for create/update: only the populated fields.
    pub fn payload(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(BibError::Other(format!(
                "record serialized to non-object JSON: {other}"
            ))),
        }
    }

    /// Individual keywords from the comma-joined keyword string.
    pub fn keyword_list(&self) -> Vec<&str> {
        self.keywords
            .as_deref()
            .map(|k| {
                k.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One bibliography entry as returned by the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BibliographyRecord {
    /// Server-assigned identifier, absent until the record has been created
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: RecordFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl BibliographyRecord {
    /// Wrap a draft that has not been persisted yet.
    pub fn from_draft(draft: RecordDraft) -> Self {
        Self {
            fields: draft,
            ..Default::default()
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }

    /// Creation date parsed from whichever timestamp variant the server used.
    pub fn created_on(&self) -> Option<Date> {
        self.created_at
            .as_deref()
            .and_then(parse_wire_timestamp)
            .map(|ts| ts.to_zoned(TimeZone::UTC).date())
    }
}

/// Records are the same entity iff both carry the same server identifier.
/// Unsaved records are never equal to anything, themselves included.
impl PartialEq for BibliographyRecord {
    fn eq(&self, other: &Self) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Parse the timestamp variants the server emits.
///
/// Accepts RFC 3339 with or without fractional seconds and with `Z` or an
/// offset, date-times without any offset (taken as UTC), and plain dates.
pub fn parse_wire_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = raw.parse::<Timestamp>() {
        return Some(ts);
    }
    if let Ok(dt) = raw.parse::<DateTime>() {
        return dt.to_zoned(TimeZone::UTC).ok().map(|z| z.timestamp());
    }
    if let Ok(date) = raw.parse::<Date>() {
        return date.to_zoned(TimeZone::UTC).ok().map(|z| z.timestamp());
    }
    None
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|s| s.trim().is_empty())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Text(String),
    Int(i64),
    Float(f64),
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Loose> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(Loose::Text(s)) if s.trim().is_empty() => None,
        Some(Loose::Text(s)) => Some(s),
        Some(Loose::Int(n)) => Some(n.to_string()),
        Some(Loose::Float(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Some((f as i64).to_string())
        }
        Some(Loose::Float(f)) => Some(f.to_string()),
        None => None,
    })
}

/// Numbers and numeric strings decode as a year. Anything else ("n.d.",
/// "forthcoming", fractions, out-of-range numbers) decodes as no year, so one
/// odd record cannot fail a whole page.
fn lenient_year<'de, D>(deserializer: D) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Loose> = Option::deserialize(deserializer)?;
    let year = match value {
        None => None,
        Some(Loose::Text(s)) if s.trim().is_empty() => None,
        Some(Loose::Text(s)) => {
            let parsed = s.trim().parse::<i32>().ok();
            if parsed.is_none() {
                tracing::debug!(year = %s, "ignoring unparseable year");
            }
            parsed
        }
        Some(Loose::Int(n)) => {
            let parsed = i32::try_from(n).ok();
            if parsed.is_none() {
                tracing::debug!(year = n, "ignoring out-of-range year");
            }
            parsed
        }
        Some(Loose::Float(f)) if f.fract() == 0.0 && f.abs() <= i32::MAX as f64 => Some(f as i32),
        Some(Loose::Float(f)) => {
            tracing::debug!(year = f, "ignoring fractional year");
            None
        }
    };
    Ok(year)
}
