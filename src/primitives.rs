//! Small value types shared by the element tree, the parser and the writer.

use crate::errors::AtomError;
use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, Utc};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// A URI as it appeared in the document, with surrounding whitespace removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AtomUri(String);

impl AtomUri {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.len() == value.len() {
            AtomUri(value)
        } else {
            AtomUri(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolves this URI against `base`. An absolute URI, or one that cannot
    /// be joined, comes back unchanged.
    pub fn resolve(&self, base: Option<&AtomUri>) -> String {
        if let Ok(absolute) = Url::parse(&self.0) {
            return absolute.to_string();
        }
        match base.and_then(|b| Url::parse(b.as_str()).ok()) {
            Some(base) => base
                .join(&self.0)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| self.0.clone()),
            None => self.0.clone(),
        }
    }
}

impl fmt::Display for AtomUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AtomUri {
    fn from(value: &str) -> Self {
        AtomUri::new(value)
    }
}

impl From<String> for AtomUri {
    fn from(value: String) -> Self {
        AtomUri::new(value)
    }
}

/// The `type` attribute of a text construct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TextKind {
    #[default]
    Text,
    Html,
    Xhtml,
}

impl TextKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TextKind::Text => "text",
            TextKind::Html => "html",
            TextKind::Xhtml => "xhtml",
        }
    }
}

impl FromStr for TextKind {
    type Err = AtomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(TextKind::Text),
            "html" => Ok(TextKind::Html),
            "xhtml" => Ok(TextKind::Xhtml),
            _ => Err(AtomError::malformed(
                "type",
                s,
                "expected one of text, html, xhtml",
            )),
        }
    }
}

/// The GData batch operation vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BatchOperationType {
    #[default]
    Default,
    Query,
    Insert,
    Update,
    Delete,
}

impl BatchOperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchOperationType::Default => "default",
            BatchOperationType::Query => "query",
            BatchOperationType::Insert => "insert",
            BatchOperationType::Update => "update",
            BatchOperationType::Delete => "delete",
        }
    }
}

impl FromStr for BatchOperationType {
    type Err = AtomError;

    /// Case-insensitive; anything outside the vocabulary is an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(BatchOperationType::Default),
            "query" => Ok(BatchOperationType::Query),
            "insert" => Ok(BatchOperationType::Insert),
            "update" => Ok(BatchOperationType::Update),
            "delete" => Ok(BatchOperationType::Delete),
            _ => Err(AtomError::UnknownBatchOperation(s.to_string())),
        }
    }
}

impl fmt::Display for BatchOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the nested `batch:errors` list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchError {
    pub error_type: Option<String>,
    pub reason: Option<String>,
    pub field: Option<String>,
}

/// `batch:status`: result of one batch operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStatus {
    pub code: Option<i32>,
    pub reason: Option<String>,
    pub content_type: Option<String>,
    pub errors: Vec<BatchError>,
}

impl BatchStatus {
    pub fn is_failure(&self) -> bool {
        self.code.is_some_and(|code| code >= 400)
    }
}

/// `batch:interrupt`: the server stopped processing the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchInterrupt {
    pub reason: Option<String>,
    pub successes: i32,
    pub failures: i32,
    pub parsed: i32,
    pub unprocessed: i32,
}

/// Batch metadata carried by an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchEntryData {
    pub id: Option<String>,
    pub operation: Option<BatchOperationType>,
    pub status: Option<BatchStatus>,
    pub interrupt: Option<BatchInterrupt>,
}

/// Batch metadata carried by a feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchFeedData {
    pub operation: BatchOperationType,
}

/// Locale-invariant integer parsing; failure is a hard error.
pub(crate) fn parse_int<T>(field: &'static str, value: &str) -> Result<T, AtomError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| AtomError::malformed(field, value, e))
}

/// Reads an Atom date construct. A value without an offset is taken as UTC.
pub fn parse_timestamp(
    field: &'static str,
    value: &str,
) -> Result<DateTime<FixedOffset>, AtomError> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed);
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().fixed_offset())
        .map_err(|e| AtomError::malformed(field, value, e))
}

pub fn format_timestamp(value: &DateTime<FixedOffset>) -> String {
    if value.offset().local_minus_utc() == 0 {
        value
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::AutoSi, true)
    } else {
        value.to_rfc3339_opts(SecondsFormat::AutoSi, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_is_trimmed() {
        let uri = AtomUri::new("  http://example.com/feed \n");
        assert_eq!(uri.as_str(), "http://example.com/feed");
    }

    #[test]
    fn test_uri_resolve() {
        let base = AtomUri::new("http://example.com/feeds/");
        assert_eq!(
            AtomUri::new("entry/1").resolve(Some(&base)),
            "http://example.com/feeds/entry/1"
        );
        assert_eq!(
            AtomUri::new("http://other.org/x").resolve(Some(&base)),
            "http://other.org/x"
        );
        assert_eq!(AtomUri::new("entry/1").resolve(None), "entry/1");
    }

    #[test]
    fn test_batch_operation_case_insensitive() {
        assert_eq!(
            "INSERT".parse::<BatchOperationType>().unwrap(),
            BatchOperationType::Insert
        );
        assert_eq!(
            "Delete".parse::<BatchOperationType>().unwrap(),
            BatchOperationType::Delete
        );
        assert!(matches!(
            "merge".parse::<BatchOperationType>(),
            Err(AtomError::UnknownBatchOperation(_))
        ));
    }

    #[test]
    fn test_text_kind() {
        assert_eq!("XHTML".parse::<TextKind>().unwrap(), TextKind::Xhtml);
        assert!("markdown".parse::<TextKind>().is_err());
    }

    #[test]
    fn test_parse_int_is_strict() {
        assert_eq!(parse_int::<i32>("totalResults", " 42 ").unwrap(), 42);
        assert!(parse_int::<u64>("length", "1,024").is_err());
        assert!(parse_int::<u64>("length", "abc").is_err());
    }

    #[test]
    fn test_timestamp_round_trip() {
        let parsed = parse_timestamp("updated", "2006-11-09T18:30:02.125Z").unwrap();
        assert_eq!(format_timestamp(&parsed), "2006-11-09T18:30:02.125Z");

        let offset = parse_timestamp("updated", "2006-11-09T18:30:02+02:00").unwrap();
        assert_eq!(format_timestamp(&offset), "2006-11-09T18:30:02+02:00");

        let naive = parse_timestamp("updated", "2006-11-09T18:30:02").unwrap();
        assert_eq!(format_timestamp(&naive), "2006-11-09T18:30:02Z");

        assert!(parse_timestamp("updated", "yesterday").is_err());
    }

    #[test]
    fn test_batch_status_failure() {
        let ok = BatchStatus {
            code: Some(201),
            ..Default::default()
        };
        let failed = BatchStatus {
            code: Some(404),
            ..Default::default()
        };
        assert!(!ok.is_failure());
        assert!(failed.is_failure());
    }
}
