//! Error type shared by the parser, the element tree and the writer.
//!
//! Public parse entry points wrap every failure in
//! [`AtomError::ParsingFailed`]; the original cause stays reachable through
//! `source()`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtomError {
    #[error("I/O Error: {1} - {0}")]
    Io(#[source] std::io::Error, String),

    #[error("XML Error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON Serialization Error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),

    #[error("Malformed value for {field}: {value:?} ({reason})")]
    MalformedValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unknown batch operation type: {0:?}")]
    UnknownBatchOperation(String),

    #[error("Unexpected end of document inside <{0}>")]
    UnexpectedEof(String),

    #[error("The entry is already part of this collection")]
    EntryAlreadyInCollection,

    #[error("Parsing failed")]
    ParsingFailed(#[source] Box<AtomError>),

    #[error("Serialization Error: {0}")]
    Serialization(String),
}

impl AtomError {
    pub(crate) fn malformed(
        field: &'static str,
        value: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        AtomError::MalformedValue {
            field,
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<std::io::Error> for AtomError {
    fn from(err: std::io::Error) -> Self {
        AtomError::Io(err, "IO operation failed".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_parsing_failed_keeps_cause() {
        let inner = AtomError::UnknownBatchOperation("merge".to_string());
        let outer = AtomError::ParsingFailed(Box::new(inner));

        assert_eq!(outer.to_string(), "Parsing failed");
        let source = outer.source().expect("wrapped cause");
        assert!(source.to_string().contains("merge"));
    }

    #[test]
    fn test_malformed_message() {
        let err = AtomError::malformed("length", "12a", "invalid digit found in string");
        assert_eq!(
            err.to_string(),
            "Malformed value for length: \"12a\" (invalid digit found in string)"
        );
    }
}
