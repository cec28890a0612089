use std::path::PathBuf;

use thiserror::Error;

/// Source-level failures. Any of these aborts extraction for that source and
/// yields no records.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed document {origin}: {message}")]
    DocumentParse { origin: String, message: String },
    #[error("document {origin} has no <{element}> element")]
    MissingContainer { origin: String, element: String },
}

impl ExtractError {
    pub(crate) fn parse(origin: impl Into<String>, message: impl ToString) -> Self {
        Self::DocumentParse {
            origin: origin.into(),
            message: message.to_string(),
        }
    }
}

/// Failure to decode a single attribute or text value. Confined to the record
/// that was being read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum XmlValueError {
    #[error("unknown entity `&{0};`")]
    UnknownEntity(String),
    #[error("invalid character reference `&{0};`")]
    InvalidCharRef(String),
    #[error("unterminated entity reference at offset {0}")]
    UnterminatedEntity(usize),
}

/// Errors raised while serializing report rows.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error while writing report: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
