//! Error types for Tabsplit

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing credentials or unusable configuration. Never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The OCR collaborator could not find the image
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// OCR or LLM call failed or returned unusable data
    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Optimistic-concurrency check failed on a receipt update
    #[error("Receipt {id} was modified concurrently (expected version {expected})")]
    Conflict { id: i64, expected: i64 },

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Machine-checkable error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Extraction,
    Validation,
    State,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Extraction => "extraction",
            Self::Validation => "validation",
            Self::State => "state",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Error {
    /// Category of this error for callers that branch on failure type
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::Encryption(_) => ErrorKind::Configuration,
            Self::DocumentNotFound(_) | Self::Extraction(_) | Self::Http(_) => {
                ErrorKind::Extraction
            }
            Self::Validation(_) | Self::Json(_) => ErrorKind::Validation,
            Self::InvalidState(_) | Self::Conflict { .. } => ErrorKind::State,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Database(_) | Self::Pool(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Structured form for an outer surface (HTTP layer, `--json` CLI output)
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Serializable error payload: a kind plus a human-readable message
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            Error::Configuration("no key".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            Error::DocumentNotFound("b/k".into()).kind(),
            ErrorKind::Extraction
        );
        assert_eq!(
            Error::Conflict { id: 1, expected: 2 }.kind(),
            ErrorKind::State
        );
        assert_eq!(Error::Validation("x".into()).kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_error_report_serializes() {
        let report = Error::InvalidState("negative share".into()).to_report();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kind"], "state");
        assert_eq!(json["message"], "Invalid state: negative share");
    }
}
