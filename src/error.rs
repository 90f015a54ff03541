//! Error types for reviewdesk.
//!
//! Per-item failures (`Lookup`, `Provider`) are caught by the batch loops and
//! logged; `Storage` failures from the memo cache are never caught and abort
//! the run.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum ReviewDeskError {
    /// Requested entity (group, assignment, profile) is absent.
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Cache record could not be read, decoded or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Classifier reply was not the expected JSON object.
    #[error(transparent)]
    ClassificationFormat(#[from] ClassificationFormatError),

    /// Transport failure or non-success status from a remote service.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Spreadsheet sink rejected a read or write.
    #[error("Sheet error: {0}")]
    Sheet(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Classifier reply that could not be parsed as a JSON object.
///
/// Kept separate from [`ReviewDeskError`] so callers can decide whether to
/// degrade to an empty result or propagate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("classifier reply is not a JSON object ({reason})")]
pub struct ClassificationFormatError {
    /// Why parsing failed.
    pub reason: String,
    /// The raw reply text.
    pub raw: String,
}

pub type Result<T> = std::result::Result<T, ReviewDeskError>;
