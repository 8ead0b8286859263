//! Error types for the cbcnote-core library.

use thiserror::Error;

/// Main error type for the cbcnote library.
#[derive(Error, Debug)]
pub enum CbcnoteError {
    /// Lab text extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to lab text extraction.
///
/// Unmatched labels, unknown synonyms and malformed numbers are not errors;
/// they are omitted from the bundle. Only a failure of the extraction pass
/// itself surfaces here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// An extractor failed unexpectedly; no partial bundle is produced.
    #[error("lab text parsing failed: {0}")]
    Internal(String),
}

/// Result type for the cbcnote library.
pub type Result<T> = std::result::Result<T, CbcnoteError>;
