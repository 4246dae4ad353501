//! Error types for data operations
//!
//! Provides unified error handling for ingestion, cache lookups and export.

use crate::types::DatasetKey;
use thiserror::Error;

/// Errors that can occur during data operations
#[derive(Error, Debug)]
pub enum DataError {
    /// Unknown or expired dataset key; the dataset must be ingested again
    #[error("Dataset not found: {0}")]
    NotFound(DatasetKey),

    /// IO error from std::io
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error from serde_json
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Source is too large to ingest
    #[error("File too large: {size_mb}MB (max {max_mb}MB)")]
    TooLarge { size_mb: u64, max_mb: usize },

    /// Too many rows to ingest
    #[error("Too many rows: {rows} (max {max_rows})")]
    TooManyRows { rows: usize, max_rows: usize },

    /// Source is empty
    #[error("Empty file")]
    EmptyFile,

    /// No columns found in the header
    #[error("No columns found")]
    NoColumns,

    /// Header repeats a column name
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    /// Cell coordinate is not of the form "row,col"
    #[error("Invalid cell coordinate: {0:?}")]
    InvalidCoord(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for data operations
pub type DataResult<T> = Result<T, DataError>;

impl DataError {
    /// Whether the caller supplied something malformed (as opposed to a missing dataset or IO)
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            DataError::Json(_)
                | DataError::TooLarge { .. }
                | DataError::TooManyRows { .. }
                | DataError::EmptyFile
                | DataError::NoColumns
                | DataError::DuplicateColumn(_)
                | DataError::InvalidCoord(_)
                | DataError::InvalidData(_)
        )
    }
}

impl From<String> for DataError {
    fn from(s: String) -> Self {
        DataError::InvalidData(s)
    }
}

impl From<&str> for DataError {
    fn from(s: &str) -> Self {
        DataError::InvalidData(s.to_string())
    }
}
