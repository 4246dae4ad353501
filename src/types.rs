//! Core types for the dataset workbench.
//!
//! This module defines the table model handed over by ingestion, the
//! descriptor of where a table came from, and the identifiers that scope
//! cached datasets and per-session edits.

use crate::constants::DEFAULT_DELIMITER;
use crate::data::error::{DataError, DataResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque identifier of one ingested table in the dataset cache.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetKey(String);

impl DatasetKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the editing session that owns an overlay.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(owner: impl Into<String>) -> Self {
        Self(owner.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Positional cell coordinate: 0-based row index and 0-based column index.
///
/// Ordered row-major, so a `BTreeMap<CellCoord, _>` can be range-scanned by row.
/// On the wire a coordinate is the string `"{row},{col}"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub row: usize,
    pub col: usize,
}

impl CellCoord {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

impl FromStr for CellCoord {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DataError::InvalidCoord(s.to_string());
        let (row, col) = s.split_once(',').ok_or_else(invalid)?;
        let row = row.trim().parse::<usize>().map_err(|_| invalid())?;
        let col = col.trim().parse::<usize>().map_err(|_| invalid())?;
        Ok(Self { row, col })
    }
}

impl Serialize for CellCoord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CellCoord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Table Model
// ============================================================================

/// One record: column name to cell text. Missing columns read as empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataRow {
    pub cells: HashMap<String, String>,
}

impl DataRow {
    pub fn new(cells: HashMap<String, String>) -> Self {
        Self { cells }
    }

    /// Build a row from `(column, value)` pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value for a column, `""` when the record has no such field
    pub fn get(&self, column: &str) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        self.cells.insert(column.to_string(), value.into());
    }
}

/// A parsed dataset: ordered unique column names plus ordered records.
///
/// Row and column indices are fixed once the table is built. Nothing in the
/// crate mutates a table after ingestion; corrections go through the overlay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<DataRow>,
}

impl Table {
    /// Build a table, rejecting an empty header and duplicate column names
    pub fn new(columns: Vec<String>, rows: Vec<DataRow>) -> DataResult<Self> {
        if columns.is_empty() {
            return Err(DataError::NoColumns);
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(DataError::DuplicateColumn(name.clone()));
            }
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column name at a positional index
    pub fn column_name(&self, col: usize) -> Option<&str> {
        self.columns.get(col).map(String::as_str)
    }

    /// Whether a coordinate addresses a cell of this table
    pub fn contains(&self, coord: CellCoord) -> bool {
        coord.row < self.rows.len() && coord.col < self.columns.len()
    }

    /// Stored value at a coordinate.
    ///
    /// `None` when the coordinate is out of bounds, `Some("")` when the row
    /// simply lacks the field.
    pub fn cell(&self, coord: CellCoord) -> Option<&str> {
        let column = self.columns.get(coord.col)?;
        let row = self.rows.get(coord.row)?;
        Some(row.get(column))
    }
}

// ============================================================================
// Source Descriptor
// ============================================================================

/// Where a dataset was loaded from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataOrigin {
    /// Uploaded from the client's machine
    Upload { filename: String },
    /// Fetched from a remote URL
    Url { url: String },
}

/// Declared kind of the source file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Csv,
    Tsv,
    Other(String),
}

impl FileKind {
    /// Kind and compression flag from a file name, looking through a trailing `.gz`
    pub fn from_filename(filename: &str) -> (Self, bool) {
        let lower = filename.to_lowercase();
        let mut parts = lower.rsplit('.');
        let last = parts.next().unwrap_or_default();
        let has_ext = lower.contains('.');

        let (ext, gzipped) = if has_ext && last == "gz" {
            (parts.next().unwrap_or_default(), true)
        } else if has_ext {
            (last, false)
        } else {
            ("", false)
        };

        let kind = match ext {
            "csv" => FileKind::Csv,
            "tsv" => FileKind::Tsv,
            other => FileKind::Other(other.to_string()),
        };
        (kind, gzipped)
    }

    pub fn is_tabular(&self) -> bool {
        matches!(self, FileKind::Csv | FileKind::Tsv)
    }
}

/// Pass-through metadata about the source of a dataset.
///
/// The core never interprets it beyond choosing the export file name and the
/// default export delimiter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub origin: DataOrigin,
    pub filename: String,
    pub delimiter: char,
    pub gzipped: bool,
    pub kind: FileKind,
}

impl SourceDescriptor {
    /// Descriptor for a local upload
    pub fn for_upload(filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let (kind, gzipped) = FileKind::from_filename(&filename);
        Self {
            origin: DataOrigin::Upload {
                filename: filename.clone(),
            },
            delimiter: default_delimiter_for(&kind),
            filename,
            gzipped,
            kind,
        }
    }

    /// Descriptor for a remote URL.
    ///
    /// The file name is the last path segment; when that has no extension the
    /// response content type picks a stand-in name.
    pub fn for_url(url: impl Into<String>, content_type: Option<&str>) -> Self {
        let url = url.into();
        let filename = filename_from_url(&url, content_type.unwrap_or_default());
        let (kind, gzipped) = FileKind::from_filename(&filename);
        Self {
            origin: DataOrigin::Url { url },
            delimiter: default_delimiter_for(&kind),
            filename,
            gzipped,
            kind,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Prefix used when deriving cache keys
    pub fn key_prefix(&self) -> &'static str {
        match self.origin {
            DataOrigin::Upload { .. } => "local_csv",
            DataOrigin::Url { .. } => "url_csv",
        }
    }
}

fn default_delimiter_for(kind: &FileKind) -> char {
    match kind {
        FileKind::Tsv => '\t',
        _ => DEFAULT_DELIMITER,
    }
}

/// Derive a file name from a URL, falling back on the content type
pub fn filename_from_url(url: &str, content_type: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();
    if !segment.is_empty() && segment.contains('.') {
        return segment.to_string();
    }

    let content_type = content_type.to_lowercase();
    if content_type.contains("text/html") {
        "webpage.html".to_string()
    } else if content_type.contains("json") {
        "data.json".to_string()
    } else if content_type.contains("csv") {
        "data.csv".to_string()
    } else if content_type.contains("text/plain") {
        "content.txt".to_string()
    } else {
        "url_content".to_string()
    }
}
