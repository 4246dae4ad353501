//! Merge an owner's edits into a copy of a dataset and serialize it.
//!
//! Export is read-only with respect to the cache and the overlays: the merge
//! works on a deep copy, so the same dataset can be exported any number of
//! times with different edit sets.

use crate::constants::{DEFAULT_DELIMITER, FALLBACK_EXPORT_NAME};
use crate::types::{CellCoord, DataRow, SourceDescriptor, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Line terminator written after every exported line
pub const LINE_TERMINATOR: &str = "\r\n";

/// How exported fields are quoted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quoting {
    /// Fields are written verbatim, joined by the delimiter
    #[default]
    Never,
    /// Fields containing the delimiter, quotes or line breaks are quoted
    Minimal,
}

/// Serialization options for an export
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    pub delimiter: char,
    pub quoting: Quoting,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            quoting: Quoting::Never,
        }
    }
}

/// Apply `edits` to a deep copy of the table's rows.
///
/// Column indices resolve to names through the table's column order.
/// Coordinates outside the table are skipped.
pub fn merge<'a>(
    table: &Table,
    edits: impl IntoIterator<Item = (&'a CellCoord, &'a String)>,
) -> Vec<DataRow> {
    let mut rows = table.rows().to_vec();

    for (coord, value) in edits {
        let Some(column) = table.column_name(coord.col) else {
            continue;
        };
        if let Some(row) = rows.get_mut(coord.row) {
            row.set(column, value.clone());
        }
    }

    rows
}

/// Write a header line and one line per record
pub fn serialize(rows: &[DataRow], columns: &[String], options: &ExportOptions) -> Vec<u8> {
    let delimiter = options.delimiter.to_string();
    let mut out = String::new();

    let header: Vec<String> = columns
        .iter()
        .map(|name| encode_field(name, options))
        .collect();
    out.push_str(&header.join(&delimiter));
    out.push_str(LINE_TERMINATOR);

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|name| encode_field(row.get(name), options))
            .collect();
        out.push_str(&cells.join(&delimiter));
        out.push_str(LINE_TERMINATOR);
    }

    out.into_bytes()
}

/// Merge and serialize in one step
pub fn export_table(
    table: &Table,
    edits: &BTreeMap<CellCoord, String>,
    options: &ExportOptions,
) -> Vec<u8> {
    let merged = merge(table, edits);
    serialize(&merged, table.columns(), options)
}

/// Download name for an export of `source`
pub fn export_filename(source: &SourceDescriptor) -> String {
    let name = source.filename.trim();
    if name.is_empty() {
        FALLBACK_EXPORT_NAME.to_string()
    } else {
        name.strip_suffix(".gz").unwrap_or(name).to_string()
    }
}

fn encode_field(value: &str, options: &ExportOptions) -> String {
    match options.quoting {
        Quoting::Never => value.to_string(),
        Quoting::Minimal => quote_csv_field(value, options.delimiter),
    }
}

/// Quote a CSV field if necessary (contains delimiter, quotes, or newlines)
fn quote_csv_field(value: &str, delimiter: char) -> String {
    let needs_quoting = value.contains(delimiter)
        || value.contains('"')
        || value.contains('\n')
        || value.contains('\r');

    if needs_quoting {
        let escaped = value.replace('"', "\"\"");
        format!("\"{}\"", escaped)
    } else {
        value.to_string()
    }
}
