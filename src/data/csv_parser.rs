//! CSV and TSV text parsing
//!
//! Turns uploaded or fetched text into a [`Table`]. Every cell stays a string;
//! the workbench never infers types.
//!
//! ## Memory Limits
//!
//! - Files larger than the configured upload cap return [`DataError::TooLarge`]
//! - Sources with more than [`MAX_ROWS`] data rows return [`DataError::TooManyRows`]

use crate::constants::{BYTES_PER_MB, MAX_ROWS};
use crate::data::error::{DataError, DataResult};
use crate::types::{DataRow, Table};
use std::collections::HashMap;
use std::path::Path;

/// Parse a local CSV or TSV file into a table
///
/// Returns the table and the delimiter that was detected for it.
pub fn parse_csv_file(path: &Path, max_mb: usize) -> DataResult<(Table, char)> {
    let metadata = std::fs::metadata(path)?;
    check_size(metadata.len(), max_mb)?;

    let content = std::fs::read_to_string(path)?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let delimiter = detect_delimiter(filename, &content);
    let table = parse_csv_content(&content, delimiter)?;

    tracing::debug!(
        path = %path.display(),
        rows = table.row_count(),
        cols = table.column_count(),
        "Parsed CSV file"
    );

    Ok((table, delimiter))
}

/// Reject sources over `max_mb` megabytes, compared byte for byte
///
/// The reported size is rounded up so it never reads as within the cap.
pub fn check_size(len_bytes: u64, max_mb: usize) -> DataResult<()> {
    if len_bytes > (max_mb as u64).saturating_mul(BYTES_PER_MB) {
        return Err(DataError::TooLarge {
            size_mb: len_bytes.div_ceil(BYTES_PER_MB),
            max_mb,
        });
    }
    Ok(())
}

/// Parse CSV/TSV content from a string
///
/// The first non-empty line is the header. Blank lines are skipped. Missing
/// trailing fields read as empty strings and surplus fields are dropped.
pub fn parse_csv_content(content: &str, delimiter: char) -> DataResult<Table> {
    let mut lines = content
        .lines()
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .filter(|l| !l.trim().is_empty());

    let header_line = lines.next().ok_or(DataError::EmptyFile)?;
    let headers = split_csv_line(header_line, delimiter);

    if headers.iter().all(|h| h.is_empty()) {
        return Err(DataError::NoColumns);
    }

    let mut rows = Vec::new();
    for line in lines {
        if rows.len() >= MAX_ROWS {
            return Err(DataError::TooManyRows {
                rows: rows.len() + 1,
                max_rows: MAX_ROWS,
            });
        }

        let mut fields = split_csv_line(line, delimiter).into_iter();
        let cells: HashMap<String, String> = headers
            .iter()
            .map(|name| (name.clone(), fields.next().unwrap_or_default()))
            .collect();
        rows.push(DataRow::new(cells));
    }

    Table::new(headers, rows)
}

/// Detect the delimiter to use for parsing
///
/// A `.tsv` name wins; otherwise the most frequent of tab, semicolon and comma
/// across the first five lines, with comma on ties.
pub fn detect_delimiter(filename: &str, content: &str) -> char {
    let lower = filename.to_lowercase();
    if lower.ends_with(".tsv") || lower.ends_with(".tsv.gz") {
        return '\t';
    }

    let first_lines: String = content.lines().take(5).collect::<Vec<_>>().join("\n");

    let comma_count = first_lines.matches(',').count();
    let tab_count = first_lines.matches('\t').count();
    let semicolon_count = first_lines.matches(';').count();

    if tab_count > comma_count && tab_count > semicolon_count {
        '\t'
    } else if semicolon_count > comma_count {
        ';'
    } else {
        ','
    }
}

/// Split a CSV line respecting quoted fields
fn split_csv_line(line: &str, delimiter: char) -> Vec<String> {
    let mut result = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (i, c) in line.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == delimiter && !in_quotes {
            result.push(unquote(&line[start..i]));
            start = i + c.len_utf8();
        }
    }
    result.push(unquote(&line[start..]));

    result
}

/// Trim a field and remove surrounding quotes, collapsing doubled quotes
fn unquote(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].replace("\"\"", "\"")
    } else {
        trimmed.to_string()
    }
}
