//! Assembles the cells shown for one page.
//!
//! Combines a row window of the stored table with the overlay entries that
//! fall inside it. Display values never contain line breaks: the edit surface
//! works one line per cell.

use crate::data::cache::DatasetEntry;
use crate::data::pagination::{PageLinks, PageWindow, page_links};
use crate::types::{CellCoord, DatasetKey};
use serde::Serialize;
use std::collections::BTreeMap;

/// One displayed cell
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ViewCell {
    /// What the editor shows: the edit if any, else the stored value
    pub value: String,
    /// Stored value, normalized the same way
    pub original: String,
    /// True iff the owner's overlay holds this cell
    pub edited: bool,
}

/// One displayed row
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ViewRow {
    /// Absolute 0-based row index in the table
    pub index: usize,
    pub cells: Vec<ViewCell>,
}

/// Paging details sent with every page
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    #[serde(flatten)]
    pub window: PageWindow,
    pub first_record: usize,
    pub last_record: usize,
    pub links: PageLinks,
    /// Edits the owner holds across the whole dataset
    pub edit_count: usize,
}

/// Everything needed to draw one page of a dataset
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PageView {
    pub key: DatasetKey,
    pub filename: String,
    pub columns: Vec<String>,
    pub rows: Vec<ViewRow>,
    pub meta: PageMeta,
}

impl PageView {
    /// Display value at an absolute coordinate, if it is on this page
    pub fn cell(&self, coord: CellCoord) -> Option<&ViewCell> {
        let first = self.rows.first()?.index;
        let row = self.rows.get(coord.row.checked_sub(first)?)?;
        row.cells.get(coord.col)
    }

    pub fn edited_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.rows.iter().flat_map(|row| {
            row.cells
                .iter()
                .enumerate()
                .filter(|(_, cell)| cell.edited)
                .map(move |(col, _)| CellCoord::new(row.index, col))
        })
    }
}

/// Build the page view for `window` from a cached entry and the owner's edits.
///
/// `page_edits` only needs to cover the rows of the window; entries outside it
/// are ignored.
pub fn render_page(
    entry: &DatasetEntry,
    page_edits: &BTreeMap<CellCoord, String>,
    window: PageWindow,
    edit_count: usize,
) -> PageView {
    let table = &entry.table;
    let columns = table.columns();

    let rows = table.rows()[window.rows()]
        .iter()
        .zip(window.rows())
        .map(|(record, index)| ViewRow {
            index,
            cells: columns
                .iter()
                .enumerate()
                .map(|(col, name)| {
                    let original = normalize_cell(record.get(name));
                    match page_edits.get(&CellCoord::new(index, col)) {
                        Some(edit) => ViewCell {
                            value: normalize_cell(edit),
                            original,
                            edited: true,
                        },
                        None => ViewCell {
                            value: original.clone(),
                            original,
                            edited: false,
                        },
                    }
                })
                .collect(),
        })
        .collect();

    PageView {
        key: entry.key.clone(),
        filename: entry.source.filename.clone(),
        columns: columns.to_vec(),
        rows,
        meta: PageMeta {
            window,
            first_record: window.first_record(),
            last_record: window.last_record(),
            links: page_links(window.page, window.page_count),
            edit_count,
        },
    }
}

/// Replace each run of line breaks (`\r` and `\n` in any mix) with one space and trim
pub fn normalize_cell(value: &str) -> String {
    if !value.contains(['\n', '\r']) {
        return value.trim().to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut in_break = false;
    for ch in value.chars() {
        if ch == '\n' || ch == '\r' {
            if !in_break {
                out.push(' ');
            }
            in_break = true;
        } else {
            out.push(ch);
            in_break = false;
        }
    }
    out.trim().to_string()
}
