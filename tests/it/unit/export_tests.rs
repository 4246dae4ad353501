//! Export merger tests.
//!
//! Exported text uses `\r\n` terminators; snapshots show lines joined with
//! `" | "` so they stay on one line.

use crate::helpers::{TestTableBuilder, ab_table};
use insta::assert_snapshot;
use std::collections::BTreeMap;
use tabledesk::data::export::{ExportOptions, Quoting, export_table, merge, serialize};
use tabledesk::types::{CellCoord, DataRow};

fn lines(bytes: Vec<u8>) -> String {
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.ends_with("\r\n"));
    text.trim_end_matches("\r\n").split("\r\n").collect::<Vec<_>>().join(" | ")
}

fn edits(pairs: &[((usize, usize), &str)]) -> BTreeMap<CellCoord, String> {
    pairs
        .iter()
        .map(|((r, c), v)| (CellCoord::new(*r, *c), v.to_string()))
        .collect()
}

#[test]
fn test_merge_example() {
    let table = ab_table();
    let merged = merge(&table, &edits(&[((1, 0), "9")]));

    assert_eq!(
        merged,
        vec![
            DataRow::from_pairs([("a", "1"), ("b", "2")]),
            DataRow::from_pairs([("a", "9"), ("b", "4")]),
        ]
    );
    let text = lines(serialize(&merged, table.columns(), &ExportOptions::default()));
    assert_snapshot!(text, @"a,b | 1,2 | 9,4");
}

#[test]
fn test_repeated_exports_with_different_edits() {
    let table = ab_table();
    let options = ExportOptions::default();

    let first = lines(export_table(&table, &edits(&[((0, 1), "x")]), &options));
    let second = lines(export_table(&table, &edits(&[((1, 1), "y")]), &options));

    assert_snapshot!(first, @"a,b | 1,x | 3,4");
    assert_snapshot!(second, @"a,b | 1,2 | 3,y");
    assert_eq!(table, ab_table());
}

#[test]
fn test_missing_fields_export_empty() {
    let table = TestTableBuilder::new(&["id", "note"])
        .sparse_row(&[("id", "1")])
        .row(&["2", "ok"])
        .build();

    let text = lines(export_table(&table, &BTreeMap::new(), &ExportOptions::default()));
    assert_snapshot!(text, @"id,note | 1, | 2,ok");
}

#[test]
fn test_edit_fills_absent_field() {
    let table = TestTableBuilder::new(&["id", "note"])
        .sparse_row(&[("id", "1")])
        .build();

    let text = lines(export_table(
        &table,
        &edits(&[((0, 1), "filled")]),
        &ExportOptions::default(),
    ));
    assert_snapshot!(text, @"id,note | 1,filled");
}

#[test]
fn test_empty_table_exports_header() {
    let table = TestTableBuilder::new(&["a", "b"]).build();
    let text = lines(export_table(&table, &BTreeMap::new(), &ExportOptions::default()));
    assert_snapshot!(text, @"a,b");
}

#[test]
fn test_naive_quoting_is_preserved() {
    let table = TestTableBuilder::new(&["name", "city"])
        .row(&["Doe, J", "Oslo"])
        .build();

    let naive = lines(export_table(&table, &BTreeMap::new(), &ExportOptions::default()));
    assert_snapshot!(naive, @"name,city | Doe, J,Oslo");

    let minimal = lines(export_table(
        &table,
        &BTreeMap::new(),
        &ExportOptions {
            delimiter: ',',
            quoting: Quoting::Minimal,
        },
    ));
    assert_snapshot!(minimal, @r#"name,city | "Doe, J",Oslo"#);
}

#[test]
fn test_tab_delimiter() {
    let options = ExportOptions {
        delimiter: '\t',
        quoting: Quoting::Never,
    };
    let text = String::from_utf8(export_table(&ab_table(), &BTreeMap::new(), &options)).unwrap();
    assert_eq!(text, "a\tb\r\n1\t2\r\n3\t4\r\n");
}
