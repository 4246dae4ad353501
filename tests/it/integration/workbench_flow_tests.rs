//! End-to-end workbench flows: ingest, page, edit, export.

use crate::helpers::{TestTableBuilder, ab_table, ingest, numbered_table, owner};
use std::collections::BTreeMap;
use tabledesk::data::{DataError, EditOutcome};
use tabledesk::types::{CellCoord, SourceDescriptor};
use tabledesk::{Settings, Workbench};

#[test]
fn test_edit_page_export_cycle() {
    let wb = Workbench::default();
    let key = ingest(&wb, ab_table(), "ab.csv");
    let me = owner("me");

    assert_eq!(
        wb.apply_edit(&key, &me, CellCoord::new(1, 0), "9").unwrap(),
        EditOutcome::Applied
    );

    let view = wb.get_page(&key, &me, 1, None).unwrap();
    assert_eq!(view.rows[1].cells[0].value, "9");
    assert!(view.rows[1].cells[0].edited);

    let export = wb.export(&key, &me, None).unwrap();
    assert_eq!(export.filename, "ab.csv");
    assert_eq!(export.bytes, b"a,b\r\n1,2\r\n9,4\r\n");

    // The cached table is untouched: a fresh session sees the original
    let other = wb.export(&key, &owner("other"), Some(';')).unwrap();
    assert_eq!(other.bytes, b"a;b\r\n1;2\r\n3;4\r\n");
}

#[test]
fn test_owners_do_not_see_each_other() {
    let wb = Workbench::default();
    let key = ingest(&wb, numbered_table(30, 3), "n.csv");
    let (alice, bob) = (owner("alice"), owner("bob"));

    wb.apply_edit(&key, &alice, CellCoord::new(2, 2), "alice").unwrap();
    wb.apply_edit(&key, &bob, CellCoord::new(2, 2), "bob").unwrap();

    let a = wb.get_page(&key, &alice, 1, None).unwrap();
    let b = wb.get_page(&key, &bob, 1, None).unwrap();
    assert_eq!(a.rows[2].cells[2].value, "alice");
    assert_eq!(b.rows[2].cells[2].value, "bob");

    wb.clear_edits(&key, &alice);
    assert!(wb.edits(&key, &alice).unwrap().is_empty());
    assert_eq!(wb.edits(&key, &bob).unwrap().len(), 1);
}

#[test]
fn test_revert_clears_edited_flag() {
    let wb = Workbench::default();
    let key = ingest(&wb, ab_table(), "ab.csv");
    let me = owner("me");

    wb.apply_edit(&key, &me, CellCoord::new(0, 1), "20").unwrap();
    assert_eq!(
        wb.apply_edit(&key, &me, CellCoord::new(0, 1), "2").unwrap(),
        EditOutcome::Reverted
    );

    let view = wb.get_page(&key, &me, 1, None).unwrap();
    assert!(!view.rows[0].cells[1].edited);
    assert_eq!(view.meta.edit_count, 0);
}

#[test]
fn test_out_of_range_edit_is_not_an_error() {
    let wb = Workbench::default();
    let key = ingest(&wb, ab_table(), "ab.csv");
    let me = owner("me");

    assert_eq!(
        wb.apply_edit(&key, &me, CellCoord::new(999, 0), "x").unwrap(),
        EditOutcome::OutOfRange
    );
    assert!(wb.edits(&key, &me).unwrap().is_empty());
}

#[test]
fn test_replace_edits_then_export() {
    let wb = Workbench::default();
    let key = ingest(&wb, ab_table(), "ab.csv");
    let me = owner("me");
    wb.apply_edit(&key, &me, CellCoord::new(0, 0), "dropped").unwrap();

    let mut edits = BTreeMap::new();
    edits.insert(CellCoord::new(1, 1), "44".to_string());
    edits.insert(CellCoord::new(5, 5), "nowhere".to_string());
    let summary = wb.replace_edits(&key, &me, edits).unwrap();
    assert_eq!((summary.kept, summary.out_of_range), (1, 1));

    let export = wb.export(&key, &me, None).unwrap();
    assert_eq!(export.bytes, b"a,b\r\n1,2\r\n3,44\r\n");
}

#[test]
fn test_page_clamping_through_workbench() {
    let wb = Workbench::default();
    let key = ingest(&wb, numbered_table(45, 1), "n.csv");
    let me = owner("me");

    let view = wb.get_page(&key, &me, 99, Some(20)).unwrap();
    assert_eq!(view.meta.window.page, 3);
    assert_eq!(view.rows.len(), 5);

    let view = wb.get_page(&key, &me, -1, Some(0)).unwrap();
    assert_eq!(view.meta.window.page, 1);
    assert_eq!(view.meta.window.page_size, 1);
    assert_eq!(wb.page_size(&me), 1);
}

#[test]
fn test_reingest_gets_new_key_and_fresh_overlay() {
    let wb = Workbench::default();
    let me = owner("me");
    let first = ingest(&wb, ab_table(), "ab.csv");
    wb.apply_edit(&first, &me, CellCoord::new(0, 0), "x").unwrap();

    let second = ingest(&wb, ab_table(), "ab.csv");
    assert_ne!(first, second);
    assert!(wb.edits(&second, &me).unwrap().is_empty());
    assert_eq!(wb.edits(&first, &me).unwrap().len(), 1);
}

#[test]
fn test_eviction_drops_overlays() {
    let mut settings = Settings::default();
    settings.cache.max_entries = 1;
    settings.cache.ttl_secs = None;
    let wb = Workbench::from_settings(&settings);
    let me = owner("me");

    let first = ingest(&wb, ab_table(), "a.csv");
    wb.apply_edit(&first, &me, CellCoord::new(0, 0), "x").unwrap();
    assert_eq!(wb.stats().overlays, 1);

    let second = ingest(&wb, ab_table(), "b.csv");
    assert!(matches!(wb.get_page(&first, &me, 1, None), Err(DataError::NotFound(_))));
    assert!(wb.get_page(&second, &me, 1, None).is_ok());
    assert_eq!(wb.stats().overlays, 0);
}

#[test]
fn test_ingest_url_source_and_file() {
    let wb = Workbench::default();
    let summary = wb
        .ingest_text(
            "x,y\n1,2\n",
            SourceDescriptor::for_url("https://example.com/download?id=7", Some("text/csv")),
        )
        .unwrap();
    assert!(summary.key.as_str().starts_with("url_csv_"));
    assert_eq!(summary.filename, "data.csv");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.tsv");
    std::fs::write(&path, "p\tq\n1\t2\n").unwrap();
    let summary = wb.ingest_file(&path).unwrap();
    let export = wb.export(&summary.key, &owner("me"), None).unwrap();
    assert_eq!(export.bytes, b"p\tq\r\n1\t2\r\n");
    assert_eq!(wb.datasets().len(), 2);
}

#[test]
fn test_gzip_suffix_is_stripped_from_export_name() {
    let wb = Workbench::default();
    let key = ingest(&wb, ab_table(), "archive.csv.gz");
    assert_eq!(wb.export(&key, &owner("me"), None).unwrap().filename, "archive.csv");
}

#[test]
fn test_minimal_quoting_from_settings() {
    let mut settings = Settings::default();
    settings.export.quoting = tabledesk::data::Quoting::Minimal;
    let wb = Workbench::from_settings(&settings);
    let key = ingest(&wb, ab_table(), "ab.csv");
    let me = owner("me");

    wb.apply_edit(&key, &me, CellCoord::new(0, 0), "1,5").unwrap();
    let export = wb.export(&key, &me, None).unwrap();
    assert_eq!(export.bytes, b"a,b\r\n\"1,5\",2\r\n3,4\r\n");
}

#[test]
fn test_out_of_range_edits_leave_no_overlays() {
    let wb = Workbench::default();
    let key = ingest(&wb, ab_table(), "ab.csv");

    for i in 0..100 {
        let outcome = wb
            .apply_edit(&key, &owner(&format!("s{i}")), CellCoord::new(500, 0), "x")
            .unwrap();
        assert_eq!(outcome, EditOutcome::OutOfRange);
    }
    assert_eq!(wb.stats().overlays, 0);
}

#[test]
fn test_many_sessions_keep_page_size_memory_bounded() {
    let mut settings = Settings::default();
    settings.max_sessions = 8;
    let wb = Workbench::from_settings(&settings);
    let key = ingest(&wb, numbered_table(50, 2), "n.csv");

    for i in 0..1000 {
        wb.get_page(&key, &owner(&format!("s{i}")), 1, Some(5)).unwrap();
    }
    assert_eq!(wb.stats().sessions, 8);

    // A forgotten session falls back to the default size
    let view = wb.get_page(&key, &owner("s0"), 1, None).unwrap();
    assert_eq!(view.rows.len(), 20);
    let view = wb.get_page(&key, &owner("s999"), 1, None).unwrap();
    assert_eq!(view.rows.len(), 5);
}

#[test]
fn test_writing_back_displayed_value_is_a_revert() {
    let wb = Workbench::default();
    let table = TestTableBuilder::new(&["note"]).row(&["x\ny"]).build();
    let key = ingest(&wb, table, "notes.csv");
    let me = owner("me");

    let view = wb.get_page(&key, &me, 1, None).unwrap();
    let shown = view.rows[0].cells[0].value.clone();
    assert_eq!(shown, "x y");

    assert_eq!(
        wb.apply_edit(&key, &me, CellCoord::new(0, 0), shown).unwrap(),
        EditOutcome::Reverted
    );
    assert!(wb.edits(&key, &me).unwrap().is_empty());
    assert!(!wb.get_page(&key, &me, 1, None).unwrap().rows[0].cells[0].edited);

    // The stored value, line break included, is what gets exported
    let export = wb.export(&key, &me, None).unwrap();
    assert_eq!(export.bytes, b"note\r\nx\ny\r\n");
}
