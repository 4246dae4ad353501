//! Unit tests for CSV file ingestion.

use std::io::Write;
use tabledesk::data::{DataError, parse_csv_file};
use tabledesk::types::CellCoord;

#[test]
fn test_parse_tsv_file_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.tsv");
    std::fs::write(&path, "name\tcity\nAda\tLondon, UK\n").unwrap();

    let (table, delimiter) = parse_csv_file(&path, 100).unwrap();
    assert_eq!(delimiter, '\t');
    assert_eq!(table.cell(CellCoord::new(0, 1)), Some("London, UK"));
}

#[test]
fn test_parse_detects_semicolons() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "a;b").unwrap();
    writeln!(file, "1;2").unwrap();

    let (table, delimiter) = parse_csv_file(file.path(), 100).unwrap();
    assert_eq!(delimiter, ';');
    assert_eq!(table.columns(), ["a", "b"]);
}

#[test]
fn test_size_cap() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.csv");
    let mut content = String::from("a,b\n");
    while content.len() < 3 * 1024 * 1024 / 2 {
        content.push_str("1234567890,1234567890\n");
    }
    std::fs::write(&path, content).unwrap();

    assert!(matches!(
        parse_csv_file(&path, 0),
        Err(DataError::TooLarge { size_mb: 2, max_mb: 0 })
    ));
    assert!(parse_csv_file(&path, 2).is_ok());
}

#[test]
fn test_fraction_over_the_cap_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("edge.csv");
    let mut content = String::from("a\n");
    content.push_str(&"x".repeat(1024 * 1024));
    std::fs::write(&path, &content).unwrap();

    // Just past one megabyte used to round down and slip through
    assert!(matches!(
        parse_csv_file(&path, 1),
        Err(DataError::TooLarge { size_mb: 2, max_mb: 1 })
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = parse_csv_file(&dir.path().join("nope.csv"), 100).unwrap_err();
    assert!(matches!(err, DataError::Io(_)));
    assert!(!err.is_bad_input());
}
