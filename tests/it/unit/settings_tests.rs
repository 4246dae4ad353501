//! Settings persistence tests.

use std::time::Duration;
use tabledesk::Settings;
use tabledesk::data::Quoting;

#[test]
fn test_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let mut settings = Settings::default();
    settings.default_page_size = 35;
    settings.cache.max_entries = 8;
    settings.cache.ttl_secs = None;
    settings.export.quoting = Quoting::Minimal;
    settings.save_to(&path).unwrap();

    let loaded = Settings::load_from(&path);
    assert_eq!(loaded, settings);

    let config = loaded.cache_config();
    assert_eq!(config.max_entries, 8);
    assert_eq!(config.ttl, None);
}

#[test]
fn test_saved_file_is_pretty_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    Settings::default().save_to(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\n  \"default_page_size\": 20"));
    assert!(text.contains("\"quoting\": \"never\""));
}

#[test]
fn test_default_ttl_is_one_hour() {
    assert_eq!(
        Settings::default().cache_config().ttl,
        Some(Duration::from_secs(3600))
    );
}

#[test]
fn test_wrong_field_type_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{"default_page_size": "twenty"}"#).unwrap();

    assert_eq!(Settings::load_from(&path), Settings::default());
}
