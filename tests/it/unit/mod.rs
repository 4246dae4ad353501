//! Unit tests for tabledesk.

mod csv_parser_tests;
mod export_tests;
mod pagination_props;
mod settings_tests;
