//! Dataset handling module
//!
//! This module holds everything between "a parsed table" and "a page on
//! screen" or "a merged file to download":
//!
//! - `cache`: bounded store of ingested tables, keyed by opaque dataset keys
//! - `overlay`: sparse per-session cell edits, independent of the tables
//! - `pagination`: pure page arithmetic and the navigation strip
//! - `view`: page assembly from table rows plus overlay entries
//! - `export`: merge of a table with an overlay, and CSV serialization
//! - `csv_parser`: text to table, for the ingestion paths
//!
//! ## Error Handling
//!
//! All fallible operations return `DataResult<T>` which uses the `DataError`
//! type. The only error the core surfaces after ingestion is `NotFound`;
//! out-of-range edits and pages are reported as outcomes or clamped.

pub mod cache;
pub mod csv_parser;
pub mod error;
pub mod export;
pub mod overlay;
pub mod pagination;
pub mod view;

pub use cache::{CacheConfig, CachePut, DatasetCache, DatasetEntry, DatasetSummary};
pub use csv_parser::{check_size, detect_delimiter, parse_csv_content, parse_csv_file};
pub use error::{DataError, DataResult};
pub use export::{ExportOptions, Quoting};
pub use overlay::{EditOutcome, EditOverlay, OverlayStore, ReplaceSummary};
pub use pagination::{PageLinks, PageWindow};
pub use view::{PageMeta, PageView, ViewCell, ViewRow};
