//! The workbench: one process-wide dataset cache plus every session's edits.
//!
//! All operations take the editing session explicitly as an [`OwnerId`]; the
//! workbench holds no notion of a "current" session. It is `Sync` and meant to
//! be shared behind an `Arc` by every request handler.

use crate::constants::{EXPORT_WARN_MS, RENDER_WARN_MS};
use crate::data::cache::{DatasetCache, DatasetEntry, DatasetSummary};
use crate::data::csv_parser::{check_size, detect_delimiter, parse_csv_content, parse_csv_file};
use crate::data::error::DataResult;
use crate::data::export::{self, ExportOptions, Quoting};
use crate::data::overlay::{EditOutcome, OverlayStore, ReplaceSummary};
use crate::data::pagination;
use crate::data::view::{PageView, render_page};
use crate::perf::{OperationLog, OperationSummary, ScopedTimer, measure};
use crate::settings::Settings;
use crate::types::{CellCoord, DatasetKey, OwnerId, SourceDescriptor, Table};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// A merged export ready for download
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Export {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Snapshot of workbench state and operation timings
#[derive(Clone, Debug, Serialize)]
pub struct WorkbenchStats {
    pub datasets: usize,
    pub overlays: usize,
    /// Owners with a remembered page size
    pub sessions: usize,
    pub operations: Vec<OperationSummary>,
}

pub struct Workbench {
    cache: DatasetCache,
    overlays: OverlayStore,
    /// Per-owner page size, least recently used forgotten first
    page_sizes: Mutex<LruCache<OwnerId, usize>>,
    default_page_size: usize,
    quoting: Quoting,
    max_upload_mb: usize,
    ops: OperationLog,
}

impl Default for Workbench {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl Workbench {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            cache: DatasetCache::new(settings.cache_config()),
            overlays: OverlayStore::new(),
            page_sizes: Mutex::new(LruCache::new(
                NonZeroUsize::new(settings.max_sessions).unwrap_or(NonZeroUsize::MIN),
            )),
            default_page_size: settings.default_page_size.max(1),
            quoting: settings.export.quoting,
            max_upload_mb: settings.max_upload_mb,
            ops: OperationLog::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------------

    /// Cache a parsed table and return its new key.
    ///
    /// Overlays of any dataset evicted to make room are dropped with it.
    pub fn ingest(&self, table: Table, source: SourceDescriptor) -> DatasetKey {
        self.insert(table, source).key.clone()
    }

    /// Parse CSV/TSV text and cache it.
    ///
    /// The delimiter is detected from the file name and content, and recorded
    /// on the source so exports default to it.
    pub fn ingest_text(&self, content: &str, source: SourceDescriptor) -> DataResult<DatasetSummary> {
        check_size(content.len() as u64, self.max_upload_mb)?;

        if !source.kind.is_tabular() {
            debug!(filename = %source.filename, kind = ?source.kind, "Parsing non-CSV source as delimited text");
        }

        let delimiter = detect_delimiter(&source.filename, content);
        let (table, parse_ms) = measure(|| parse_csv_content(content, delimiter));
        let table = table?;
        debug!(filename = %source.filename, rows = table.row_count(), parse_ms, "Parsed upload");
        Ok(self.insert(table, source.with_delimiter(delimiter)).summary())
    }

    /// Read, parse and cache a local file
    pub fn ingest_file(&self, path: &Path) -> DataResult<DatasetSummary> {
        let (table, delimiter) = parse_csv_file(path, self.max_upload_mb)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = SourceDescriptor::for_upload(filename).with_delimiter(delimiter);
        Ok(self.insert(table, source).summary())
    }

    fn insert(&self, table: Table, source: SourceDescriptor) -> Arc<DatasetEntry> {
        let _timer = ScopedTimer::new("ingest", RENDER_WARN_MS).record_into(&self.ops);

        let put = self.cache.put(table, source);
        for evicted in &put.evicted {
            self.overlays.drop_dataset(evicted);
        }

        info!(
            key = %put.key,
            filename = %put.entry.source.filename,
            evicted = put.evicted.len(),
            "Ingested dataset"
        );
        put.entry
    }

    // ------------------------------------------------------------------------
    // Viewing
    // ------------------------------------------------------------------------

    /// Render one page of a dataset with the owner's edits applied.
    ///
    /// An explicit `page_size` becomes the owner's preference; otherwise the
    /// stored preference (or the default) is used. The page is clamped into
    /// range.
    pub fn get_page(
        &self,
        key: &DatasetKey,
        owner: &OwnerId,
        page: i64,
        page_size: Option<usize>,
    ) -> DataResult<PageView> {
        let _timer = ScopedTimer::new("get_page", RENDER_WARN_MS).record_into(&self.ops);

        let entry = self.lookup(key)?;
        let page_size = match page_size {
            Some(size) => self.set_page_size(owner, size),
            None => self.page_size(owner),
        };

        let window = pagination::compute(entry.table.row_count(), page_size, page);
        let page_edits = self.overlays.page(key, owner, window.rows());
        let edit_count = self.overlays.edit_count(key, owner);

        debug!(key = %key, owner = %owner, page = window.page, page_size, "Rendered page");
        Ok(render_page(&entry, &page_edits, window, edit_count))
    }

    /// Store the owner's rows-per-page preference, clamped to at least 1
    pub fn set_page_size(&self, owner: &OwnerId, page_size: usize) -> usize {
        let page_size = page_size.max(1);
        self.page_sizes.lock().put(owner.clone(), page_size);
        page_size
    }

    /// The owner's preference, or the default once it has been forgotten
    pub fn page_size(&self, owner: &OwnerId) -> usize {
        self.page_sizes
            .lock()
            .get(owner)
            .copied()
            .unwrap_or(self.default_page_size)
    }

    // ------------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------------

    pub fn apply_edit(
        &self,
        key: &DatasetKey,
        owner: &OwnerId,
        coord: CellCoord,
        value: impl Into<String>,
    ) -> DataResult<EditOutcome> {
        let _timer = ScopedTimer::new("apply_edit", RENDER_WARN_MS).record_into(&self.ops);
        let entry = self.lookup(key)?;
        Ok(self.overlays.set_cell(&entry.table, key, owner, coord, value))
    }

    /// Replace all of the owner's edits on `key`
    pub fn replace_edits(
        &self,
        key: &DatasetKey,
        owner: &OwnerId,
        edits: impl IntoIterator<Item = (CellCoord, String)>,
    ) -> DataResult<ReplaceSummary> {
        let _timer = ScopedTimer::new("replace_edits", RENDER_WARN_MS).record_into(&self.ops);
        let entry = self.lookup(key)?;
        Ok(self.overlays.replace_all(&entry.table, key, owner, edits))
    }

    pub fn edits(&self, key: &DatasetKey, owner: &OwnerId) -> DataResult<BTreeMap<CellCoord, String>> {
        self.lookup(key)?;
        Ok(self.overlays.all(key, owner))
    }

    pub fn clear_edits(&self, key: &DatasetKey, owner: &OwnerId) {
        self.overlays.clear(key, owner);
    }

    // ------------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------------

    /// Merge the owner's edits into a copy of the dataset and serialize it.
    ///
    /// Without an explicit delimiter the source's own delimiter is used.
    pub fn export(
        &self,
        key: &DatasetKey,
        owner: &OwnerId,
        delimiter: Option<char>,
    ) -> DataResult<Export> {
        let _timer = ScopedTimer::new("export", EXPORT_WARN_MS).record_into(&self.ops);

        let entry = self.lookup(key)?;
        let edits = self.overlays.all(key, owner);
        let options = ExportOptions {
            delimiter: delimiter.unwrap_or(entry.source.delimiter),
            quoting: self.quoting,
        };

        let bytes = export::export_table(&entry.table, &edits, &options);
        let filename = export::export_filename(&entry.source);

        info!(
            key = %key,
            owner = %owner,
            edits = edits.len(),
            bytes = bytes.len(),
            filename = %filename,
            "Exported dataset"
        );
        Ok(Export { filename, bytes })
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    pub fn datasets(&self) -> Vec<DatasetSummary> {
        self.cache.list()
    }

    /// Drop expired datasets and their overlays now rather than on next access
    pub fn purge_expired(&self) -> usize {
        let expired = self.cache.purge_expired();
        for key in &expired {
            self.overlays.drop_dataset(key);
        }
        expired.len()
    }

    pub fn stats(&self) -> WorkbenchStats {
        WorkbenchStats {
            datasets: self.cache.len(),
            overlays: self.overlays.len(),
            sessions: self.page_sizes.lock().len(),
            operations: self.ops.summaries(),
        }
    }

    /// Cache lookup that also releases the overlays of anything that expired
    fn lookup(&self, key: &DatasetKey) -> DataResult<Arc<DatasetEntry>> {
        let result = self.cache.get(key);
        for expired in self.cache.drain_evicted() {
            self.overlays.drop_dataset(&expired);
        }
        result
    }
}
