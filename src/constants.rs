//! Application-wide constants.
//!
//! Centralizes defaults and limits so the cache, pagination and export
//! layers agree on them.

// ============================================================================
// Pagination
// ============================================================================

/// Rows per page when neither the request nor the owner's preference says otherwise
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Most numbered page links shown in the navigation strip
pub const MAX_VISIBLE_PAGES: usize = 7;

/// Distance from either end inside which the link strip stops sliding
pub const PAGE_WINDOW_THRESHOLD: usize = 5;

/// Sessions whose page-size preference is remembered before the least recent is forgotten
pub const DEFAULT_MAX_SESSIONS: usize = 4096;

// ============================================================================
// Dataset Cache
// ============================================================================

/// Default number of datasets kept before the least recently used is evicted
pub const DEFAULT_CACHE_ENTRIES: usize = 64;

/// Default dataset lifetime in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

// ============================================================================
// Ingestion Limits
// ============================================================================

/// Maximum upload size accepted by the file/HTTP ingestion paths
pub const MAX_UPLOAD_MB: usize = 100;

/// Bytes in one upload-limit megabyte
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Maximum number of data rows accepted from one source
pub const MAX_ROWS: usize = 1_000_000;

// ============================================================================
// Export
// ============================================================================

/// Delimiter used when neither the caller nor the source provides one
pub const DEFAULT_DELIMITER: char = ',';

/// Download name used when the source has no usable file name
pub const FALLBACK_EXPORT_NAME: &str = "modified_file.csv";

// ============================================================================
// Server
// ============================================================================

/// Default listen address for the HTTP surface
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8750";

/// Default number of request worker threads
pub const DEFAULT_SERVER_WORKERS: usize = 4;

/// Header carrying the editing session identity
pub const OWNER_HEADER: &str = "X-Owner";

/// How long a worker blocks on the socket before re-checking the shutdown flag
pub const SERVER_POLL_MS: u64 = 100;

// ============================================================================
// Performance
// ============================================================================

/// Page renders slower than this are logged as slow
pub const RENDER_WARN_MS: f64 = 50.0;

/// Exports slower than this are logged as slow
pub const EXPORT_WARN_MS: f64 = 250.0;
