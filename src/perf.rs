//! Performance monitoring utilities.
//!
//! Tracks how long the workbench operations take so slow ingests, page
//! renders and exports show up in the logs.
//!
//! ## Features
//!
//! - **Scoped timers**: RAII-style timing for code blocks, warning past a threshold
//! - **Aggregated statistics**: per-operation samples with average, p95 and max
//! - **Verbose mode**: the `profiling` feature logs every timed operation at trace level
//!
//! ## Usage
//!
//! ```ignore
//! let log = OperationLog::new();
//! {
//!     let _timer = ScopedTimer::new("export", 250.0).record_into(&log);
//!     // ... work ...
//! }
//! let stats = log.summaries();
//! ```

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::time::Instant;
use tracing::warn;
#[cfg(feature = "profiling")]
use tracing::trace;

/// Number of samples to keep for operation statistics
const STATS_SAMPLE_COUNT: usize = 100;

// ============================================================================
// Operation Statistics
// ============================================================================

/// Statistics for a specific operation type.
#[derive(Debug, Clone)]
pub struct OperationStats {
    /// Recent timing samples in milliseconds
    samples: VecDeque<f64>,
    /// Total invocation count
    count: u64,
    /// Minimum observed time
    min_ms: f64,
    /// Maximum observed time
    max_ms: f64,
    /// Running sum for average calculation
    sum_ms: f64,
}

impl Default for OperationStats {
    fn default() -> Self {
        Self {
            samples: VecDeque::with_capacity(STATS_SAMPLE_COUNT),
            count: 0,
            min_ms: f64::MAX,
            max_ms: 0.0,
            sum_ms: 0.0,
        }
    }
}

impl OperationStats {
    /// Record a new timing sample.
    pub fn record(&mut self, ms: f64) {
        if self.samples.len() >= STATS_SAMPLE_COUNT {
            if let Some(old) = self.samples.pop_front() {
                self.sum_ms -= old;
            }
        }
        self.samples.push_back(ms);
        self.sum_ms += ms;
        self.count += 1;
        self.min_ms = self.min_ms.min(ms);
        self.max_ms = self.max_ms.max(ms);
    }

    /// Get the average time over recent samples.
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.sum_ms / self.samples.len() as f64
        }
    }

    /// Get the p95 (95th percentile) time.
    pub fn p95(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let idx = ((sorted.len() as f64) * 0.95).floor() as usize;
        sorted.get(idx.min(sorted.len() - 1)).copied().unwrap_or(0.0)
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn max(&self) -> f64 {
        self.max_ms
    }

    pub fn min(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.min_ms }
    }
}

/// Serializable snapshot of one operation's statistics
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OperationSummary {
    pub name: &'static str,
    pub count: u64,
    pub average_ms: f64,
    pub p95_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// Thread-safe collection of per-operation statistics
#[derive(Default)]
pub struct OperationLog {
    stats: Mutex<HashMap<&'static str, OperationStats>>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &'static str, elapsed_ms: f64) {
        self.stats.lock().entry(name).or_default().record(elapsed_ms);
    }

    pub fn get(&self, name: &str) -> Option<OperationStats> {
        self.stats.lock().get(name).cloned()
    }

    /// Snapshot of every operation, sorted by name
    pub fn summaries(&self) -> Vec<OperationSummary> {
        let stats = self.stats.lock();
        let mut out: Vec<OperationSummary> = stats
            .iter()
            .map(|(name, s)| OperationSummary {
                name: *name,
                count: s.count(),
                average_ms: s.average(),
                p95_ms: s.p95(),
                min_ms: s.min(),
                max_ms: s.max(),
            })
            .collect();
        out.sort_by_key(|s| s.name);
        out
    }
}

// ============================================================================
// Scoped Timer
// ============================================================================

/// A scoped timer that logs duration on drop.
///
/// Warns when the scope outlives its threshold, and feeds the sample into an
/// [`OperationLog`] when one is attached.
pub struct ScopedTimer<'a> {
    name: &'static str,
    start: Instant,
    threshold_ms: f64,
    log: Option<&'a OperationLog>,
}

impl<'a> ScopedTimer<'a> {
    /// Create a new scoped timer with a warning threshold.
    pub fn new(name: &'static str, threshold_ms: f64) -> Self {
        Self {
            name,
            start: Instant::now(),
            threshold_ms,
            log: None,
        }
    }

    /// Also record the sample into `log` when the timer drops.
    pub fn record_into(mut self, log: &'a OperationLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Get elapsed time without stopping the timer.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed_ms();

        if let Some(log) = self.log {
            log.record(self.name, elapsed_ms);
        }

        #[cfg(feature = "profiling")]
        trace!("[PERF] {}: {:.2}ms", self.name, elapsed_ms);

        if elapsed_ms > self.threshold_ms {
            warn!(
                operation = self.name,
                elapsed_ms = format!("{:.2}", elapsed_ms),
                threshold_ms = format!("{:.2}", self.threshold_ms),
                "Slow operation"
            );
        }
    }
}

// ============================================================================
// Timing Utilities
// ============================================================================

/// Measure execution time of a closure and return both the result and elapsed time.
#[inline]
pub fn measure<T, F: FnOnce() -> T>(f: F) -> (T, f64) {
    let start = Instant::now();
    let result = f();
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    (result, elapsed_ms)
}
