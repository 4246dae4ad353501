//! Sparse per-session cell edits layered over cached tables.
//!
//! An overlay maps [`CellCoord`] to a replacement value for one
//! `(dataset, owner)` pair. Presence means "this cell differs from the stored
//! table"; writing the stored value back removes the entry, so the overlay
//! stays sparse and the edited flag stays honest. A value counts as the stored
//! one when it matches either the raw cell or the cell as pages display it.
//!
//! Edits that store nothing (out of range, or a revert with no prior edits)
//! never allocate a slot.
//!
//! ## Locking
//!
//! The store keeps one `Mutex` per `(dataset, owner)`. The outer map lock is
//! only held long enough to find or create that slot, so sessions editing
//! different datasets (or different sessions on the same dataset) never wait
//! on each other. Two tabs of the same session race on the same slot and the
//! last write wins.

use crate::data::view::normalize_cell;
use crate::types::{CellCoord, DatasetKey, OwnerId, Table};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, trace};

/// What happened to a single-cell edit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOutcome {
    /// The overlay now holds the new value
    Applied,
    /// The value equals the stored one; any previous edit was removed
    Reverted,
    /// The coordinate is outside the table; nothing was stored
    OutOfRange,
}

/// What `replace_all` kept and dropped
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReplaceSummary {
    pub kept: usize,
    pub reverted: usize,
    pub out_of_range: usize,
}

/// Edits of one owner on one dataset, ordered by (row, col)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditOverlay {
    edits: BTreeMap<CellCoord, String>,
}

impl EditOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn get(&self, coord: CellCoord) -> Option<&str> {
        self.edits.get(&coord).map(String::as_str)
    }

    /// Apply one edit against the table it overlays
    pub fn set(&mut self, table: &Table, coord: CellCoord, value: String) -> EditOutcome {
        let Some(original) = table.cell(coord) else {
            return EditOutcome::OutOfRange;
        };

        if is_unchanged(original, &value) {
            self.edits.remove(&coord);
            EditOutcome::Reverted
        } else {
            self.edits.insert(coord, value);
            EditOutcome::Applied
        }
    }

    /// Overwrite every edit with `edits`, dropping no-ops and out-of-range cells
    pub fn replace(
        &mut self,
        table: &Table,
        edits: impl IntoIterator<Item = (CellCoord, String)>,
    ) -> ReplaceSummary {
        let mut summary = ReplaceSummary::default();
        let mut next = BTreeMap::new();

        for (coord, value) in edits {
            match table.cell(coord) {
                None => summary.out_of_range += 1,
                Some(original) if is_unchanged(original, &value) => summary.reverted += 1,
                Some(_) => {
                    next.insert(coord, value);
                }
            }
        }

        summary.kept = next.len();
        self.edits = next;
        summary
    }

    /// Edits whose row falls inside `rows`
    pub fn page(&self, rows: Range<usize>) -> BTreeMap<CellCoord, String> {
        if rows.is_empty() {
            return BTreeMap::new();
        }
        let lo = CellCoord::new(rows.start, 0);
        let hi = CellCoord::new(rows.end, 0);
        self.edits
            .range(lo..hi)
            .map(|(coord, value)| (*coord, value.clone()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellCoord, &String)> {
        self.edits.iter()
    }

    pub fn to_map(&self) -> BTreeMap<CellCoord, String> {
        self.edits.clone()
    }

    pub fn clear(&mut self) {
        self.edits.clear();
    }
}

/// Whether `value` is what the cell already holds, raw or as displayed
fn is_unchanged(original: &str, value: &str) -> bool {
    original == value || normalize_cell(original) == value
}

type SlotKey = (DatasetKey, OwnerId);

/// All overlays of the process, one lock per `(dataset, owner)`.
#[derive(Default)]
pub struct OverlayStore {
    slots: RwLock<HashMap<SlotKey, Arc<Mutex<EditOverlay>>>>,
}

impl OverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a single-cell edit
    pub fn set_cell(
        &self,
        table: &Table,
        key: &DatasetKey,
        owner: &OwnerId,
        coord: CellCoord,
        value: impl Into<String>,
    ) -> EditOutcome {
        let value = value.into();
        let slot = match table.cell(coord) {
            None => {
                debug!(
                    key = %key,
                    owner = %owner,
                    cell = %coord,
                    rows = table.row_count(),
                    cols = table.column_count(),
                    "Ignored out-of-range edit"
                );
                return EditOutcome::OutOfRange;
            }
            Some(original) if is_unchanged(original, &value) => match self.slot(key, owner) {
                Some(slot) => slot,
                None => return EditOutcome::Reverted,
            },
            Some(_) => self.slot_or_create(key, owner),
        };

        let outcome = slot.lock().set(table, coord, value);
        trace!(key = %key, owner = %owner, cell = %coord, ?outcome, "Cell edit");
        outcome
    }

    /// Replace the whole overlay of `(key, owner)` with `edits`
    pub fn replace_all(
        &self,
        table: &Table,
        key: &DatasetKey,
        owner: &OwnerId,
        edits: impl IntoIterator<Item = (CellCoord, String)>,
    ) -> ReplaceSummary {
        let mut next = EditOverlay::new();
        let summary = next.replace(table, edits);

        let slot = if summary.kept == 0 {
            self.slot(key, owner)
        } else {
            Some(self.slot_or_create(key, owner))
        };
        if let Some(slot) = slot {
            *slot.lock() = next;
        }

        debug!(
            key = %key,
            owner = %owner,
            kept = summary.kept,
            reverted = summary.reverted,
            out_of_range = summary.out_of_range,
            "Replaced edit set"
        );
        summary
    }

    /// Edits of `(key, owner)` inside a row window
    pub fn page(&self, key: &DatasetKey, owner: &OwnerId, rows: Range<usize>) -> BTreeMap<CellCoord, String> {
        self.slot(key, owner)
            .map(|slot| slot.lock().page(rows))
            .unwrap_or_default()
    }

    /// Every edit of `(key, owner)`
    pub fn all(&self, key: &DatasetKey, owner: &OwnerId) -> BTreeMap<CellCoord, String> {
        self.slot(key, owner)
            .map(|slot| slot.lock().to_map())
            .unwrap_or_default()
    }

    pub fn edit_count(&self, key: &DatasetKey, owner: &OwnerId) -> usize {
        self.slot(key, owner)
            .map(|slot| slot.lock().len())
            .unwrap_or(0)
    }

    /// Forget the edits of one session on one dataset
    pub fn clear(&self, key: &DatasetKey, owner: &OwnerId) {
        if self
            .slots
            .write()
            .remove(&(key.clone(), owner.clone()))
            .is_some()
        {
            debug!(key = %key, owner = %owner, "Cleared edits");
        }
    }

    /// Forget every session's edits on a dataset (after cache eviction)
    pub fn drop_dataset(&self, key: &DatasetKey) {
        let mut slots = self.slots.write();
        let before = slots.len();
        slots.retain(|(k, _), _| k != key);
        let removed = before - slots.len();
        if removed > 0 {
            debug!(key = %key, overlays = removed, "Dropped overlays of evicted dataset");
        }
    }

    /// Number of `(dataset, owner)` overlays currently held
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &DatasetKey, owner: &OwnerId) -> Option<Arc<Mutex<EditOverlay>>> {
        self.slots
            .read()
            .get(&(key.clone(), owner.clone()))
            .cloned()
    }

    fn slot_or_create(&self, key: &DatasetKey, owner: &OwnerId) -> Arc<Mutex<EditOverlay>> {
        if let Some(slot) = self.slot(key, owner) {
            return slot;
        }
        self.slots
            .write()
            .entry((key.clone(), owner.clone()))
            .or_default()
            .clone()
    }
}
