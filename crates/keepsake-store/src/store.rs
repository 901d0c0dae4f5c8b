//! The journal's authoritative record collection.
//!
//! [`MemoryStore`] owns the newest-first list of [`MemoryRecord`]s, mirrors it
//! to a [`SlotStorage`] slot after every mutation, and answers the gallery
//! and search queries. It is built once at startup with [`MemoryStore::load`]
//! and handed by reference to whoever renders it.
//!
//! Persistence is best-effort: a failed write is logged and queued as a
//! warning (see [`MemoryStore::drain_warnings`]) while the in-memory list
//! stays authoritative for the rest of the session.
//!
//! # Example
//!
//! ```rust
//! use keepsake_store::storage::{InMemorySlotStorage, DEFAULT_SLOT};
//! use keepsake_store::store::{MemoryStore, SearchQuery};
//! use keepsake_types::KindFilter;
//!
//! let store = MemoryStore::load(Box::new(InMemorySlotStorage::new()), DEFAULT_SLOT);
//! assert!(store.is_empty());
//! assert!(store.search(&SearchQuery::default()).is_empty());
//! assert_eq!(store.filter_by_type(KindFilter::All).count(), 0);
//! ```

use chrono::{NaiveDate, Utc};
use keepsake_types::{
    Category, CategoryFilter, KindFilter, MemoryEdit, MemoryId, MemoryRecord, RawMemory,
    ValidationError,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::bundle::{self, ExportBundle};
use crate::storage::{SlotStorage, StorageError};

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that refuse a store operation. The store is unchanged when one is
/// returned.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Memory not found: {0}")]
    NotFound(MemoryId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Import failed: {0}")]
    Import(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Query types
// ─────────────────────────────────────────────────────────────────────────────

/// Search criteria. Every empty dimension is unconstrained; the rest are
/// combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    pub category: Option<Category>,
    pub date: Option<NaiveDate>,
}

impl SearchQuery {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Default::default() }
    }

    pub fn in_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        self.text.trim().is_empty() && self.category.is_none() && self.date.is_none()
    }
}

/// The presentation's active gallery and search settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterContext {
    pub kind: KindFilter,
    pub search: SearchQuery,
}

/// Outcome of a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub accepted: usize,
    pub rejected: usize,
    pub ids: Vec<MemoryId>,
}

// ─────────────────────────────────────────────────────────────────────────────
// MemoryStore
// ─────────────────────────────────────────────────────────────────────────────

pub struct MemoryStore {
    records: Vec<MemoryRecord>,
    storage: Box<dyn SlotStorage>,
    slot: String,
    last_id: u64,
    context: FilterContext,
    warnings: Vec<StorageError>,
    unsaved: bool,
}

impl MemoryStore {
    /// Build the store from whatever the slot currently holds.
    ///
    /// A missing slot is an empty journal. An unreadable slot also yields an
    /// empty journal, with the failure logged and queued as a warning.
    pub fn load(storage: Box<dyn SlotStorage>, slot: impl Into<String>) -> Self {
        let slot = slot.into();
        let mut warnings = Vec::new();

        let snapshot = match storage.read(&slot) {
            Ok(None) => Snapshot::default(),
            Ok(Some(text)) => match decode_snapshot(&text) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    error!(slot = %slot, error = %e, "stored journal is malformed; starting empty");
                    warnings.push(e);
                    Snapshot::default()
                }
            },
            Err(e) => {
                error!(slot = %slot, error = %e, "failed to read journal; starting empty");
                warnings.push(e);
                Snapshot::default()
            }
        };

        let mut store = Self {
            records: Vec::new(),
            storage,
            slot,
            last_id: 0,
            context: FilterContext::default(),
            warnings,
            unsaved: false,
        };
        store.adopt(snapshot);
        info!(slot = %store.slot, memories = store.records.len(), "journal loaded");
        store
    }

    /// Install loaded records, reassigning any id that is missing or repeated.
    ///
    /// Repaired ids are written back at once, except for legacy snapshots:
    /// those stay untouched in the slot until the next mutation.
    fn adopt(&mut self, snapshot: Snapshot) {
        let mut repaired = 0usize;
        for mut record in snapshot.records {
            if !record.id.is_assigned() || self.contains(record.id) {
                record.id = self.fresh_id();
                repaired += 1;
            }
            self.last_id = self.last_id.max(record.id.0);
            self.records.push(record);
        }
        if repaired > 0 && !snapshot.legacy {
            warn!(repaired, "reassigned duplicate or missing ids in stored journal");
            self.persist();
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, newest first.
    pub fn records(&self) -> &[MemoryRecord] {
        &self.records
    }

    pub fn get(&self, id: MemoryId) -> Option<&MemoryRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: MemoryId) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    // ── Mutations ────────────────────────────────────────────────────────────

    /// Insert `record` at the front and persist.
    ///
    /// The record keeps its id only if it has one and nobody else does.
    pub fn add(&mut self, record: MemoryRecord) -> MemoryId {
        let id = self.insert_front(record);
        self.persist();
        id
    }

    /// Insert every record of one upload, then persist once.
    ///
    /// Each record goes to the front in turn, so the last one ends up first.
    pub fn add_all(&mut self, records: Vec<MemoryRecord>) -> Vec<MemoryId> {
        let ids = records.into_iter().map(|r| self.insert_front(r)).collect();
        self.persist();
        ids
    }

    fn insert_front(&mut self, mut record: MemoryRecord) -> MemoryId {
        if !record.id.is_assigned() || self.contains(record.id) {
            record.id = self.fresh_id();
        }
        self.last_id = self.last_id.max(record.id.0);
        let id = record.id;
        debug!(%id, title = %record.title, kind = %record.kind, "memory added");
        self.records.insert(0, record);
        id
    }

    /// Delete the record with `id`. Returns whether anything was removed;
    /// an unknown id is not an error.
    pub fn remove(&mut self, id: MemoryId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        let removed = self.records.len() != before;
        if removed {
            debug!(%id, "memory removed");
        }
        self.persist();
        removed
    }

    /// Swap the record `id` for an edited copy.
    ///
    /// The edit is validated before anything changes, and the removal of the
    /// original and insertion of its replacement happen in a single
    /// mutation. The replacement gets a fresh id and goes to the front.
    pub fn replace(&mut self, id: MemoryId, edit: &MemoryEdit) -> Result<MemoryId, StoreError> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let mut replacement = edit.apply_to(&self.records[index])?;
        replacement.id = self.fresh_id();
        let new_id = replacement.id;
        self.last_id = self.last_id.max(new_id.0);

        self.records.remove(index);
        self.records.insert(0, replacement);
        debug!(old = %id, new = %new_id, "memory replaced");
        self.persist();
        Ok(new_id)
    }

    /// Validate and add the candidates of an import bundle.
    ///
    /// Invalid candidates are dropped. Survivors get fresh ids and are
    /// prepended in their original relative order. When nothing survives the
    /// store is left untouched and an error is returned.
    pub fn import_bundle(&mut self, candidates: Vec<RawMemory>) -> Result<ImportReport, StoreError> {
        let now = Utc::now();
        let mut accepted = Vec::with_capacity(candidates.len());
        let mut rejected = 0usize;
        for (index, raw) in candidates.into_iter().enumerate() {
            match raw.validate(now) {
                Ok(record) => accepted.push(record),
                Err(e) => {
                    warn!(index, reason = %e, "dropping invalid import candidate");
                    rejected += 1;
                }
            }
        }

        if accepted.is_empty() {
            return Err(StoreError::Import(format!(
                "No valid memories found in the file ({rejected} rejected)"
            )));
        }

        let mut ids = Vec::with_capacity(accepted.len());
        for record in &mut accepted {
            record.id = self.fresh_id_excluding(&ids);
            self.last_id = self.last_id.max(record.id.0);
            ids.push(record.id);
        }

        let count = accepted.len();
        accepted.append(&mut self.records);
        self.records = accepted;
        info!(accepted = count, rejected, "import applied");
        self.persist();

        Ok(ImportReport { accepted: count, rejected, ids })
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    /// Lazy view of the records of one kind, in store order.
    pub fn filter_by_type(&self, filter: KindFilter) -> impl Iterator<Item = &MemoryRecord> + '_ {
        self.records.iter().filter(move |r| filter.matches(r.kind))
    }

    /// Records matching every non-empty dimension of `query`, in store order.
    pub fn search(&self, query: &SearchQuery) -> Vec<&MemoryRecord> {
        let needle = query.text.trim().to_lowercase();
        self.records
            .iter()
            .filter(|r| r.matches_text(&needle))
            .filter(|r| query.category.as_ref().is_none_or(|c| &r.category == c))
            .filter(|r| query.date.is_none_or(|d| r.date == d))
            .collect()
    }

    /// Bundle the records in `scope` for export.
    pub fn export_subset(&self, scope: &CategoryFilter) -> ExportBundle {
        let memories: Vec<MemoryRecord> = self
            .records
            .iter()
            .filter(|r| scope.matches(&r.category))
            .cloned()
            .collect();
        info!(memories = memories.len(), category = ?bundle_category(scope), "export prepared");
        ExportBundle::new(scope, memories)
    }

    /// How many records each category holds, built-ins first then custom
    /// categories in order of first appearance.
    pub fn category_counts(&self) -> Vec<(Category, usize)> {
        let mut counts: Vec<(Category, usize)> =
            Category::BUILT_IN.iter().cloned().map(|c| (c, 0)).collect();
        for record in &self.records {
            match counts.iter_mut().find(|(c, _)| c == &record.category) {
                Some((_, n)) => *n += 1,
                None => counts.push((record.category.clone(), 1)),
            }
        }
        counts
    }

    // ── Filter context ───────────────────────────────────────────────────────

    pub fn filter_context(&self) -> &FilterContext {
        &self.context
    }

    pub fn set_kind_filter(&mut self, kind: KindFilter) {
        self.context.kind = kind;
    }

    pub fn set_query(&mut self, text: impl Into<String>) {
        self.context.search.text = text.into();
    }

    pub fn set_category_filter(&mut self, category: Option<Category>) {
        self.context.search.category = category;
    }

    pub fn set_date_filter(&mut self, date: Option<NaiveDate>) {
        self.context.search.date = date;
    }

    /// Gallery view under the active kind filter.
    pub fn visible(&self) -> impl Iterator<Item = &MemoryRecord> + '_ {
        self.filter_by_type(self.context.kind)
    }

    /// Search with the active query, category and date.
    pub fn search_active(&self) -> Vec<&MemoryRecord> {
        self.search(&self.context.search)
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    /// Write the whole collection to the slot now.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.records)?;
        self.storage.write(&self.slot, &json)?;
        self.unsaved = false;
        Ok(())
    }

    fn persist(&mut self) {
        if let Err(e) = self.flush() {
            error!(slot = %self.slot, error = %e, "failed to persist journal; keeping in-memory copy");
            self.unsaved = true;
            self.warnings.push(e);
        }
    }

    /// Whether the last mutation has not reached the slot yet.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Take the persistence problems queued since the last call.
    pub fn drain_warnings(&mut self) -> Vec<StorageError> {
        std::mem::take(&mut self.warnings)
    }

    fn fresh_id(&self) -> MemoryId {
        self.fresh_id_excluding(&[])
    }

    /// Next id after the clock and the highest id seen, skipping ids in use.
    /// Once the id space above is exhausted, the lowest free id is used.
    fn fresh_id_excluding(&self, taken: &[MemoryId]) -> MemoryId {
        let in_use = |id: MemoryId| self.contains(id) || taken.contains(&id);
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let mut candidate = now.max(self.last_id.saturating_add(1));
        while in_use(MemoryId(candidate)) {
            match candidate.checked_add(1) {
                Some(next) => candidate = next,
                None => {
                    // at most len + taken ids are in use, so this ends
                    let mut low = 1;
                    while in_use(MemoryId(low)) {
                        low += 1;
                    }
                    return MemoryId(low);
                }
            }
        }
        MemoryId(candidate)
    }
}

/// Records decoded from the slot. `legacy` marks a snapshot salvaged from
/// an older layout.
#[derive(Default)]
struct Snapshot {
    records: Vec<MemoryRecord>,
    legacy: bool,
}

fn bundle_category(scope: &CategoryFilter) -> Option<&str> {
    match scope {
        CategoryFilter::All => None,
        CategoryFilter::Only(c) => Some(c.as_str()),
    }
}

/// Parse a stored snapshot. Snapshots that do not match the current schema
/// (e.g. fractional ids) are salvaged through the import rules.
fn decode_snapshot(text: &str) -> Result<Snapshot, StorageError> {
    match serde_json::from_str::<Vec<MemoryRecord>>(text) {
        Ok(records) => Ok(Snapshot { records, legacy: false }),
        Err(strict) => {
            let raws = bundle::parse_import(text).map_err(|_| StorageError::Serialization(strict))?;
            let now = Utc::now();
            let total = raws.len();
            let mut records = Vec::with_capacity(total);
            for (index, raw) in raws.into_iter().enumerate() {
                match raw.validate(now) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!(index, reason = %e, "legacy record cannot be loaded"),
                }
            }
            let dropped = total - records.len();
            if dropped > 0 {
                warn!(
                    salvaged = records.len(),
                    dropped,
                    "stored journal used a legacy layout; unreadable records will be lost on the next save"
                );
            } else {
                warn!(salvaged = records.len(), "stored journal used a legacy layout");
            }
            Ok(Snapshot { records, legacy: true })
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
