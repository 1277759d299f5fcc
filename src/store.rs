// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::columns::{self, Alignment, CellValue, Column, COLUMN_COUNT};
use crate::entry::{EntryDetail, HistoryEntry};
use crate::error::{HistoryError, Result};
use crate::events::{EventBus, EventSubscriber, HistoryEvent};
use crate::transaction::{Request, Response};

/// Columns touched when a response is replaced.
const RESPONSE_COLUMNS: [Column; 3] = [Column::Edit, Column::Status, Column::Length];

/// Rows in insertion order plus the ID→row index. Both change together under
/// the store's write lock.
#[derive(Default)]
struct HistoryState {
    rows: Vec<HistoryEntry>,
    index: HashMap<i64, usize>,
}

impl HistoryState {
    fn locate_mut(&mut self, id: i64) -> Option<(usize, &mut HistoryEntry)> {
        let row = *self.index.get(&id)?;
        let entry = self.rows.get_mut(row)?;
        debug_assert_eq!(entry.id, id);
        Some((row, entry))
    }
}

#[derive(Default)]
struct Counters {
    appends_total: AtomicU64,
    updates_total: AtomicU64,
    edits_total: AtomicU64,
    lookup_misses_total: AtomicU64,
    duplicates_total: AtomicU64,
    clears_total: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub rows: usize,
    pub appends_total: u64,
    pub updates_total: u64,
    pub edits_total: u64,
    pub lookup_misses_total: u64,
    pub duplicates_total: u64,
    pub clears_total: u64,
    pub subscribers: usize,
    pub started_at: String,
}

/// Thread-safe, ordered log of intercepted transactions.
///
/// Any number of capture threads may append and update concurrently. Every
/// mutation publishes exactly one [`HistoryEvent`] before releasing the lock.
pub struct HistoryStore {
    state: RwLock<HistoryState>,
    events: Arc<EventBus>,
    counters: Counters,
    started_at: DateTime<Utc>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::with_event_bus(Arc::new(EventBus::new()))
    }

    /// Use a caller-owned bus, e.g. one shared with other publishers.
    pub fn with_event_bus(events: Arc<EventBus>) -> Self {
        Self {
            state: RwLock::new(HistoryState::default()),
            events,
            counters: Counters::default(),
            started_at: Utc::now(),
        }
    }

    pub fn subscribe(&self) -> EventSubscriber {
        self.events.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Append an entry as the last row and return its row index.
    ///
    /// IDs must be unique within the current history; a repeated ID is
    /// rejected without touching the store.
    pub fn append(&self, entry: HistoryEntry) -> Result<usize> {
        let mut state = self.write();
        let id = entry.id;
        if state.index.contains_key(&id) {
            self.counters.duplicates_total.fetch_add(1, Ordering::Relaxed);
            warn!(id, "rejected history entry with duplicate id");
            return Err(HistoryError::DuplicateEntry(id));
        }

        let row = state.rows.len();
        state.rows.push(entry);
        state.index.insert(id, row);
        self.counters.appends_total.fetch_add(1, Ordering::Relaxed);
        debug!(id, row, "appended history entry");

        self.events
            .publish(HistoryEvent::RowsInserted { first: row, last: row });
        Ok(row)
    }

    /// Replace the original response of entry `id`, and its edited response
    /// when one is given. An existing edited response is never cleared.
    pub fn update(
        &self,
        id: i64,
        response: Response,
        edited_response: Option<Response>,
    ) -> Result<usize> {
        let mut state = self.write();
        let Some((row, entry)) = state.locate_mut(id) else {
            return Err(self.lookup_miss(id, "update"));
        };

        entry.original_response = Some(Arc::new(response));
        if let Some(edited) = edited_response {
            entry.edited_response = Some(Arc::new(edited));
        }
        self.counters.updates_total.fetch_add(1, Ordering::Relaxed);
        debug!(id, row, "updated history entry response");

        self.events.publish(HistoryEvent::RowChanged {
            row,
            columns: RESPONSE_COLUMNS.to_vec(),
        });
        Ok(row)
    }

    /// Record a user edit or replay of entry `id`.
    ///
    /// The original request and response stay as captured.
    pub fn record_edit(
        &self,
        id: i64,
        edited_request: Request,
        edited_response: Option<Response>,
    ) -> Result<usize> {
        let mut state = self.write();
        let Some((row, entry)) = state.locate_mut(id) else {
            return Err(self.lookup_miss(id, "edit"));
        };

        entry.edited_request = Some(Arc::new(edited_request));
        if let Some(edited) = edited_response {
            entry.edited_response = Some(Arc::new(edited));
        }
        self.counters.edits_total.fetch_add(1, Ordering::Relaxed);
        debug!(id, row, "recorded history edit");

        self.events.publish(HistoryEvent::RowChanged {
            row,
            columns: vec![Column::Edit],
        });
        Ok(row)
    }

    /// Drop every entry. Returns how many rows were removed.
    pub fn clear(&self) -> usize {
        let mut state = self.write();
        let previous_rows = state.rows.len();
        *state = HistoryState::default();
        self.counters.clears_total.fetch_add(1, Ordering::Relaxed);
        debug!(previous_rows, "cleared history");

        self.events.publish(HistoryEvent::Reset { previous_rows });
        previous_rows
    }

    pub fn row_count(&self) -> usize {
        self.read().rows.len()
    }

    pub fn column_count(&self) -> usize {
        COLUMN_COUNT
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn header_label(&self, column: usize) -> Option<&'static str> {
        Column::from_index(column).map(Column::label)
    }

    pub fn alignment(&self, column: usize) -> Option<Alignment> {
        Column::from_index(column).map(Column::alignment)
    }

    /// Cell at (`row`, `column`); [`CellValue::Empty`] when either is out of range.
    pub fn cell_value(&self, row: usize, column: usize) -> CellValue {
        let Some(column) = Column::from_index(column) else {
            return CellValue::Empty;
        };
        self.read()
            .rows
            .get(row)
            .map(|entry| columns::project(entry, column))
            .unwrap_or_default()
    }

    /// All cells of `row`, read under one lock.
    pub fn row_values(&self, row: usize) -> Option<Vec<CellValue>> {
        let state = self.read();
        let entry = state.rows.get(row)?;
        Some(project_row(entry))
    }

    /// Up to `limit` rows starting at `offset`, with the row count they were read at.
    pub fn page(&self, offset: usize, limit: usize) -> (usize, Vec<Vec<CellValue>>) {
        let state = self.read();
        let rows = state
            .rows
            .iter()
            .skip(offset)
            .take(limit)
            .map(project_row)
            .collect();
        (state.rows.len(), rows)
    }

    pub fn entry_at(&self, row: usize) -> Option<EntryDetail> {
        self.read().rows.get(row).map(HistoryEntry::detail)
    }

    /// Current row of entry `id`.
    pub fn row_of(&self, id: i64) -> Option<usize> {
        self.read().index.get(&id).copied()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            rows: self.row_count(),
            appends_total: self.counters.appends_total.load(Ordering::Relaxed),
            updates_total: self.counters.updates_total.load(Ordering::Relaxed),
            edits_total: self.counters.edits_total.load(Ordering::Relaxed),
            lookup_misses_total: self.counters.lookup_misses_total.load(Ordering::Relaxed),
            duplicates_total: self.counters.duplicates_total.load(Ordering::Relaxed),
            clears_total: self.counters.clears_total.load(Ordering::Relaxed),
            subscribers: self.events.subscriber_count(),
            started_at: self.started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    fn lookup_miss(&self, id: i64, op: &'static str) -> HistoryError {
        self.counters
            .lookup_misses_total
            .fetch_add(1, Ordering::Relaxed);
        warn!(id, op, "no history entry with this id");
        HistoryError::UnknownEntry(id)
    }

    // A panic can only happen before a mutation starts, so a poisoned lock
    // still guards a consistent state.
    fn read(&self) -> RwLockReadGuard<'_, HistoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HistoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn project_row(entry: &HistoryEntry) -> Vec<CellValue> {
    Column::ALL
        .iter()
        .map(|column| columns::project(entry, *column))
        .collect()
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}
