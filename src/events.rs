// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

//! Change notifications for history observers.
//!
//! The store publishes one [`HistoryEvent`] per mutation while it still holds
//! its write lock, so subscribers receive events in mutation order and never
//! before the mutation is visible to reads.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::columns::Column;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEvent {
    /// Rows `first..=last` were appended.
    RowsInserted { first: usize, last: usize },
    /// Cells of an existing row changed.
    RowChanged { row: usize, columns: Vec<Column> },
    /// The whole history was cleared; `previous_rows` rows are gone.
    Reset { previous_rows: usize },
}

impl HistoryEvent {
    /// SSE event name and a JSON payload without the `type` tag.
    pub fn to_sse(&self) -> (&'static str, String) {
        let event_type = match self {
            HistoryEvent::RowsInserted { .. } => "rows_inserted",
            HistoryEvent::RowChanged { .. } => "row_changed",
            HistoryEvent::Reset { .. } => "reset",
        };

        let data = match self {
            HistoryEvent::RowsInserted { first, last } => serde_json::json!({
                "first": first,
                "last": last,
            }),
            HistoryEvent::RowChanged { row, columns } => serde_json::json!({
                "row": row,
                "columns": columns.iter().map(|c| c.index()).collect::<Vec<_>>(),
            }),
            HistoryEvent::Reset { previous_rows } => serde_json::json!({
                "previous_rows": previous_rows,
            }),
        };

        (event_type, data.to_string())
    }
}

/// Receiving end of one [`EventBus`] subscription.
pub struct EventSubscriber {
    rx: Receiver<HistoryEvent>,
}

impl EventSubscriber {
    /// `None` once the bus is gone.
    pub fn recv(&self) -> Option<HistoryEvent> {
        self.rx.recv().ok()
    }

    pub fn try_recv(&self) -> Option<HistoryEvent> {
        self.rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<HistoryEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Take every event queued so far.
    pub fn drain(&self) -> Vec<HistoryEvent> {
        self.rx.try_iter().collect()
    }
}

/// Fan-out of history events to any number of subscribers.
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<HistoryEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Only events published after this call are delivered.
    pub fn subscribe(&self) -> EventSubscriber {
        let (tx, rx) = mpsc::channel();
        self.lock().push(tx);
        EventSubscriber { rx }
    }

    /// Senders whose subscriber was dropped are pruned here.
    pub fn publish(&self, event: HistoryEvent) {
        let mut subs = self.lock();
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Sender<HistoryEvent>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
