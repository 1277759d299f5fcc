// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

//! Bridge from store notifications to a widget toolkit's table model.
//!
//! A toolkit binding implements [`TableSink`] on its model type and calls
//! [`TableAdapter::pump`] from its UI thread, e.g. on a timer or after a
//! wake-up. The sink then reads cells back through the [`HistoryStore`].
//!
//! [`HistoryStore`]: crate::store::HistoryStore

use std::time::Duration;

use crate::columns::Column;
use crate::events::{EventSubscriber, HistoryEvent};
use crate::store::HistoryStore;

pub trait TableSink {
    /// Rows `first..=last` now exist.
    fn rows_inserted(&mut self, first: usize, last: usize);
    /// `columns` of `row` hold new values.
    fn row_changed(&mut self, row: usize, columns: &[Column]);
    /// Everything previously shown is gone.
    fn reset(&mut self);
}

pub struct TableAdapter<S> {
    events: EventSubscriber,
    sink: S,
}

impl<S: TableSink> TableAdapter<S> {
    /// Attach `sink` to all events published by `store` from now on.
    pub fn attach(store: &HistoryStore, sink: S) -> Self {
        Self {
            events: store.subscribe(),
            sink,
        }
    }

    pub fn from_subscriber(events: EventSubscriber, sink: S) -> Self {
        Self { events, sink }
    }

    /// Forward every queued event to the sink, in order. Returns the number delivered.
    pub fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(event) = self.events.try_recv() {
            self.dispatch(&event);
            delivered += 1;
        }
        delivered
    }

    /// Like [`pump`](Self::pump), but wait up to `timeout` for the first event.
    pub fn pump_timeout(&mut self, timeout: Duration) -> usize {
        match self.events.recv_timeout(timeout) {
            Some(event) => {
                self.dispatch(&event);
                1 + self.pump()
            }
            None => 0,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn dispatch(&mut self, event: &HistoryEvent) {
        match event {
            HistoryEvent::RowsInserted { first, last } => self.sink.rows_inserted(*first, *last),
            HistoryEvent::RowChanged { row, columns } => self.sink.row_changed(*row, columns),
            HistoryEvent::Reset { .. } => self.sink.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::HistoryEntry;
    use crate::transaction::{Request, Response};

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl TableSink for Recorder {
        fn rows_inserted(&mut self, first: usize, last: usize) {
            self.calls.push(format!("insert {first}..={last}"));
        }

        fn row_changed(&mut self, row: usize, columns: &[Column]) {
            let labels: Vec<&str> = columns.iter().map(|c| c.label()).collect();
            self.calls.push(format!("change {row} {}", labels.join(",")));
        }

        fn reset(&mut self) {
            self.calls.push("reset".to_string());
        }
    }

    fn entry(id: i64) -> HistoryEntry {
        HistoryEntry::new(id, Request::new("GET", "http://example.com/").expect("request"))
    }

    #[test]
    fn forwards_events_in_mutation_order() {
        let store = HistoryStore::new();
        let mut adapter = TableAdapter::attach(&store, Recorder::default());

        store.append(entry(1)).expect("append");
        store.append(entry(2)).expect("append");
        store
            .update(2, Response::new("HTTP/1.1", 200), None)
            .expect("update");
        store.clear();

        assert_eq!(adapter.pump(), 4);
        assert_eq!(
            adapter.sink().calls,
            [
                "insert 0..=0",
                "insert 1..=1",
                "change 1 Edit,Status,Length",
                "reset",
            ]
        );
        assert_eq!(adapter.pump(), 0);
    }

    #[test]
    fn pump_timeout_returns_zero_when_idle() {
        let store = HistoryStore::new();
        let mut adapter = TableAdapter::attach(&store, Recorder::default());
        assert_eq!(adapter.pump_timeout(Duration::from_millis(10)), 0);

        store.append(entry(1)).expect("append");
        assert_eq!(adapter.pump_timeout(Duration::from_millis(100)), 1);
        assert_eq!(adapter.into_sink().calls, ["insert 0..=0"]);
    }

    #[test]
    fn sink_sees_state_at_least_as_new_as_event() {
        struct Checker<'a> {
            store: &'a HistoryStore,
            seen_rows: usize,
        }

        impl TableSink for Checker<'_> {
            fn rows_inserted(&mut self, _first: usize, last: usize) {
                assert!(self.store.row_count() > last);
                self.seen_rows = last + 1;
            }
            fn row_changed(&mut self, row: usize, _columns: &[Column]) {
                assert!(!self.store.cell_value(row, Column::Status.index()).is_empty());
            }
            fn reset(&mut self) {
                self.seen_rows = 0;
            }
        }

        let store = HistoryStore::new();
        let sub = store.subscribe();
        store.append(entry(1)).expect("append");
        store
            .update(1, Response::new("HTTP/1.1", 204), None)
            .expect("update");

        let mut adapter = TableAdapter::from_subscriber(
            sub,
            Checker {
                store: &store,
                seen_rows: 0,
            },
        );
        assert_eq!(adapter.pump(), 2);
        assert_eq!(adapter.sink_mut().seen_rows, 1);
    }
}
