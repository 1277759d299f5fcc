// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

use proptest::prelude::*;
use proxy_history::{
    render_request, render_response, CellValue, Column, HistoryEntry, HistoryEvent, HistoryStore,
    Request, Response,
};

fn request(id: i64) -> Request {
    Request::new("GET", &format!("http://example.com/r/{id}?page=1")).expect("request")
}

#[test]
fn append_then_entry_at_returns_original_parts() {
    let store = HistoryStore::new();
    let req = request(1).with_header("Accept", "*/*");
    let resp = Response::new("HTTP/1.1", 200).with_body("hello");

    let row = store
        .append(HistoryEntry::new(1, req.clone()).with_response(resp.clone()))
        .expect("append");

    let detail = store.entry_at(row).expect("entry at row");
    assert_eq!(detail.id, 1);
    assert_eq!(*detail.original_request, req);
    assert_eq!(detail.original_response.as_deref(), Some(&resp));
    assert!(detail.edited_request.is_none());
    assert!(detail.edited_response.is_none());
}

#[test]
fn update_changes_status_length_and_edit_flag() {
    let store = HistoryStore::new();
    let row = store.append(HistoryEntry::new(9, request(9))).expect("append");
    assert_eq!(store.cell_value(row, Column::Status.index()), CellValue::Empty);
    assert_eq!(store.cell_value(row, Column::Length.index()), CellValue::Empty);

    store
        .update(
            9,
            Response::new("HTTP/1.1", 503).with_body("retry later"),
            Some(Response::new("HTTP/1.1", 200)),
        )
        .expect("update");

    assert_eq!(
        store.cell_value(row, Column::Status.index()).to_string(),
        "503 Service Unavailable"
    );
    assert_eq!(store.cell_value(row, Column::Length.index()).to_string(), "11");
    assert_eq!(store.cell_value(row, Column::Edit.index()).to_string(), "✓");
}

#[test]
fn update_on_missing_id_leaves_rows_untouched() {
    let store = HistoryStore::new();
    for id in 0..3 {
        store.append(HistoryEntry::new(id, request(id))).expect("append");
    }
    let before: Vec<_> = (0..3).map(|row| store.row_values(row)).collect();

    assert!(store
        .update(1234, Response::new("HTTP/1.1", 200), None)
        .is_err());

    let after: Vec<_> = (0..3).map(|row| store.row_values(row)).collect();
    assert_eq!(store.row_count(), 3);
    assert_eq!(before, after);
}

#[test]
fn clear_then_append_starts_at_row_zero() {
    let store = HistoryStore::new();
    store.append(HistoryEntry::new(1, request(1))).expect("append");
    store.append(HistoryEntry::new(2, request(2))).expect("append");

    store.clear();
    assert_eq!(store.row_count(), 0);
    assert_eq!(store.append(HistoryEntry::new(3, request(3))).expect("append"), 0);
    assert_eq!(store.cell_value(0, Column::Id.index()), CellValue::Integer(3));
}

#[test]
fn full_row_projection() {
    let store = HistoryStore::new();
    let req = Request::new("DELETE", "https://api.example.com/users/7").expect("request");
    store
        .append(HistoryEntry::new(77, req).with_response(Response::new("HTTP/2", 204)))
        .expect("append");

    let row = store.row_values(0).expect("row");
    let rendered: Vec<String> = row.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        ["77", "api.example.com", "DELETE", "/users/7", "", "", "204 No Content", "0"]
    );
    assert_eq!(store.column_count(), 8);
}

#[test]
fn rendering_examples() {
    let req = Request::new("GET", "http://example.com/a?b=1").expect("request");
    assert_eq!(
        render_request(Some(&req)),
        "GET /a?b=1 HTTP/1.1\nHost: example.com\n"
    );

    let resp = Response::new("HTTP/1.1", 200);
    assert_eq!(
        render_response(Some(&resp)),
        "HTTP/1.1 200 OK\nContent-Length: 0\n"
    );
}

#[test]
fn notifications_follow_mutation_order() {
    let store = HistoryStore::new();
    let sub = store.subscribe();

    store.append(HistoryEntry::new(1, request(1))).expect("append");
    store
        .update(1, Response::new("HTTP/1.1", 200), None)
        .expect("update");
    store.append(HistoryEntry::new(2, request(2))).expect("append");
    store.clear();

    assert_eq!(
        sub.drain(),
        vec![
            HistoryEvent::RowsInserted { first: 0, last: 0 },
            HistoryEvent::RowChanged {
                row: 0,
                columns: vec![Column::Edit, Column::Status, Column::Length],
            },
            HistoryEvent::RowsInserted { first: 1, last: 1 },
            HistoryEvent::Reset { previous_rows: 2 },
        ]
    );
}

#[derive(Debug, Clone)]
enum Op {
    Append,
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![4 => Just(Op::Append), 1 => Just(Op::Clear)]
}

proptest! {
    #[test]
    fn prop_row_count_tracks_appends_since_last_clear(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let store = HistoryStore::new();
        let mut expected = 0usize;
        let mut next_id = 0i64;

        for op in ops {
            match op {
                Op::Append => {
                    let row = store
                        .append(HistoryEntry::new(next_id, request(next_id)))
                        .expect("append");
                    prop_assert_eq!(row, expected);
                    prop_assert_eq!(store.row_of(next_id), Some(row));
                    next_id += 1;
                    expected += 1;
                }
                Op::Clear => {
                    prop_assert_eq!(store.clear(), expected);
                    expected = 0;
                }
            }
            prop_assert_eq!(store.row_count(), expected);
        }
    }

    #[test]
    fn prop_out_of_range_cells_are_empty(rows in 0usize..8, row in 0usize..32, column in 0usize..16) {
        let store = HistoryStore::new();
        for id in 0..rows as i64 {
            store.append(HistoryEntry::new(id, request(id))).expect("append");
        }
        let value = store.cell_value(row, column);
        if row >= rows || column >= 8 {
            prop_assert_eq!(value, CellValue::Empty);
            if row >= rows {
                prop_assert!(store.entry_at(row).is_none());
            }
        } else if column == Column::Id.index() {
            prop_assert_eq!(value, CellValue::Integer(row as i64));
        }
    }
}
