// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

//! Tabular projection of history entries.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::entry::HistoryEntry;

pub const COLUMN_COUNT: usize = 8;

const CHECK_MARK: &str = "✓";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Id,
    Host,
    Method,
    Path,
    Params,
    Edit,
    Status,
    Length,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Leading,
    Center,
}

impl Column {
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::Id,
        Column::Host,
        Column::Method,
        Column::Path,
        Column::Params,
        Column::Edit,
        Column::Status,
        Column::Length,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Column::Id => "ID",
            Column::Host => "Host",
            Column::Method => "Method",
            Column::Path => "Path",
            Column::Params => "Params",
            Column::Edit => "Edit",
            Column::Status => "Status",
            Column::Length => "Length",
        }
    }

    /// Display hint for the presentation layer.
    pub fn alignment(self) -> Alignment {
        match self {
            Column::Method | Column::Params | Column::Edit | Column::Length => Alignment::Center,
            _ => Alignment::Leading,
        }
    }
}

/// A displayable cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Integer(i64),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Integer(v) => write!(f, "{v}"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Empty => serializer.serialize_none(),
            CellValue::Integer(v) => serializer.serialize_i64(*v),
            CellValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Summary value of `entry` for `column`.
///
/// Status and Length always come from the original response; an edit only
/// shows up as the Edit flag.
pub fn project(entry: &HistoryEntry, column: Column) -> CellValue {
    let request = &entry.original_request;
    match column {
        Column::Id => CellValue::Integer(entry.id),
        Column::Host => CellValue::Text(request.host.clone()),
        Column::Method => CellValue::Text(request.method.clone()),
        Column::Path => CellValue::Text(request.path().to_string()),
        Column::Params => flag(request.has_params),
        Column::Edit => flag(entry.is_edited()),
        Column::Status => match &entry.original_response {
            Some(resp) => CellValue::Text(resp.status.clone()),
            None => CellValue::Empty,
        },
        Column::Length => match &entry.original_response {
            Some(resp) => CellValue::Text(resp.content_length.to_string()),
            None => CellValue::Empty,
        },
    }
}

fn flag(set: bool) -> CellValue {
    if set {
        CellValue::Text(CHECK_MARK.to_string())
    } else {
        CellValue::Text(String::new())
    }
}
