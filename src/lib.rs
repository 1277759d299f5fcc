// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

//! Transaction history for an intercepting HTTP proxy.
//!
//! Capture threads append finished transactions to a [`HistoryStore`] and
//! replace responses when a user edits or replays one. A presentation layer
//! reads the store as an eight-column table and follows it through
//! [`HistoryEvent`] notifications instead of polling.

pub mod adapter;
pub mod columns;
pub mod config;
pub mod entry;
pub mod error;
pub mod events;
pub mod http;
pub mod store;
pub mod transaction;

pub use crate::adapter::{TableAdapter, TableSink};
pub use crate::columns::{Alignment, CellValue, Column, COLUMN_COUNT};
pub use crate::config::Config;
pub use crate::entry::{EntryDetail, HistoryEntry};
pub use crate::error::{HistoryError, Result};
pub use crate::events::{EventBus, EventSubscriber, HistoryEvent};
pub use crate::store::{HistoryStore, StoreStats};
pub use crate::transaction::{render_request, render_response, Headers, Request, Response};
