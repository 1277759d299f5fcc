// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::transaction::{Request, Response};

/// One logged transaction, keyed by a producer-assigned ID.
///
/// The parts are shared handles: readers that fetched a part keep seeing the
/// snapshot they fetched even after the store replaces it.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: i64,
    pub original_request: Arc<Request>,
    pub original_response: Option<Arc<Response>>,
    pub edited_request: Option<Arc<Request>>,
    pub edited_response: Option<Arc<Response>>,
    pub captured_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(id: i64, request: Request) -> Self {
        Self {
            id,
            original_request: Arc::new(request),
            original_response: None,
            edited_request: None,
            edited_response: None,
            captured_at: Utc::now(),
        }
    }

    /// Stamp the entry with the time the proxy saw the request, when the
    /// producer captured it earlier than the entry was built.
    pub fn with_captured_at(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = captured_at;
        self
    }

    pub fn with_response(mut self, response: Response) -> Self {
        self.original_response = Some(Arc::new(response));
        self
    }

    pub fn with_edited_request(mut self, request: Request) -> Self {
        self.edited_request = Some(Arc::new(request));
        self
    }

    pub fn with_edited_response(mut self, response: Response) -> Self {
        self.edited_response = Some(Arc::new(response));
        self
    }

    /// The edited request if there is one, else the original.
    pub fn effective_request(&self) -> &Arc<Request> {
        self.edited_request.as_ref().unwrap_or(&self.original_request)
    }

    /// The edited response if there is one, else the original (which may be absent).
    pub fn effective_response(&self) -> Option<&Arc<Response>> {
        self.edited_response
            .as_ref()
            .or(self.original_response.as_ref())
    }

    pub fn is_edited(&self) -> bool {
        self.edited_request.is_some() || self.edited_response.is_some()
    }

    pub fn detail(&self) -> EntryDetail {
        EntryDetail {
            id: self.id,
            original_request: Arc::clone(&self.original_request),
            edited_request: self.edited_request.clone(),
            original_response: self.original_response.clone(),
            edited_response: self.edited_response.clone(),
            captured_at: self.captured_at,
        }
    }
}

/// Full detail of one row, for a detail view.
#[derive(Debug, Clone)]
pub struct EntryDetail {
    pub id: i64,
    pub original_request: Arc<Request>,
    pub edited_request: Option<Arc<Request>>,
    pub original_response: Option<Arc<Response>>,
    pub edited_response: Option<Arc<Response>>,
    pub captured_at: DateTime<Utc>,
}
