// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

//! Read-only HTTP view of a history store, with live updates over SSE.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use chrono::SecondsFormat;
use serde_json::{json, Value as JsonValue};
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::columns::Column;
use crate::config::Config;
use crate::entry::EntryDetail;
use crate::error::{HistoryError, Result};
use crate::store::HistoryStore;
use crate::transaction::{render_request, render_response};

const SSE_HEAD: &str = "HTTP/1.1 200 OK\r\n\
                        Content-Type: text/event-stream\r\n\
                        Cache-Control: no-cache\r\n\
                        Connection: keep-alive\r\n\
                        Access-Control-Allow-Origin: *\r\n\
                        Transfer-Encoding: chunked\r\n\r\n";

type HttpResponse = (u16, Response<std::io::Cursor<Vec<u8>>>);

/// Route outcome before it is turned into a tiny_http response.
#[derive(Debug, PartialEq)]
enum Reply {
    Text(&'static str),
    Json(JsonValue),
    EventStream,
}

pub fn start_http(config: Config, store: Arc<HistoryStore>) -> Result<thread::JoinHandle<()>> {
    let server = Server::http(&config.http_bind_addr)
        .map_err(|e| HistoryError::InvalidInput(format!("http bind error: {e}")))?;
    debug!(addr = %config.http_bind_addr, "history http listening");
    let handle = thread::spawn(move || {
        for request in server.incoming_requests() {
            if let Err(err) = handle_request(request, &store, &config) {
                warn!(error = %err, "http error");
            }
        }
    });
    Ok(handle)
}

fn handle_request(
    request: tiny_http::Request,
    store: &Arc<HistoryStore>,
    config: &Config,
) -> Result<()> {
    let start = Instant::now();
    let method = request.method().clone();
    let request_path = request.url().to_string();

    let (status, response): HttpResponse = match route(&method, &request_path, store, config) {
        Ok(Reply::EventStream) => return handle_sse_stream(request, store, config),
        Ok(Reply::Text(body)) => (
            200,
            Response::from_data(body.as_bytes().to_vec())
                .with_status_code(StatusCode(200))
                .with_header(header("Content-Type", "text/plain")?),
        ),
        Ok(Reply::Json(value)) => (200, json_response(200, &value)?),
        Err(err) => {
            let (code, detail) = map_error(&err);
            (code, json_response(code, &json!({ "error": detail }))?)
        }
    };

    request.respond(response)?;
    debug!(
        method = %method,
        path = %request_path,
        status,
        elapsed_us = start.elapsed().as_micros() as u64,
        "http request"
    );
    Ok(())
}

fn route(method: &Method, raw_url: &str, store: &HistoryStore, config: &Config) -> Result<Reply> {
    let url_str = format!("http://localhost{raw_url}");
    let url = Url::parse(&url_str).map_err(|_| HistoryError::InvalidInput("invalid url".into()))?;
    let segments: Vec<String> = url
        .path_segments()
        .map(|c| c.filter(|s| !s.is_empty()).map(|s| s.to_string()).collect())
        .unwrap_or_default();
    let segments_ref: Vec<&str> = segments.iter().map(|s| s.as_str()).collect();
    let query = parse_query(url.query().unwrap_or(""));

    match (method, segments_ref.as_slice()) {
        (Method::Get, ["healthz"]) => Ok(Reply::Text("ok")),
        (Method::Get, ["v1", "events"]) => Ok(Reply::EventStream),
        (Method::Get, ["v1", "columns"]) => {
            let columns: Vec<JsonValue> = Column::ALL
                .iter()
                .map(|c| {
                    json!({
                        "index": c.index(),
                        "label": c.label(),
                        "alignment": c.alignment(),
                    })
                })
                .collect();
            Ok(Reply::Json(JsonValue::Array(columns)))
        }
        (Method::Get, ["v1", "rows"]) => {
            let offset = parse_usize_param(&query, "offset")?.unwrap_or(0);
            let limit = parse_usize_param(&query, "limit")?
                .unwrap_or(config.page_limit)
                .min(config.page_limit);
            let (total, rows) = store.page(offset, limit);
            Ok(Reply::Json(json!({
                "total": total,
                "offset": offset,
                "rows": rows,
            })))
        }
        (Method::Get, ["v1", "rows", row]) => {
            let row: usize = row
                .parse()
                .map_err(|_| HistoryError::InvalidInput(format!("invalid row {row:?}")))?;
            let detail = store
                .entry_at(row)
                .ok_or_else(|| HistoryError::NotFound(format!("row {row}")))?;
            Ok(Reply::Json(detail_to_json(row, &detail)?))
        }
        (Method::Get, ["v1", "stats"]) => {
            let stats = serde_json::to_value(store.stats())
                .map_err(|e| HistoryError::InvalidInput(format!("json encode error: {e}")))?;
            Ok(Reply::Json(stats))
        }
        _ => Err(HistoryError::NotFound(format!("route {raw_url}"))),
    }
}

fn detail_to_json(row: usize, detail: &EntryDetail) -> Result<JsonValue> {
    let encode = |value: std::result::Result<JsonValue, serde_json::Error>| {
        value.map_err(|e| HistoryError::InvalidInput(format!("json encode error: {e}")))
    };
    Ok(json!({
        "row": row,
        "id": detail.id,
        "captured_at": detail.captured_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        "original_request": encode(serde_json::to_value(&*detail.original_request))?,
        "edited_request": encode(serde_json::to_value(detail.edited_request.as_deref()))?,
        "original_response": encode(serde_json::to_value(detail.original_response.as_deref()))?,
        "edited_response": encode(serde_json::to_value(detail.edited_response.as_deref()))?,
        "raw": {
            "original_request": render_request(Some(&*detail.original_request)),
            "edited_request": render_request(detail.edited_request.as_deref()),
            "original_response": render_response(detail.original_response.as_deref()),
            "edited_response": render_response(detail.edited_response.as_deref()),
        },
    }))
}

fn handle_sse_stream(
    request: tiny_http::Request,
    store: &Arc<HistoryStore>,
    config: &Config,
) -> Result<()> {
    let mut writer = request.into_writer();
    if writer
        .write_all(SSE_HEAD.as_bytes())
        .and_then(|()| writer.flush())
        .is_err()
    {
        debug!("sse client left before the stream opened");
        return Ok(());
    }

    let subscriber = store.subscribe();
    let heartbeat_interval = config.sse_heartbeat;
    let poll = config.sse_poll;

    thread::spawn(move || {
        if write_sse_event(&mut writer, "connected", "{}").is_err() {
            return;
        }

        let mut last_write = Instant::now();
        loop {
            let written = match subscriber.recv_timeout(poll) {
                Some(event) => {
                    let (name, data) = event.to_sse();
                    write_sse_event(&mut writer, name, &data)
                }
                None if last_write.elapsed() >= heartbeat_interval => {
                    write_sse_heartbeat(&mut writer)
                }
                None => continue,
            };
            if written.is_err() {
                break;
            }
            last_write = Instant::now();
        }
        debug!("sse subscriber disconnected");
    });

    Ok(())
}

/// One `event:`/`data:` frame as an HTTP chunk.
fn write_sse_event<W: Write + ?Sized>(
    writer: &mut W,
    event_type: &str,
    data: &str,
) -> std::io::Result<()> {
    let message = format!("event: {event_type}\ndata: {data}\n\n");
    write_chunk(writer, &message)
}

fn write_sse_heartbeat<W: Write + ?Sized>(writer: &mut W) -> std::io::Result<()> {
    write_chunk(writer, ":heartbeat\n\n")
}

fn write_chunk<W: Write + ?Sized>(writer: &mut W, message: &str) -> std::io::Result<()> {
    let chunk = format!("{:x}\r\n{}\r\n", message.len(), message);
    writer.write_all(chunk.as_bytes())?;
    writer.flush()
}

fn json_response(code: u16, value: &JsonValue) -> Result<Response<std::io::Cursor<Vec<u8>>>> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| HistoryError::InvalidInput(format!("json encode error: {e}")))?;
    Ok(Response::from_data(bytes)
        .with_status_code(StatusCode(code))
        .with_header(header("Content-Type", "application/json")?))
}

fn header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes())
        .map_err(|_| HistoryError::InvalidInput(format!("invalid header {name}")))
}

fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

fn parse_usize_param(query: &HashMap<String, String>, key: &str) -> Result<Option<usize>> {
    query
        .get(key)
        .map(|raw| {
            raw.parse::<usize>()
                .map_err(|_| HistoryError::InvalidInput(format!("invalid {key}: {raw:?}")))
        })
        .transpose()
}

fn map_error(err: &HistoryError) -> (u16, String) {
    match err {
        HistoryError::NotFound(_) | HistoryError::UnknownEntry(_) => (404, err.to_string()),
        HistoryError::InvalidInput(_) => (422, err.to_string()),
        HistoryError::DuplicateEntry(_) => (409, err.to_string()),
        HistoryError::Io(_) => (500, err.to_string()),
    }
}
