// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

//! Snapshots of intercepted HTTP messages and their raw-text rendering.
//!
//! Headers are kept in a `BTreeMap`, so renderings list them in lexicographic
//! order of header name. The values of a repeated header are concatenated
//! without a separator.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;
use serde::{Serialize, Serializer};
use url::Url;

use crate::error::{HistoryError, Result};

pub type Headers = BTreeMap<String, Vec<String>>;

const DEFAULT_PROTO: &str = "HTTP/1.1";

/// One captured HTTP request.
///
/// `url`, `host` and `target` hold the text exactly as captured. Nothing is
/// normalized: dot-segments, raw spaces and host case survive into the
/// rendering and the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Request {
    pub url: String,
    pub scheme: String,
    pub proto: String,
    pub method: String,
    pub host: String,
    /// `path[?query]` as written on the request line.
    pub target: String,
    pub headers: Headers,
    pub content_length: i64,
    #[serde(serialize_with = "serialize_body")]
    pub body: Vec<u8>,
    /// File extension of the last path segment, lowercased.
    pub extension: String,
    pub has_params: bool,
}

impl Request {
    /// Build a request from a method and an absolute URL.
    ///
    /// The URL must parse as an absolute URL with an authority. `host`,
    /// `target`, `extension` and `has_params` are sliced from the input text.
    pub fn new(method: impl Into<String>, url: &str) -> Result<Self> {
        let invalid =
            |reason: String| HistoryError::InvalidInput(format!("invalid url {url:?}: {reason}"));
        let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
        let (_, rest) = url
            .split_once("://")
            .ok_or_else(|| invalid("missing authority".into()))?;

        let authority_end = rest
            .find(|c: char| matches!(c, '/' | '?' | '#'))
            .unwrap_or(rest.len());
        let (authority, remainder) = rest.split_at(authority_end);
        let host = authority
            .rsplit_once('@')
            .map_or(authority, |(_, host)| host)
            .to_string();
        let target = remainder.split_once('#').map_or(remainder, |(t, _)| t);

        let mut request = Self {
            url: url.to_string(),
            scheme: parsed.scheme().to_string(),
            proto: DEFAULT_PROTO.to_string(),
            method: method.into(),
            host,
            target: String::new(),
            headers: Headers::new(),
            content_length: 0,
            body: Vec::new(),
            extension: String::new(),
            has_params: false,
        };
        request.set_target(target);
        Ok(request)
    }

    pub fn with_proto(mut self, proto: impl Into<String>) -> Self {
        self.proto = proto.into();
        self
    }

    /// Override the `Host` value, e.g. when the header differs from the URL authority.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Replace the request target with the one read off the request line.
    /// `extension` and `has_params` follow it.
    pub fn with_target(mut self, target: impl AsRef<str>) -> Self {
        self.set_target(target.as_ref());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.entry(name.into()).or_default().push(value.into());
        self
    }

    /// Set the body; `content_length` follows the body size.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self.content_length = self.body.len() as i64;
        self
    }

    pub fn request_target(&self) -> &str {
        &self.target
    }

    pub fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path)
    }

    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, query)| query)
    }

    fn set_target(&mut self, target: &str) {
        self.target = if target.starts_with('/') || target == "*" {
            target.to_string()
        } else {
            format!("/{target}")
        };
        self.has_params = self.query().is_some_and(|q| !q.is_empty());
        let last_segment = self.path().rsplit('/').next().unwrap_or_default();
        self.extension = last_segment
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {} {}\nHost: {}",
            self.method,
            self.request_target(),
            self.proto,
            self.host
        )?;
        write_headers(f, &self.headers)?;
        write_body(f, &self.body)
    }
}

/// One captured HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub proto: String,
    /// Status line text after the protocol, e.g. `200 OK`.
    pub status: String,
    pub status_code: u16,
    pub headers: Headers,
    pub content_length: i64,
    #[serde(serialize_with = "serialize_body")]
    pub body: Vec<u8>,
}

impl Response {
    /// Build a response whose status text is the code plus its canonical reason phrase.
    pub fn new(proto: impl Into<String>, status_code: u16) -> Self {
        let reason = tiny_http::StatusCode(status_code).default_reason_phrase();
        Self {
            proto: proto.into(),
            status: format!("{status_code} {reason}"),
            status_code,
            headers: Headers::new(),
            content_length: 0,
            body: Vec::new(),
        }
    }

    /// Replace the status text verbatim, keeping the numeric code.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.entry(name.into()).or_default().push(value.into());
        self
    }

    /// Set the body; `content_length` follows the body size.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self.content_length = self.body.len() as i64;
        self
    }

    /// Set the declared length independently of the body, e.g. for a HEAD response.
    pub fn with_content_length(mut self, content_length: i64) -> Self {
        self.content_length = content_length;
        self
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.proto, self.status)?;
        write_headers(f, &self.headers)?;
        // Always emitted, even when the header map carries its own Content-Length.
        writeln!(f, "Content-Length: {}", self.content_length)?;
        write_body(f, &self.body)
    }
}

/// Raw text of a request, or an empty string when there is none.
pub fn render_request(request: Option<&Request>) -> String {
    request.map(ToString::to_string).unwrap_or_default()
}

/// Raw text of a response, or an empty string when there is none.
pub fn render_response(response: Option<&Response>) -> String {
    response.map(ToString::to_string).unwrap_or_default()
}

fn write_headers(f: &mut fmt::Formatter<'_>, headers: &Headers) -> fmt::Result {
    for (name, values) in headers {
        writeln!(f, "{}: {}", name, values.concat())?;
    }
    Ok(())
}

fn write_body(f: &mut fmt::Formatter<'_>, body: &[u8]) -> fmt::Result {
    if body.is_empty() {
        return Ok(());
    }
    write!(f, "\n{}", String::from_utf8_lossy(body))
}

fn serialize_body<S: Serializer>(
    body: &[u8],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(body))
}
