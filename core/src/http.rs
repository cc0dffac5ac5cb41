//! HTTP request and response types exchanged with the transport client.
//!
//! # Design
//! The core never touches the network. It assembles an immutable `Request`,
//! hands it to a `transport::Client`, and receives a `Response` back. The
//! response body is a one-shot reader: it is either consumed by the decoder,
//! read fully into bytes, or handed to the caller unread.
//!
//! `RequestDraft` is the only mutable form of a request. It exists between
//! encoding and dispatch so request interceptors can adjust it; `build`
//! freezes it.

use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            "TRACE" => Ok(HttpMethod::Trace),
            other => Err(format!("unknown http method: {other}")),
        }
    }
}

/// A header name with its ordered values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub values: Vec<String>,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Insert `header`, replacing any existing header with the same name
/// (case-insensitively) in place so declaration order is kept.
pub fn merge_header(headers: &mut Vec<Header>, header: Header) {
    match headers.iter_mut().find(|h| h.is(&header.name)) {
        Some(existing) => *existing = header,
        None => headers.push(header),
    }
}

/// Per-request transport options. Enforced by the transport client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub follow_redirects: bool,
}

impl RequestOptions {
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            read_timeout: Self::DEFAULT_READ_TIMEOUT,
            follow_redirects: true,
        }
    }
}

/// An immutable HTTP request, built once per invocation attempt sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    uri: String,
    method: HttpMethod,
    headers: Vec<Header>,
    options: RequestOptions,
    content: Option<Bytes>,
}

impl Request {
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// First value of the named header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.is(name))
            .and_then(|h| h.values.first())
            .map(String::as_str)
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn content(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }
}

/// Mutable request under construction, visible to request interceptors.
#[derive(Debug, Clone)]
pub struct RequestDraft {
    pub uri: String,
    pub method: HttpMethod,
    pub headers: Vec<Header>,
    pub options: RequestOptions,
    pub content: Option<Bytes>,
}

impl RequestDraft {
    /// Set a header, replacing any same-named header.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        merge_header(&mut self.headers, Header::new(name, value));
        self
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h.is(name))
    }

    pub fn build(self) -> Request {
        Request {
            uri: self.uri,
            method: self.method,
            headers: self.headers,
            options: self.options,
            content: self.content,
        }
    }
}

/// A response body that can be read at most once.
pub struct Body {
    reader: Box<dyn Read + Send>,
}

impl Body {
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self {
            reader: Box::new(reader),
        }
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::from_reader(io::Cursor::new(bytes.into()))
    }

    /// Read the remaining body into memory.
    pub fn bytes(mut self) -> io::Result<Bytes> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    /// Read the remaining body as UTF-8 text.
    pub fn text(mut self) -> io::Result<String> {
        let mut buf = String::new();
        self.reader.read_to_string(&mut buf)?;
        Ok(buf)
    }

    pub fn into_reader(self) -> Box<dyn Read + Send> {
        self.reader
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Body { .. }")
    }
}

/// An HTTP response received from the transport client.
#[derive(Debug)]
pub struct Response {
    status: u16,
    reason: Option<String>,
    headers: Vec<Header>,
    content_length: Option<u64>,
    body: Option<Body>,
}

impl Response {
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.is(name))
            .and_then(|h| h.values.first())
            .map(String::as_str)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Take the body out of the response. Returns `None` on every call after
    /// the first.
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }
}

/// Builder for `Response`, used by transport clients.
#[derive(Debug)]
pub struct ResponseBuilder {
    status: u16,
    reason: Option<String>,
    headers: Vec<Header>,
    content_length: Option<u64>,
    body: Option<Body>,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self {
            status: 200,
            reason: None,
            headers: Vec::new(),
            content_length: None,
            body: None,
        }
    }
}

impl ResponseBuilder {
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Append a value, grouping values of the same header name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        match self.headers.iter_mut().find(|h| h.is(&name)) {
            Some(existing) => existing.values.push(value.into()),
            None => self.headers.push(Header::new(name, value)),
        }
        self
    }

    pub fn content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn build(self) -> Response {
        Response {
            status: self.status,
            reason: self.reason,
            headers: self.headers,
            content_length: self.content_length,
            body: self.body,
        }
    }
}
