//! Request and response messages and their canonical text form
//!
//! Every message serializes to the same shape:
//!
//! ```text
//! <start line>\r\n
//! <name>: <value>\r\n      (one per header, insertion order)
//! \r\n
//! <body bytes>
//! ```
//!
//! The head must be UTF-8; the body is stored verbatim.

use std::fmt;

use crate::{Result, RewindError};

/// Protocol version used when none is given
pub const DEFAULT_VERSION: &str = "HTTP/1.1";

const CRLF: &[u8] = b"\r\n";
const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Which side of an interaction a message is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Outgoing request
    Request,
    /// Response to a request
    Response,
}

/// Capability shared by requests and responses
///
/// This is what predicates see, so it exposes everything needed to decide
/// whether a message should be stored or replayed.
pub trait Message: fmt::Debug + Send + Sync {
    /// Request or response
    fn kind(&self) -> MessageKind;

    /// First line of the canonical form
    fn start_line(&self) -> String;

    /// Headers in insertion order
    fn headers(&self) -> &[(String, String)];

    /// Raw body
    fn body(&self) -> &[u8];

    /// First header value with the given name, compared case-insensitively
    fn header(&self, name: &str) -> Option<&str> {
        self.headers()
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Serialize to canonical bytes
    fn to_bytes(&self) -> Vec<u8> {
        let start = self.start_line();
        let mut data = Vec::with_capacity(start.len() + self.body().len() + 64);

        data.extend_from_slice(start.as_bytes());
        data.extend_from_slice(CRLF);
        for (name, value) in self.headers() {
            data.extend_from_slice(name.as_bytes());
            data.extend_from_slice(b": ");
            data.extend_from_slice(value.as_bytes());
            data.extend_from_slice(CRLF);
        }
        data.extend_from_slice(CRLF);
        data.extend_from_slice(self.body());

        data
    }

    /// Check that the canonical form can carry this message unchanged
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` if a start-line field or header would not
    /// parse back to the same value
    fn validate(&self) -> Result<()>;

    /// Parse canonical bytes
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` if the data is not in canonical form
    fn parse(data: &[u8]) -> Result<Self>
    where
        Self: Sized;

    /// Downcast to a request
    fn as_request(&self) -> Option<&Request> {
        None
    }

    /// Downcast to a response
    fn as_response(&self) -> Option<&Response> {
        None
    }
}

/// An outgoing request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Request {
    method: String,
    uri: String,
    version: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Request {
    /// Create a request with no headers and an empty body
    ///
    /// The method is normalized to uppercase.
    #[must_use]
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            uri: uri.into(),
            version: DEFAULT_VERSION.to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Replace the protocol version
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Append a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Request method
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Full request target as given
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Protocol version
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Path component of the URI, without scheme, authority, query or fragment
    pub fn path(&self) -> &str {
        let mut target = self.uri.as_str();
        if let Some((_, rest)) = target.split_once("://") {
            target = rest.find('/').map_or("", |i| &rest[i..]);
        }
        let end = target.find(|c: char| c == '?' || c == '#').unwrap_or(target.len());
        match &target[..end] {
            "" => "/",
            path => path,
        }
    }

    /// Query string, if any
    pub fn query(&self) -> Option<&str> {
        let (_, rest) = self.uri.split_once('?')?;
        Some(rest.split_once('#').map_or(rest, |(query, _)| query))
    }
}

impl Message for Request {
    fn kind(&self) -> MessageKind {
        MessageKind::Request
    }

    fn start_line(&self) -> String {
        format!("{} {} {}", self.method, self.uri, self.version)
    }

    fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    fn validate(&self) -> Result<()> {
        check_word("method", &self.method)?;
        check_word("URI", &self.uri)?;
        check_word("version", &self.version)?;
        check_headers(&self.headers)
    }

    fn parse(data: &[u8]) -> Result<Self> {
        let (start, headers, body) = split_message(data)?;

        let mut parts = start.splitn(3, ' ');
        let (Some(method), Some(uri), Some(version)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(RewindError::InvalidMessage(format!(
                "Malformed request line: {start:?}"
            )));
        };
        if method.is_empty() || uri.is_empty() || version.is_empty() {
            return Err(RewindError::InvalidMessage(format!(
                "Malformed request line: {start:?}"
            )));
        }

        Ok(Self {
            method: method.to_string(),
            uri: uri.to_string(),
            version: version.to_string(),
            headers,
            body: body.to_vec(),
        })
    }

    fn as_request(&self) -> Option<&Request> {
        Some(self)
    }
}

/// A response to a request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Response {
    version: String,
    status: u16,
    reason: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    /// Create a response with the canonical reason phrase for `status`
    #[must_use]
    pub fn new(status: u16) -> Self {
        let reason = hyper::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default();

        Self {
            version: DEFAULT_VERSION.to_string(),
            status,
            reason: reason.to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Replace the protocol version
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Replace the reason phrase
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Append a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Reason phrase
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Protocol version
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl Message for Response {
    fn kind(&self) -> MessageKind {
        MessageKind::Response
    }

    fn start_line(&self) -> String {
        if self.reason.is_empty() {
            format!("{} {}", self.version, self.status)
        } else {
            format!("{} {} {}", self.version, self.status, self.reason)
        }
    }

    fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    fn validate(&self) -> Result<()> {
        check_word("version", &self.version)?;
        check_line("reason phrase", &self.reason)?;
        check_headers(&self.headers)
    }

    fn parse(data: &[u8]) -> Result<Self> {
        let (start, headers, body) = split_message(data)?;

        let mut parts = start.splitn(3, ' ');
        let version = parts.next().unwrap_or_default();
        let status = parts
            .next()
            .and_then(|s| s.parse::<u16>().ok())
            .ok_or_else(|| {
                RewindError::InvalidMessage(format!("Malformed status line: {start:?}"))
            })?;
        if version.is_empty() {
            return Err(RewindError::InvalidMessage(format!(
                "Malformed status line: {start:?}"
            )));
        }

        Ok(Self {
            version: version.to_string(),
            status,
            reason: parts.next().unwrap_or_default().to_string(),
            headers,
            body: body.to_vec(),
        })
    }

    fn as_response(&self) -> Option<&Response> {
        Some(self)
    }
}

macro_rules! display_as_text {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
                }
            }
        )*
    };
}

display_as_text!(Request, Response);

/// Start-line fields are separated by spaces, so they cannot contain any
fn check_word(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(RewindError::InvalidMessage(format!("Empty {field}")));
    }
    if value.contains(|c: char| c.is_ascii_whitespace()) {
        return Err(RewindError::InvalidMessage(format!(
            "Whitespace in {field}: {value:?}"
        )));
    }
    Ok(())
}

/// Free text must stay on its own line
fn check_line(field: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(RewindError::InvalidMessage(format!(
            "Line break in {field}: {value:?}"
        )));
    }
    Ok(())
}

fn check_headers(headers: &[(String, String)]) -> Result<()> {
    for (name, value) in headers {
        if name.is_empty() || name.contains(':') {
            return Err(RewindError::InvalidMessage(format!(
                "Invalid header name: {name:?}"
            )));
        }
        check_line("header name", name)?;
        check_line("header value", value)?;
    }
    Ok(())
}

type Head<'a> = (&'a str, Vec<(String, String)>, &'a [u8]);

/// Split canonical bytes into start line, headers and body
fn split_message(data: &[u8]) -> Result<Head<'_>> {
    let end = data
        .windows(HEAD_TERMINATOR.len())
        .position(|window| window == HEAD_TERMINATOR)
        .ok_or_else(|| {
            RewindError::InvalidMessage("Missing blank line after headers".to_string())
        })?;

    let head = std::str::from_utf8(&data[..end])
        .map_err(|e| RewindError::InvalidMessage(format!("Head is not UTF-8: {e}")))?;
    let body = &data[end + HEAD_TERMINATOR.len()..];

    let mut lines = head.split("\r\n");
    let start = lines.next().unwrap_or_default();
    if start.is_empty() {
        return Err(RewindError::InvalidMessage("Empty start line".to_string()));
    }

    let mut headers = Vec::new();
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            return Err(RewindError::InvalidMessage(format!(
                "Malformed header line: {line:?}"
            )));
        };
        if name.is_empty() {
            return Err(RewindError::InvalidMessage(format!(
                "Header without a name: {line:?}"
            )));
        }
        let value = value.strip_prefix(' ').unwrap_or(value);
        headers.push((name.to_string(), value.to_string()));
    }

    Ok((start, headers, body))
}
