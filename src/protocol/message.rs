use log::warn;

use crate::protocol::constants::*;
use crate::protocol::ListenerId;
use crate::{Error, Result};

/// Ordered RTSP header list.
///
/// Names keep the case they were inserted with; lookup is case-insensitive
/// per RFC 2326 §4.2.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header list
    pub fn new() -> Self {
        Headers::default()
    }

    /// Append a header, keeping insertion order
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replace the first case-insensitive match, or append
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Look up a header value by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Iterate headers in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parsed CSeq header, if present and numeric
    pub fn cseq(&self) -> Option<u32> {
        self.get(HEADER_CSEQ).and_then(|v| v.trim().parse().ok())
    }

    /// Body length announced by Content-Length; absent means empty body
    pub fn content_length(&self) -> Result<usize> {
        match self.get(HEADER_CONTENT_LENGTH) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| Error::protocol(format!("Invalid Content-Length: {:?}", value))),
            None => Ok(0),
        }
    }

    fn serialize_into(&self, out: &mut Vec<u8>) {
        for (name, value) in &self.entries {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
    }
}

/// An RTSP request (RFC 2326 §6).
#[derive(Debug, Clone, PartialEq)]
pub struct RtspRequest {
    /// RTSP method (OPTIONS, DESCRIBE, SETUP, PLAY, etc.)
    pub method: String,
    /// Request-URI (e.g. `rtsp://host:port/stream/track1`)
    pub uri: String,
    /// Protocol version (expected: `RTSP/1.0`)
    pub version: String,
    /// Headers as ordered (name, value) pairs
    pub headers: Headers,
    /// Message body; length governed by Content-Length
    pub body: Vec<u8>,
    /// Parsed CSeq header; assigned by the listener on send
    pub cseq: u32,
    /// Listener that produced this message
    pub source: Option<ListenerId>,
}

impl RtspRequest {
    /// Create a request with the default protocol version
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        RtspRequest {
            method: method.into(),
            uri: uri.into(),
            version: RTSP_VERSION.to_string(),
            headers: Headers::new(),
            body: Vec::new(),
            cseq: 0,
            source: None,
        }
    }

    /// Append a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a body
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Parse a request start-line: `METHOD URI VERSION`
    pub fn parse_start_line(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(Error::framing(format!("Invalid request line: {:?}", line)));
        }

        let version = parts[2];
        if version != RTSP_VERSION {
            warn!("Peer sent non-{} version: {}", RTSP_VERSION, version);
        }

        Ok(RtspRequest {
            method: parts[0].to_string(),
            uri: parts[1].to_string(),
            version: version.to_string(),
            headers: Headers::new(),
            body: Vec::new(),
            cseq: 0,
            source: None,
        })
    }

    /// Set the sequence number on both the field and the CSeq header
    pub fn set_cseq(&mut self, cseq: u32) {
        self.cseq = cseq;
        self.headers.set(HEADER_CSEQ, cseq.to_string());
    }

    /// Serialize to wire format
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + self.body.len());
        out.extend_from_slice(
            format!("{} {} {}\r\n", self.method, self.uri, self.version).as_bytes(),
        );
        let mut headers = self.headers.clone();
        if !self.body.is_empty() && headers.get(HEADER_CONTENT_LENGTH).is_none() {
            headers.insert(HEADER_CONTENT_LENGTH, self.body.len().to_string());
        }
        headers.serialize_into(&mut out);
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}

/// An RTSP response (RFC 2326 §7).
#[derive(Debug, Clone, PartialEq)]
pub struct RtspResponse {
    pub version: String,
    pub status_code: u16,
    pub reason: String,
    pub headers: Headers,
    pub body: Vec<u8>,
    /// Parsed CSeq header
    pub cseq: u32,
    /// The request this response answers, when correlation succeeded
    pub original_request: Option<Box<RtspRequest>>,
    /// Listener that produced this message
    pub source: Option<ListenerId>,
}

impl RtspResponse {
    /// Create a response with the default protocol version
    pub fn new(status_code: u16, reason: impl Into<String>) -> Self {
        RtspResponse {
            version: RTSP_VERSION.to_string(),
            status_code,
            reason: reason.into(),
            headers: Headers::new(),
            body: Vec::new(),
            cseq: 0,
            original_request: None,
            source: None,
        }
    }

    /// Append a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a body
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Parse a response start-line: `VERSION STATUS REASON`
    ///
    /// The reason phrase may contain spaces and may be absent.
    pub fn parse_start_line(line: &str) -> Result<Self> {
        let mut parts = line.splitn(3, ' ');

        let version = parts
            .next()
            .ok_or_else(|| Error::framing("Empty response line"))?;
        let status = parts
            .next()
            .ok_or_else(|| Error::framing(format!("Missing status code: {:?}", line)))?;
        let reason = parts.next().unwrap_or("").trim();

        let status_code: u16 = status
            .trim()
            .parse()
            .map_err(|_| Error::framing(format!("Invalid status code: {:?}", status)))?;

        if version != RTSP_VERSION {
            warn!("Peer sent non-{} version: {}", RTSP_VERSION, version);
        }

        Ok(RtspResponse {
            version: version.to_string(),
            status_code,
            reason: reason.to_string(),
            headers: Headers::new(),
            body: Vec::new(),
            cseq: 0,
            original_request: None,
            source: None,
        })
    }

    /// Whether the status code is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Serialize to wire format
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + self.body.len());
        out.extend_from_slice(
            format!("{} {} {}\r\n", self.version, self.status_code, self.reason).as_bytes(),
        );
        let mut headers = self.headers.clone();
        if !self.body.is_empty() && headers.get(HEADER_CONTENT_LENGTH).is_none() {
            headers.insert(HEADER_CONTENT_LENGTH, self.body.len().to_string());
        }
        headers.serialize_into(&mut out);
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}

/// A text RTSP message, as delivered to message subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum RtspMessage {
    Request(RtspRequest),
    Response(RtspResponse),
}

impl RtspMessage {
    /// Parse a start-line, discriminating request from response
    pub fn parse_start_line(line: &str) -> Result<Self> {
        if line.starts_with("RTSP/") {
            Ok(RtspMessage::Response(RtspResponse::parse_start_line(line)?))
        } else {
            Ok(RtspMessage::Request(RtspRequest::parse_start_line(line)?))
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, RtspMessage::Request(_))
    }

    pub fn cseq(&self) -> u32 {
        match self {
            RtspMessage::Request(req) => req.cseq,
            RtspMessage::Response(resp) => resp.cseq,
        }
    }

    pub fn headers(&self) -> &Headers {
        match self {
            RtspMessage::Request(req) => &req.headers,
            RtspMessage::Response(resp) => &resp.headers,
        }
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        match self {
            RtspMessage::Request(req) => &mut req.headers,
            RtspMessage::Response(resp) => &mut resp.headers,
        }
    }

    pub fn set_body(&mut self, body: Vec<u8>) {
        match self {
            RtspMessage::Request(req) => req.body = body,
            RtspMessage::Response(resp) => resp.body = body,
        }
    }

    /// Re-derive the cseq field from the CSeq header (0 when absent)
    pub fn refresh_cseq(&mut self) {
        let cseq = self.headers().cseq().unwrap_or(0);
        match self {
            RtspMessage::Request(req) => req.cseq = cseq,
            RtspMessage::Response(resp) => resp.cseq = cseq,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            RtspMessage::Request(req) => req.serialize(),
            RtspMessage::Response(resp) => resp.serialize(),
        }
    }
}

impl From<RtspRequest> for RtspMessage {
    fn from(req: RtspRequest) -> Self {
        RtspMessage::Request(req)
    }
}

impl From<RtspResponse> for RtspMessage {
    fn from(resp: RtspResponse) -> Self {
        RtspMessage::Response(resp)
    }
}
