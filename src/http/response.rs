use std::collections::HashMap;

use bytes::BytesMut;

use crate::http::parser::{parse_http_response, ParseError};
use crate::http::status::HttpStatusLine;

/// A proxy's answer to a CONNECT request, as seen by the response validator.
///
/// Implemented by [`ConnectResponse`] for bytes read off a socket, and by any
/// in-memory fixture that can answer the same four questions.
pub trait ProxyResponse {
    /// `true` while the received bytes do not yet form a complete response.
    fn is_missing_content(&self) -> bool;

    /// The parsed status line, or `None` if it was absent or malformed.
    fn status(&self) -> Option<&HttpStatusLine>;

    /// The response body, or every received byte when no status was parsed.
    fn contents(&self) -> &[u8];

    /// Human-readable description of what the proxy sent back.
    fn error(&self) -> String;
}

/// Where the response head stands after the bytes seen so far.
#[derive(Debug, Clone)]
enum HeadState {
    /// Terminator not received yet.
    Pending,
    /// Head parsed; body starts at the offset.
    Parsed {
        status: HttpStatusLine,
        headers: HashMap<String, String>,
        content_length: Option<usize>,
        body_start: usize,
    },
    /// Head complete but unusable; all bytes are treated as content.
    Malformed,
}

/// Accumulates the bytes a proxy sends back after a CONNECT request.
///
/// Bytes are appended with [`ConnectResponse::push`] as they arrive. Once the
/// head terminator is seen the status line and headers are parsed exactly
/// once; anything after it is body.
///
/// # Example
///
/// ```
/// # use tunnelgate::http::response::{ConnectResponse, ProxyResponse};
/// let mut response = ConnectResponse::new();
/// response.push(b"HTTP/1.1 200 Connection ");
/// assert!(response.is_missing_content());
///
/// response.push(b"Established\r\n\r\n");
/// assert!(!response.is_missing_content());
/// assert_eq!(response.status().unwrap().status_code(), 200);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectResponse {
    raw: BytesMut,
    head: HeadState,
}

impl ConnectResponse {
    pub fn new() -> Self {
        Self {
            raw: BytesMut::with_capacity(1024),
            head: HeadState::Pending,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut response = Self::new();
        response.push(bytes);
        response
    }

    /// Appends received bytes and parses the head if it just became complete.
    pub fn push(&mut self, bytes: &[u8]) {
        self.raw.extend_from_slice(bytes);

        if !matches!(self.head, HeadState::Pending) {
            return;
        }

        self.head = match parse_http_response(&self.raw) {
            Ok((head, consumed)) => HeadState::Parsed {
                status: head.status,
                headers: head.headers,
                content_length: head.content_length,
                body_start: consumed,
            },
            Err(ParseError::Incomplete) => HeadState::Pending,
            Err(e) => {
                tracing::debug!(error = ?e, "Proxy response head is malformed");
                HeadState::Malformed
            }
        };
    }

    /// Number of bytes received so far, head included.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Whether the head terminator has been received.
    pub fn is_head_complete(&self) -> bool {
        !matches!(self.head, HeadState::Pending)
    }

    /// Retrieves a header value by name, ignoring ASCII case.
    pub fn header(&self, key: &str) -> Option<&str> {
        match &self.head {
            HeadState::Parsed { headers, .. } => headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn content_length(&self) -> Option<usize> {
        match &self.head {
            HeadState::Parsed { content_length, .. } => *content_length,
            _ => None,
        }
    }

    /// Whether the parsed status is 2xx, i.e. the proxy opened the tunnel.
    ///
    /// Such a reply has no body; `Content-Length` is ignored.
    pub fn is_tunnel_open(&self) -> bool {
        match &self.head {
            HeadState::Parsed { status, .. } => (200..300).contains(&status.status_code()),
            _ => false,
        }
    }

    /// Bytes received after the head.
    ///
    /// Capped at `Content-Length` for error replies. After a 2xx every byte is
    /// returned, since they already belong to the tunneled protocol.
    pub fn body(&self) -> &[u8] {
        match &self.head {
            HeadState::Parsed {
                content_length,
                body_start,
                ..
            } => {
                let body = &self.raw[*body_start..];
                match content_length {
                    Some(n) if !self.is_tunnel_open() => &body[..body.len().min(*n)],
                    _ => body,
                }
            }
            _ => &[],
        }
    }
}

impl Default for ConnectResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyResponse for ConnectResponse {
    fn is_missing_content(&self) -> bool {
        match &self.head {
            HeadState::Pending => true,
            HeadState::Parsed { .. } if self.is_tunnel_open() => false,
            HeadState::Parsed {
                content_length: Some(n),
                ..
            } => self.body().len() < *n,
            // Error body without a length runs until the proxy closes
            HeadState::Parsed { .. } => true,
            HeadState::Malformed => false,
        }
    }

    fn status(&self) -> Option<&HttpStatusLine> {
        match &self.head {
            HeadState::Parsed { status, .. } => Some(status),
            _ => None,
        }
    }

    fn contents(&self) -> &[u8] {
        match self.head {
            HeadState::Parsed { .. } => self.body(),
            _ => &self.raw,
        }
    }

    fn error(&self) -> String {
        String::from_utf8_lossy(self.contents()).into_owned()
    }
}
