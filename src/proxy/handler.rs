//! CONNECT request construction and response validation
//!
//! This module holds the decision rules of the handshake. It never touches a
//! socket: callers format the request here, ship it themselves, and hand the
//! accumulated answer back for judgment.

use crate::http::response::ProxyResponse;
use std::collections::HashMap;

/// The only status code that means the tunnel is open.
const CONNECTION_ESTABLISHED: u16 = 200;

/// Outcome of validating a proxy's answer to a CONNECT request.
///
/// Always carries the response that was judged, whether the handshake
/// succeeded or not.
#[derive(Debug)]
pub struct ProxyResponseResult<'a, R: ProxyResponse + ?Sized> {
    is_success: bool,
    response: &'a R,
}

impl<'a, R: ProxyResponse + ?Sized> ProxyResponseResult<'a, R> {
    pub fn new(is_success: bool, response: &'a R) -> Self {
        Self {
            is_success,
            response,
        }
    }

    pub fn is_success(&self) -> bool {
        self.is_success
    }

    pub fn response(&self) -> &'a R {
        self.response
    }

    /// The proxy's explanation when the handshake failed, `None` on success.
    pub fn error(&self) -> Option<String> {
        if self.is_success {
            None
        } else {
            Some(self.response.error())
        }
    }
}

impl<R: ProxyResponse + ?Sized> Clone for ProxyResponseResult<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: ProxyResponse + ?Sized> Copy for ProxyResponseResult<'_, R> {}

/// Whether a header can be written as a single `name: value` line.
pub fn is_valid_header(key: &str, value: &str) -> bool {
    let breaks = |s: &str| s.contains(['\r', '\n']);
    !key.trim().is_empty() && !breaks(key) && !breaks(value)
}

/// Formats CONNECT requests and judges the proxy's responses.
///
/// Stateless; one value can serve any number of concurrent handshakes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyHandler;

impl ProxyHandler {
    pub fn new() -> Self {
        Self
    }

    /// Builds the CONNECT request for `host`.
    ///
    /// `host` is used verbatim as both the request target and the `Host`
    /// header, so it should already carry the port (`example.com:443`).
    /// Extra headers follow `Connection: Keep-Alive`, sorted by name. A header
    /// whose name or value contains CR or LF is dropped.
    ///
    /// # Example
    ///
    /// ```
    /// # use tunnelgate::proxy::handler::ProxyHandler;
    /// let request = ProxyHandler::new().create_proxy_request("example.com:443", None);
    /// assert_eq!(
    ///     request,
    ///     "CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\nConnection: Keep-Alive\r\n\r\n"
    /// );
    /// ```
    pub fn create_proxy_request(
        &self,
        host: &str,
        additional_headers: Option<&HashMap<String, String>>,
    ) -> String {
        if host.is_empty() {
            tracing::warn!("Building CONNECT request with an empty host");
        }

        let mut request = String::with_capacity(128);

        request.push_str(&format!("CONNECT {} HTTP/1.1\r\n", host));
        request.push_str(&format!("Host: {}\r\n", host));
        request.push_str("Connection: Keep-Alive\r\n");

        if let Some(headers) = additional_headers {
            let mut sorted: Vec<_> = headers.iter().collect();
            sorted.sort();

            for (key, value) in sorted {
                if !is_valid_header(key, value) {
                    tracing::warn!(header = %key.escape_debug(), "Skipping header with line break");
                    continue;
                }
                request.push_str(&format!("{}: {}\r\n", key, value));
            }
        }

        // End of headers
        request.push_str("\r\n");

        request
    }

    /// Decides whether `response` confirms an open tunnel.
    ///
    /// A parsed `200` status is success. A missing or malformed status line,
    /// or any other code, is failure and the result's error text comes from
    /// [`ProxyResponse::error`].
    ///
    /// Callers are expected to stop reading before validating; this does not
    /// consult [`ProxyResponse::is_missing_content`] when deciding.
    pub fn validate_proxy_response<'a, R>(&self, response: &'a R) -> ProxyResponseResult<'a, R>
    where
        R: ProxyResponse + ?Sized,
    {
        if response.is_missing_content() {
            tracing::debug!("Validating a proxy response that is still missing content");
        }

        let Some(status) = response.status() else {
            tracing::warn!("Proxy response has no parsable status line");
            return ProxyResponseResult::new(false, response);
        };

        if status.status_code() == CONNECTION_ESTABLISHED {
            tracing::debug!(
                status = status.status_code(),
                reason = status.reason_phrase(),
                "Proxy accepted CONNECT request"
            );
            ProxyResponseResult::new(true, response)
        } else {
            tracing::warn!(
                status = status.status_code(),
                reason = status.reason_phrase(),
                "Proxy rejected CONNECT request"
            );
            ProxyResponseResult::new(false, response)
        }
    }
}
