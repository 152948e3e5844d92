//! Tests for CONNECT request construction and response validation

use std::collections::HashMap;
use tunnelgate::http::response::{ConnectResponse, ProxyResponse};
use tunnelgate::http::status::HttpStatusLine;
use tunnelgate::proxy::handler::{ProxyHandler, ProxyResponseResult, is_valid_header};

/// In-memory response with canned answers.
struct StubResponse {
    missing_content: bool,
    status: Option<HttpStatusLine>,
    contents: Vec<u8>,
    error: String,
}

impl StubResponse {
    fn new(status_line: Option<&str>, error: &str) -> Self {
        Self {
            missing_content: false,
            status: status_line.and_then(HttpStatusLine::parse),
            contents: error.as_bytes().to_vec(),
            error: error.to_string(),
        }
    }
}

impl ProxyResponse for StubResponse {
    fn is_missing_content(&self) -> bool {
        self.missing_content
    }

    fn status(&self) -> Option<&HttpStatusLine> {
        self.status.as_ref()
    }

    fn contents(&self) -> &[u8] {
        &self.contents
    }

    fn error(&self) -> String {
        self.error.clone()
    }
}

#[test]
fn test_create_proxy_request() {
    let mut headers = HashMap::new();
    headers.insert("header1".to_string(), "headervalue1".to_string());
    headers.insert("header2".to_string(), "headervalue2".to_string());

    let request = ProxyHandler::new().create_proxy_request("testHostName", Some(&headers));

    let expected = "CONNECT testHostName HTTP/1.1\r\n\
                    Host: testHostName\r\n\
                    Connection: Keep-Alive\r\n\
                    header1: headervalue1\r\n\
                    header2: headervalue2\r\n\
                    \r\n";
    assert_eq!(request, expected);
}

#[test]
fn test_create_proxy_request_without_headers() {
    let handler = ProxyHandler::new();

    let none = handler.create_proxy_request("example.com:443", None);
    let empty = handler.create_proxy_request("example.com:443", Some(&HashMap::new()));

    assert_eq!(
        none,
        "CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\nConnection: Keep-Alive\r\n\r\n"
    );
    assert_eq!(none, empty);
}

#[test]
fn test_create_proxy_request_shape_for_many_headers() {
    let mut headers = HashMap::new();
    for i in 0..20 {
        headers.insert(format!("X-Header-{:02}", i), format!("value {}", i));
    }

    let host = "[2001:db8::1]:8443";
    let request = ProxyHandler::new().create_proxy_request(host, Some(&headers));

    assert!(request.starts_with("CONNECT [2001:db8::1]:8443 HTTP/1.1\r\n"));
    assert!(request.contains("Host: [2001:db8::1]:8443\r\n"));
    assert!(request.contains("Connection: Keep-Alive\r\n"));
    assert!(request.ends_with("\r\n\r\n"));
    for (key, value) in &headers {
        assert_eq!(request.matches(&format!("{}: {}\r\n", key, value)).count(), 1);
    }
    assert_eq!(request.matches("\r\n").count(), 3 + headers.len() + 1);
}

#[test]
fn test_create_proxy_request_is_deterministic() {
    let mut headers = HashMap::new();
    headers.insert("Proxy-Authorization".to_string(), "Basic dXNlcjpwYXNz".to_string());
    headers.insert("User-Agent".to_string(), "tunnelgate".to_string());
    headers.insert("Accept".to_string(), "*/*".to_string());

    let handler = ProxyHandler::new();
    let first = handler.create_proxy_request("example.com:443", Some(&headers));
    let second = handler.create_proxy_request("example.com:443", Some(&headers.clone()));

    assert_eq!(first, second);

    let accept = first.find("Accept:").unwrap();
    let auth = first.find("Proxy-Authorization:").unwrap();
    let agent = first.find("User-Agent:").unwrap();
    assert!(accept < auth && auth < agent);
}

#[test]
fn test_create_proxy_request_drops_headers_with_line_breaks() {
    let mut headers = HashMap::new();
    headers.insert("X-Good".to_string(), "fine".to_string());
    headers.insert("X-Bad".to_string(), "x\r\nProxy-Authorization: Basic Zm9v".to_string());
    headers.insert("X-Split\nName".to_string(), "value".to_string());

    let request = ProxyHandler::new().create_proxy_request("example.com:443", Some(&headers));

    assert!(request.contains("X-Good: fine\r\n"));
    assert!(!request.contains("X-Bad"));
    assert!(!request.contains("Proxy-Authorization"));
    assert!(!request.contains("X-Split"));
    assert!(request.ends_with("Connection: Keep-Alive\r\nX-Good: fine\r\n\r\n"));
}

#[test]
fn test_is_valid_header() {
    assert!(is_valid_header("User-Agent", "tunnelgate/0.1"));
    assert!(!is_valid_header("", "value"));
    assert!(!is_valid_header("X-Bad", "a\rb"));
    assert!(!is_valid_header("X\nBad", "value"));
}

#[test]
fn test_validate_proxy_response_on_success() {
    let response = StubResponse::new(Some("HTTP/1.1 200 Connection Established"), "");

    let result = ProxyHandler::new().validate_proxy_response(&response);

    assert!(result.is_success());
    assert!(std::ptr::eq(result.response(), &response));
    assert_eq!(result.error(), None);
}

#[test]
fn test_validate_proxy_response_on_failure() {
    let contents = "<html><body>[Fiddler] Proxy Authentication Required.<BR></body></html>";
    let response = StubResponse::new(Some("HTTP/1.1 407 Proxy Auth Required"), contents);

    let result = ProxyHandler::new().validate_proxy_response(&response);

    assert!(!result.is_success());
    assert!(std::ptr::eq(result.response(), &response));
    assert_eq!(result.error().as_deref(), Some(contents));
}

#[test]
fn test_validate_proxy_response_on_empty_response() {
    let empty_response = "\r\n\r\n";
    let response = StubResponse::new(None, empty_response);

    let result = ProxyHandler::new().validate_proxy_response(&response);

    assert!(!result.is_success());
    assert_eq!(result.error().as_deref(), Some(empty_response));
    assert_eq!(response.contents(), empty_response.as_bytes());
}

#[test]
fn test_validate_proxy_response_other_success_codes_fail() {
    for line in ["HTTP/1.1 201 Created", "HTTP/1.1 204 No Content", "HTTP/1.1 301 Moved"] {
        let response = StubResponse::new(Some(line), "not a tunnel");

        let result = ProxyHandler::new().validate_proxy_response(&response);

        assert!(!result.is_success(), "{} should not open a tunnel", line);
        assert_eq!(result.error().as_deref(), Some("not a tunnel"));
    }
}

#[test]
fn test_validate_proxy_response_is_idempotent() {
    let response = StubResponse::new(Some("HTTP/1.1 502 Bad Gateway"), "upstream unreachable");
    let handler = ProxyHandler::new();

    let first = handler.validate_proxy_response(&response);
    let second = handler.validate_proxy_response(&response);

    assert_eq!(first.is_success(), second.is_success());
    assert_eq!(first.error(), second.error());
}

#[test]
fn test_validate_proxy_response_ignores_missing_content_flag() {
    let mut response = StubResponse::new(Some("HTTP/1.1 200 Connection Established"), "");
    response.missing_content = true;

    let result = ProxyHandler::new().validate_proxy_response(&response);

    assert!(result.is_success());
}

#[test]
fn test_validate_connect_response_from_wire_bytes() {
    let handler = ProxyHandler::new();

    let ok = ConnectResponse::from_bytes(b"HTTP/1.1 200 Connection Established\r\n\r\n");
    assert!(handler.validate_proxy_response(&ok).is_success());

    let denied = ConnectResponse::from_bytes(
        b"HTTP/1.1 407 Proxy Auth Required\r\nContent-Length: 27\r\n\r\nProxy Authentication Needed",
    );
    let result = handler.validate_proxy_response(&denied);
    assert!(!result.is_success());
    assert_eq!(result.error().as_deref(), Some("Proxy Authentication Needed"));

    let blank = ConnectResponse::from_bytes(b"\r\n\r\n");
    let result = handler.validate_proxy_response(&blank);
    assert!(!result.is_success());
    assert_eq!(result.error().as_deref(), Some("\r\n\r\n"));
}

#[test]
fn test_validate_through_trait_object() {
    let response: Box<dyn ProxyResponse> =
        Box::new(StubResponse::new(Some("HTTP/1.1 200 Connection Established"), ""));

    let result: ProxyResponseResult<'_, dyn ProxyResponse> =
        ProxyHandler::new().validate_proxy_response(response.as_ref());

    assert!(result.is_success());
    assert_eq!(result.error(), None);
}
