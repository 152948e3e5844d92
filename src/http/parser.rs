use crate::http::status::HttpStatusLine;
use std::collections::HashMap;

/// Upper bound on the response head before the proxy is considered misbehaving.
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Upper bound on a whole proxy response, head and error body together.
pub const MAX_RESPONSE_SIZE: usize = 256 * 1024;

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    InvalidEncoding,
    InvalidStatusLine,
    InvalidHeader,
    InvalidContentLength,
    Incomplete,
}

/// Status line and headers of a proxy response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: HttpStatusLine,
    pub headers: HashMap<String, String>,
    pub content_length: Option<usize>,
}

pub fn parse_http_response(buf: &[u8]) -> Result<(ResponseHead, usize), ParseError> {

    // Look for header/body separator
    let headers_end = find_headers_end(buf).ok_or(ParseError::Incomplete)?;
    let header_bytes = &buf[..headers_end];

    let headers_str = std::str::from_utf8(header_bytes)
        .map_err(|_| ParseError::InvalidEncoding)?;

    let mut lines = headers_str.split("\r\n");

    // Status line
    let status_line = lines.next().ok_or(ParseError::InvalidStatusLine)?;
    let status = HttpStatusLine::parse(status_line).ok_or(ParseError::InvalidStatusLine)?;

    // Headers
    let mut headers = HashMap::new();
    let mut content_length: Option<usize> = None;

    for line in lines {
        if line.is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once(':')
            .ok_or(ParseError::InvalidHeader)?;

        let key = key.trim();
        let value = value.trim();

        if key.eq_ignore_ascii_case("Content-Length") {
            let length = value
                .parse::<usize>()
                .map_err(|_| ParseError::InvalidContentLength)?;

            // Repeats must agree
            if content_length.is_some_and(|prev| prev != length) {
                return Err(ParseError::InvalidContentLength);
            }
            content_length = Some(length);
        }

        headers.insert(
           key.to_string(),
           value.to_string(),
        );
    }

    let head = ResponseHead {
        status,
        headers,
        content_length,
    };

    Ok((head, headers_end + 4))

}

pub fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
}
