use std::fmt;

/// The first line of an HTTP response, e.g. `HTTP/1.1 200 Connection Established`.
///
/// Only constructed through [`HttpStatusLine::parse`], so a value of this type
/// always carries a numeric status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpStatusLine {
    http_version: String,
    status_code: u16,
    reason_phrase: String,
}

impl HttpStatusLine {
    /// Parses a status line of the shape `<version> <code> <reason>`.
    ///
    /// The reason phrase is the remainder of the line and may contain spaces
    /// or be empty. A single trailing `\r` is ignored.
    ///
    /// # Returns
    ///
    /// `None` if the line is empty, has fewer than two tokens, or the second
    /// token is not a valid status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use tunnelgate::http::status::HttpStatusLine;
    /// let line = HttpStatusLine::parse("HTTP/1.1 200 Connection Established").unwrap();
    /// assert_eq!(line.status_code(), 200);
    /// assert_eq!(line.reason_phrase(), "Connection Established");
    /// assert!(HttpStatusLine::parse("").is_none());
    /// ```
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        let (version, rest) = split_token(line)?;
        let (code, reason) = split_token(rest)?;
        let status_code = code.parse::<u16>().ok()?;

        Some(Self {
            http_version: version.to_string(),
            status_code,
            reason_phrase: reason.to_string(),
        })
    }

    pub fn http_version(&self) -> &str {
        &self.http_version
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn reason_phrase(&self) -> &str {
        &self.reason_phrase
    }
}

impl fmt::Display for HttpStatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.http_version, self.status_code, self.reason_phrase
        )
    }
}

/// Splits off the first whitespace-delimited token, returning it and the
/// remainder with leading whitespace removed.
fn split_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }

    match s.find(char::is_whitespace) {
        Some(end) => Some((&s[..end], s[end..].trim_start())),
        None => Some((s, "")),
    }
}
