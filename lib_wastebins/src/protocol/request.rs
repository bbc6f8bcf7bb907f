//! # Request Decoding
//!
//! Turns the raw text of one request into a [`Request`]. The format is
//! line-oriented: a `METHOD PATH VERSION` line, header lines, a blank line,
//! then the body. Only the subset the dispatcher needs is understood. There is
//! no header folding and no chunked transfer; every line after the first blank
//! line is appended to the body with its line terminator removed.

use thiserror::Error;

/// Version assumed when the request line carries none.
pub const DEFAULT_VERSION: &str = "HTTP/1.1";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("request is empty")]
    EmptyRequest,

    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    #[error("request is not valid UTF-8")]
    InvalidUtf8,
}

/// # Request
///
/// A decoded request record, as handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub version: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Request {
    /// Builds a request without headers, mostly for in-process callers.
    pub fn new(method: impl Into<String>, path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            version: DEFAULT_VERSION.to_string(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn from_bytes(raw: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(raw).map_err(|_| ProtocolError::InvalidUtf8)?;
        Self::parse(text)
    }

    /// # Parse
    ///
    /// Decodes a full request text. Fails only when the first non-blank line
    /// does not hold at least a method and a path.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        if raw.trim().is_empty() {
            return Err(ProtocolError::EmptyRequest);
        }

        // Blank lines ahead of the request line are tolerated and skipped.
        let mut lines = raw
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .skip_while(|line| line.trim().is_empty());

        let request_line = lines.next().unwrap_or_default();
        let mut parts = request_line.split_whitespace();
        let (method, path) = match (parts.next(), parts.next()) {
            (Some(method), Some(path)) => (method, path),
            _ => return Err(ProtocolError::MalformedRequestLine(request_line.to_string())),
        };
        let version = parts.next().unwrap_or(DEFAULT_VERSION);

        let mut headers = Vec::new();
        for line in lines.by_ref() {
            if line.is_empty() {
                break;
            }
            // Lines without a colon carry nothing we can use.
            if let Some((name, value)) = line.split_once(':') {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
        }

        let body: String = lines.collect();

        Ok(Self {
            method: method.to_string(),
            path: path.to_string(),
            version: version.to_string(),
            headers,
            body,
        })
    }

    /// Case-insensitive header lookup. Returns the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Number of line terminators preceding the request line.
fn leading_blank_len(buf: &[u8]) -> usize {
    buf.iter().take_while(|b| matches!(b, b'\r' | b'\n')).count()
}

/// Byte offset just past the blank line that ends the header block, if the
/// buffer already contains it. Accepts both `\r\n\r\n` and bare `\n\n`.
/// Blank lines before the request line do not count as the terminator.
pub fn header_end(buf: &[u8]) -> Option<usize> {
    let start = leading_blank_len(buf);
    let head = &buf[start..];
    if head.is_empty() {
        return None;
    }
    let crlf = head.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4);
    let lf = head.windows(2).position(|w| w == b"\n\n").map(|pos| pos + 2);
    let end = match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    end.map(|end| start + end)
}

/// Value of a `Content-Length` header found in a raw header block. Used only
/// to know when a body has fully arrived; decoding ignores it.
pub fn content_length(head: &[u8]) -> Option<usize> {
    String::from_utf8_lossy(&head[leading_blank_len(head)..])
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_with_body() {
        let raw = "POST /bins HTTP/1.1\r\nHost: localhost:8080\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 34\r\n\r\nlocation=Gate&type=plastic&fill=40";
        let request = Request::parse(raw).unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/bins");
        assert_eq!(request.version, "HTTP/1.1");
        assert_eq!(request.header("host"), Some("localhost:8080"));
        assert_eq!(request.header("CONTENT-LENGTH"), Some("34"));
        assert_eq!(request.body, "location=Gate&type=plastic&fill=40");
    }

    #[test]
    fn test_parse_concatenates_body_lines() {
        let raw = "POST /bins HTTP/1.0\nX-Trace: 1\n\nlocation=Dock&\ntype=food\r\n";
        let request = Request::parse(raw).unwrap();
        assert_eq!(request.version, "HTTP/1.0");
        assert_eq!(request.body, "location=Dock&type=food");
    }

    #[test]
    fn test_parse_without_headers_or_body() {
        let request = Request::parse("GET /route").unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/route");
        assert_eq!(request.version, DEFAULT_VERSION);
        assert!(request.headers.is_empty());
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_request_lines() {
        assert_eq!(Request::parse("").unwrap_err(), ProtocolError::EmptyRequest);
        assert_eq!(Request::parse("\r\n\r\n").unwrap_err(), ProtocolError::EmptyRequest);
        assert!(matches!(
            Request::parse("GET\r\nHost: x\r\n\r\n"),
            Err(ProtocolError::MalformedRequestLine(_))
        ));
        assert_eq!(Request::from_bytes(&[0x47, 0xff, 0xfe]).unwrap_err(), ProtocolError::InvalidUtf8);
    }

    #[test]
    fn test_header_end_and_content_length() {
        let raw = b"POST /bins HTTP/1.1\r\nContent-Length: 6\r\n\r\nfill=9";
        let end = header_end(raw).unwrap();
        assert_eq!(&raw[end..], b"fill=9");
        assert_eq!(content_length(&raw[..end]), Some(6));

        assert_eq!(header_end(b"GET /bins HTTP/1.1\r\nHost: x\r\n"), None);
        assert_eq!(header_end(b"GET /bins HTTP/1.1\n\n"), Some(20));
        assert_eq!(content_length(b"GET /bins HTTP/1.1\r\nHost: x\r\n\r\n"), None);
    }

    #[test]
    fn test_leading_blank_lines_are_skipped() {
        let request = Request::parse("\r\n\r\nGET /bins HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/bins");
        assert_eq!(request.header("host"), Some("x"));

        let raw = b"\r\n\r\nPOST /bins HTTP/1.1\r\nContent-Length: 6\r\n\r\nfill=9";
        let end = header_end(raw).unwrap();
        assert_eq!(&raw[end..], b"fill=9");
        assert_eq!(content_length(&raw[..end]), Some(6));
        assert_eq!(header_end(b"\r\n\r\n"), None);
    }
}
