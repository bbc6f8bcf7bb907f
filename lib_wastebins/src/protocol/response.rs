//! # Response Encoding
//!
//! Every reply is a JSON document framed by a status line and three fixed
//! headers. Bodies are always produced through `serde_json`, so values such as
//! a bin location containing quotes or control characters are escaped.

use std::fmt;

use http::StatusCode;
use serde_json::{json, Value};

/// Version written on every status line.
pub const RESPONSE_VERSION: &str = "HTTP/1.1";

/// Status line text, `"<code> <reason>"`.
pub fn status_line(status: StatusCode) -> String {
    format!("{} {}", status.as_u16(), status.canonical_reason().unwrap_or_default())
}

/// # Response
///
/// A structured reply: a status and a JSON body. [`Response::encode`] renders
/// it onto the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub body: Value,
}

impl Response {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    /// 404 with the default empty object body.
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: json!({}),
        }
    }

    /// An error status with `{"error": message}` as body.
    pub fn error(status: StatusCode, message: impl fmt::Display) -> Self {
        Self {
            status,
            body: json!({ "error": message.to_string() }),
        }
    }

    /// Renders status line, headers, blank line and body.
    pub fn encode(&self) -> Vec<u8> {
        let body = self.body.to_string();
        let mut out = format!(
            "{} {}\r\nContent-Type: application/json\r\nAccess-Control-Allow-Origin: *\r\nContent-Length: {}\r\n\r\n",
            RESPONSE_VERSION,
            status_line(self.status),
            body.len()
        )
        .into_bytes();
        out.extend_from_slice(body.as_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_framing() {
        let response = Response::ok(json!({ "route": [1, 3] }));
        let text = String::from_utf8(response.encode()).unwrap();
        assert_eq!(
            text,
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nAccess-Control-Allow-Origin: *\r\nContent-Length: 15\r\n\r\n{\"route\":[1,3]}"
        );
    }

    #[test]
    fn test_content_length_counts_bytes() {
        let response = Response::ok(json!({ "location": "Müll" }));
        let encoded = response.encode();
        let text = String::from_utf8(encoded).unwrap();
        let (head, body) = text.split_once("\r\n\r\n").unwrap();
        assert!(head.ends_with(&format!("Content-Length: {}", body.len())));
        assert_eq!(body.len(), 20);
    }

    #[test]
    fn test_error_responses() {
        let missing = Response::not_found();
        assert_eq!(missing.status.as_u16(), 404);
        assert_eq!(missing.body, json!({}));
        assert!(String::from_utf8(missing.encode()).unwrap().starts_with("HTTP/1.1 404 Not Found\r\n"));

        let bad = Response::error(StatusCode::BAD_REQUEST, "fill is not a number");
        assert_eq!(bad.body, json!({ "error": "fill is not a number" }));
        assert!(String::from_utf8(bad.encode()).unwrap().starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn test_status_line_uses_canonical_reason() {
        assert_eq!(status_line(StatusCode::OK), "200 OK");
        assert_eq!(status_line(StatusCode::NOT_FOUND), "404 Not Found");
        assert_eq!(status_line(StatusCode::PAYLOAD_TOO_LARGE), "413 Payload Too Large");
    }
}
