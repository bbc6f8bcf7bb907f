//! # Wire Protocol
//!
//! Decoding of inbound request text and encoding of outbound replies. The
//! dispatcher only ever sees a [`Request`] and returns a [`Response`]; raw bytes
//! stay on this side of the boundary.

/// Request line, header and body decoding.
pub mod request;
/// Status codes and response framing.
pub mod response;

pub use request::{ProtocolError, Request};
pub use http::StatusCode;
pub use response::Response;
