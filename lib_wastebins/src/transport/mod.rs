//! # Transport Adapter
//!
//! Everything below the dispatcher: the TCP accept loop, connection
//! lifecycle and byte buffering. Requests are decoded with
//! [`crate::protocol::Request`] and replies encoded with
//! [`crate::protocol::Response`].

/// Accept loop and one-request-per-connection handling.
pub mod tcp_server;

pub use tcp_server::{handle_connection, serve};
