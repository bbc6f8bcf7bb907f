//! # lib_wastebins
//!
//! Tracking of a fleet of waste bins: fill levels, collection need, waste
//! classification and the collection route, served over a minimal
//! line-oriented JSON protocol.
//!
//! The core (`core`, `protocol`) is always compiled. Outer layers are gated
//! by features so that tools linking only the model stay lean:
//!
//! - `configs`: layered server configuration,
//! - `loggers`: `tracing` subscriber setup,
//! - `transport`: the TCP server,
//! - `full`: all of the above.

pub mod core;
pub mod protocol;

#[cfg(feature = "configs")]
pub mod configs;
#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "transport")]
pub mod transport;

// Re-export the everyday types
pub use crate::core::{Bin, BinId, Dispatcher, Registry, SharedRegistry, WasteType};
pub use protocol::{Request, Response, StatusCode};
