//! # Core Engine Module
//!
//! The bin fleet model and everything that reads or mutates it.
//!
//! ## Core Components:
//!
//! - **`bin`**: The `Bin` entity, the `WasteType` labels and the fixed waste
//!   classification rule.
//!
//! - **`registry`**: Owns all bins, hands out sequential ids and computes the
//!   collection route. Shared between connections behind a single mutex.
//!
//! - **`dispatcher`**: Maps decoded requests onto registry operations and
//!   turns their tagged results into responses.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Bin entity, waste types and the classification rule.
pub mod bin;
/// In-memory store of bins with id assignment and route generation.
pub mod registry;
/// Request routing and response building on top of the registry.
pub mod dispatcher;

// --- Public API Re-exports ---
pub use bin::{classify_waste, Bin, BinId, WasteType, COLLECTION_THRESHOLD};
pub use registry::{Registry, RegistryError, SharedRegistry};
pub use dispatcher::{DispatchError, Dispatcher, NewBin, Route, DEFAULT_FILL_INCREMENT};
