//! # Configuration Modules
//!
//! Layered configuration for the bin server: built-in defaults, an optional
//! JSON file, then environment variables and command-line flags.

/// Server settings, their layering and validation.
pub mod config_server;

pub use config_server::{load_config, load_config_from, ConfigError, ResolvedConfig, ServerConfig};
