/// Installs the console and JSON file `tracing` layers and prunes old run logs.
pub mod logger_setup;

pub use logger_setup::{setup_logging, LoggerError};
