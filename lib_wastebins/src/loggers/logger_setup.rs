//! # Logging Setup
//!
//! Installs the global `tracing` subscriber used by the server binaries:
//!
//! - the level comes from `RUST_LOG` when set, otherwise from configuration;
//! - a human-readable layer with ANSI colors writes to the console;
//! - a JSON layer writes to a per-run log file `<app>_<timestamp>.log`
//!   through a non-blocking appender.
//!
//! Older log files of the same application are pruned at startup so that only
//! the most recent previous run is kept next to the new one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Number of previous run logs kept when a new run starts.
pub const KEEP_PREVIOUS_LOGS: usize = 1;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("log directory error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid log level {level:?}: {reason}")]
    Filter { level: String, reason: String },

    #[error("failed to install the global subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// File name of the log of a run started at `started`.
pub fn log_file_name(app_name: &str, started: DateTime<Local>) -> String {
    format!("{}_{}.log", app_name, started.format("%Y-%m-%d_%H-%M-%S"))
}

/// `RUST_LOG` wins over the configured level.
pub fn build_filter(log_level: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| LoggerError::Filter {
            level: log_level.to_string(),
            reason: e.to_string(),
        })
}

/// # Cleanup Old Logs
///
/// Deletes all but the `keep` newest `<app>_*.log` files in `log_dir`.
/// Timestamps are embedded in the names, so name order is age order.
/// Returns how many files were removed.
pub fn cleanup_old_logs(app_name: &str, log_dir: &Path, keep: usize) -> io::Result<usize> {
    let prefix = format!("{}_", app_name);
    let mut log_files: Vec<PathBuf> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension().is_some_and(|ext| ext == "log")
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(&prefix))
        })
        .collect();

    // Newest first
    log_files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    let mut removed = 0;
    for old_file in log_files.iter().skip(keep) {
        match fs::remove_file(old_file) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!("Failed to delete old log file {}: {}", old_file.display(), e),
        }
    }
    Ok(removed)
}

/// # Setup Logging
///
/// Creates `log_dir` if needed, prunes old run logs and installs the global
/// subscriber. The returned guard flushes the file writer when dropped and
/// must be kept alive by the caller for as long as logging is wanted.
pub fn setup_logging(app_name: &str, log_dir: &Path, log_level: &str) -> Result<WorkerGuard, LoggerError> {
    fs::create_dir_all(log_dir)?;
    cleanup_old_logs(app_name, log_dir, KEEP_PREVIOUS_LOGS)?;

    let file_name = log_file_name(app_name, Local::now());
    let (file_writer, guard) = non_blocking(rolling::never(log_dir, &file_name));

    let console_layer = fmt::layer().with_target(true).with_ansi(true);
    let file_layer = fmt::layer().with_ansi(false).with_writer(file_writer).json();

    tracing_subscriber::registry()
        .with(build_filter(log_level)?)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    info!("Logging initialized with level: {} (file {})", log_level, file_name);
    Ok(guard)
}
