//! # Server Configuration
//!
//! Settings are layered, later sources overriding earlier ones field by field:
//!
//! 1. built-in defaults,
//! 2. a JSON config file (`server_bins.conf` in the working directory, or the
//!    path given by `--config-path` / `BINS_CONFIG_PATH`),
//! 3. environment variables and command-line flags (both handled by `clap`).
//!
//! The merged [`ServerConfig`] is then resolved into a [`ResolvedConfig`] with
//! concrete, validated values.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::DEFAULT_FILL_INCREMENT;

/// Config file looked up when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "server_bins.conf";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_DIR: &str = "./logs";
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Same read budget as a single 4 KiB socket buffer.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 4096;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid command line: {0}")]
    Cli(#[from] clap::Error),

    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid host address {0:?}")]
    InvalidHost(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Waste bin fleet tracking server", version)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[clap(long, env = "BINS_HOST", help = "IP address to listen on.")]
    pub host: Option<String>,

    #[clap(long, env = "BINS_PORT", help = "Port to listen on for client connections.")]
    pub port: Option<u16>,

    #[clap(long, env = "BINS_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "BINS_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "BINS_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "BINS_FILL_INCREMENT", help = "Fill level added by each fill request.")]
    pub fill_increment: Option<f64>,

    #[clap(long, env = "BINS_MAX_REQUEST_BYTES", help = "Largest request accepted on a connection, in bytes.")]
    pub max_request_bytes: Option<usize>,

    #[clap(long, env = "BINS_SEED_DEMO_BIN", help = "Create the demo bin at startup (true/false).")]
    pub seed_demo_bin: Option<bool>,
}

impl ServerConfig {
    pub fn defaults() -> Self {
        Self {
            host: Some(DEFAULT_HOST.to_string()),
            port: Some(DEFAULT_PORT),
            config_path: None,
            log_dir: Some(PathBuf::from(DEFAULT_LOG_DIR)),
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
            fill_increment: Some(DEFAULT_FILL_INCREMENT),
            max_request_bytes: Some(DEFAULT_MAX_REQUEST_BYTES),
            seed_demo_bin: Some(true),
        }
    }

    // 'other' overrides 'self' for Some values
    pub fn merge(self, other: ServerConfig) -> ServerConfig {
        ServerConfig {
            host: other.host.or(self.host),
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            fill_increment: other.fill_increment.or(self.fill_increment),
            max_request_bytes: other.max_request_bytes.or(self.max_request_bytes),
            seed_demo_bin: other.seed_demo_bin.or(self.seed_demo_bin),
        }
    }

    /// Fills any gap from the defaults and validates the result.
    pub fn resolve(self) -> Result<ResolvedConfig, ConfigError> {
        let merged = Self::defaults().merge(self);

        let host = merged.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
        let ip: IpAddr = host.parse().map_err(|_| ConfigError::InvalidHost(host.clone()))?;

        let fill_increment = merged.fill_increment.unwrap_or(DEFAULT_FILL_INCREMENT);
        if !fill_increment.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "fill_increment",
                reason: format!("{} is not a finite number", fill_increment),
            });
        }

        let max_request_bytes = merged.max_request_bytes.unwrap_or(DEFAULT_MAX_REQUEST_BYTES);
        if max_request_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_request_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(ResolvedConfig {
            addr: SocketAddr::new(ip, merged.port.unwrap_or(DEFAULT_PORT)),
            log_dir: merged.log_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            log_level: merged.log_level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            fill_increment,
            max_request_bytes,
            seed_demo_bin: merged.seed_demo_bin.unwrap_or(true),
        })
    }

    /// Reads a JSON config file. `Ok(None)` when the file does not exist.
    pub fn from_file(path: &Path) -> Result<Option<ServerConfig>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(config))
    }
}

/// # Resolved Configuration
///
/// Concrete settings the server runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub addr: SocketAddr,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub fill_increment: f64,
    pub max_request_bytes: usize,
    pub seed_demo_bin: bool,
}

impl ResolvedConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            fill_increment: DEFAULT_FILL_INCREMENT,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            seed_demo_bin: true,
        }
    }
}

impl fmt::Display for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ResolvedConfig
    Listen address: {},
    Log dir: {},
    Log level: {},
    Fill increment: {},
    Max request bytes: {},
    Seed demo bin: {}
",
            self.addr,
            self.log_dir.display(),
            self.log_level,
            self.fill_increment,
            self.max_request_bytes,
            self.seed_demo_bin
        )
    }
}

/// Loads the configuration from the process arguments and environment.
pub fn load_config() -> Result<ResolvedConfig, ConfigError> {
    load_config_from(std::env::args_os())
}

/// # Load Config From
///
/// Same as [`load_config`] with an explicit argument list (the first item is
/// the program name).
pub fn load_config_from<I, T>(args: I) -> Result<ResolvedConfig, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    // CLI and env values, parsed once and applied last.
    let cli = ServerConfig::try_parse_from(args)?;

    let config_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current = ServerConfig::defaults();
    if let Some(file_config) = ServerConfig::from_file(&config_path)? {
        current = current.merge(file_config);
    }
    current = current.merge(cli);

    current.resolve()
}
