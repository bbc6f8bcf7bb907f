//! # Waste Bin Fleet Server
//!
//! Serves the bin registry over TCP. Clients list and create bins, raise a
//! bin's fill level, trigger waste classification and fetch the collection
//! route; every reply is a JSON document.
//!
//! ## Functionality:
//! - **Configuration**: defaults, `server_bins.conf`, `BINS_*` environment
//!   variables and command-line flags, in increasing priority.
//! - **Structured Logging**: `tracing` to the console and a JSON run log.
//! - **Demo Data**: one bin ("Campus Gate", plastic, 40%) is created at startup
//!   unless `--seed-demo-bin false` is given.
//! - **Graceful Shutdown**: `tokio-graceful` waits up to 10 seconds for
//!   in-flight connections after Ctrl-C or SIGTERM.

use std::time::Duration;

use anyhow::{Context, Result};
use static_init::dynamic;
use tokio::net::TcpListener;
use tokio_graceful::{Shutdown, ShutdownGuard};
use tracing::{error, info};

use lib_wastebins::configs::{load_config, ConfigError, ResolvedConfig};
use lib_wastebins::loggers::setup_logging;
use lib_wastebins::transport::serve;
use lib_wastebins::{Dispatcher, Registry, SharedRegistry, WasteType};

const APP_NAME: &str = "server_bins";

// load .env files before anything else
/// Initializes environment variables by loading `.env` files.
///
/// It first attempts to load a generic `.env` file, and then
/// an OS-specific `.env.windows` or `.env.linux` file.
#[dynamic]
static DOTENV_INIT: () = {
    let dotenv_os: &str = if cfg!(target_os = "windows") {
        ".env.windows"
    } else {
        ".env.linux"
    };

    dotenvy::dotenv().ok();
    dotenvy::from_filename(dotenv_os).ok();
};

/// Creates the registry and, when enabled, the demo bin.
fn build_registry(config: &ResolvedConfig) -> Result<SharedRegistry> {
    let registry = Registry::shared();
    if config.seed_demo_bin {
        let mut guard = registry
            .try_lock()
            .context("registry is locked before the server started")?;
        let bin = guard.create("Campus Gate", WasteType::Plastic, 40.0);
        info!("Seeded demo bin {} at {:?}", bin.id(), bin.location());
    }
    Ok(registry)
}

#[tokio::main]
/// # Main Entry Point
///
/// 1.  Loads `.env` files and the layered configuration.
/// 2.  Sets up logging (the returned guard lives until `main` returns).
/// 3.  Builds the shared registry and the dispatcher.
/// 4.  Binds the listener and runs the accept loop under `tokio-graceful`.
async fn main() -> Result<()> {
    let _ = *DOTENV_INIT;

    let config = match load_config() {
        Ok(config) => config,
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => return Err(e).context("failed to load configuration"),
    };

    let _log_guard = setup_logging(APP_NAME, &config.log_dir, &config.log_level)
        .context("failed to initialize logging")?;
    info!("{}", config);

    let registry = build_registry(&config)?;
    let dispatcher = Dispatcher::new(registry).with_fill_increment(config.fill_increment);

    let listener = TcpListener::bind(config.socket_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.socket_addr()))?;

    let shutdown: Shutdown = Shutdown::default();
    let max_request_bytes = config.max_request_bytes;
    shutdown.spawn_task_fn(move |guard: ShutdownGuard| serve(listener, dispatcher, max_request_bytes, guard));

    match shutdown.shutdown_with_limit(Duration::from_secs(10)).await {
        Ok(elapsed) => {
            info!(
                "shutdown: gracefully {}s after shutdown signal received",
                elapsed.as_secs_f64()
            );
        }
        Err(e) => {
            error!("shutdown: forcefully due to timeout: {}", e);
        }
    }

    info!("Bye!");
    Ok(())
}
