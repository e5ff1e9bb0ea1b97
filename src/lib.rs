//! CryptoDash Library
//!
//! A cryptocurrency dashboard client: cached market data from a REST backend,
//! price alerts with de-duplicated notifications, and supervision of the
//! backend server processes.

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod market_data;
pub mod session;
pub mod supervisor;
pub mod ui;

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

pub use error::{DashboardError, DashboardResult};

/// Initialize tracing subscriber for logging
///
/// Log lines go to `file_path` so they do not interleave with dashboard output.
/// The returned guard must be held for the lifetime of the program.
pub fn init_logging(level: &str, file_path: &str) -> Result<WorkerGuard> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let path = Path::new(file_path);
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory {}", directory.display()))?;
    let file_name = path
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", file_path))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("cryptodash={}", level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}
