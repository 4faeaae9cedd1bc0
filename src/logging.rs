//! File logging. The terminal belongs to the UI, so nothing is ever written to stdout.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber writing to `log_path`. `RUST_LOG` wins over `level`.
/// Keep the returned guard alive until exit so buffered lines are flushed.
pub fn init(level: &str, log_path: &Path) -> Result<WorkerGuard> {
    let dir = log_path
        .parent()
        .context("log path has no parent directory")?;
    let file_name = log_path
        .file_name()
        .context("log path has no file name")?;
    fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(filter)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("installing log subscriber: {err}"))?;

    Ok(guard)
}
