use std::fs::{File, OpenOptions};
use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::config::ServerConfig;

/// Installs the global subscriber writing JSON lines to `config.log_file`.
///
/// `RUST_LOG` overrides `config.log_filter`. Keep the returned guard alive for
/// as long as the server runs; dropping it flushes the background writer.
pub fn init(config: &ServerConfig) -> anyhow::Result<WorkerGuard> {
    let log_file = open_log_file(&config.log_file)?;
    let (writer, guard) = tracing_appender::non_blocking(log_file);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .with_context(|| format!("invalid log filter {:?}", config.log_filter))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer),
        )
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    Ok(guard)
}

/// Opens `path` for appending, creating missing parent directories
fn open_log_file(path: &Path) -> anyhow::Result<File> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory {:?}", dir))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {:?}", path))
}
