//! Tracing configuration and log routing.
//!
//! Logs always go to stdout through a compact formatter. A second, non-blocking file layer is
//! installed as well: `DOCQA_LOG_FILE` selects the target path, otherwise the service appends to
//! `logs/docqa.log`. Failure to open the file only disables the file layer.
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_ENV: &str = "DOCQA_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "docqa.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Configure tracing subscribers for stdout and optional file logging.
///
/// - Respects `RUST_LOG` for filtering (defaults to `info`).
/// - Keeps the non-blocking writer guard alive for the rest of the process.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    if let Some(writer) = configure_file_writer() {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

fn configure_file_writer() -> Option<NonBlocking> {
    let (non_blocking, guard) = match std::env::var(LOG_FILE_ENV) {
        Ok(path) if !path.trim().is_empty() => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|err| eprintln!("Failed to open log file {path}: {err}"))
                .ok()?;
            tracing_appender::non_blocking(file)
        }
        _ => {
            if let Err(err) = std::fs::create_dir_all(DEFAULT_LOG_DIR) {
                eprintln!("Failed to create logs directory: {err}");
                return None;
            }
            let appender = tracing_appender::rolling::never(DEFAULT_LOG_DIR, DEFAULT_LOG_FILE);
            tracing_appender::non_blocking(appender)
        }
    };
    let _ = LOG_GUARD.set(guard);
    Some(non_blocking)
}
