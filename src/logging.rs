//! Tracing setup for the server and the CLI.
//!
//! The server writes compact records to stdout and mirrors them, with targets and without ANSI
//! colours, into a log file: `READFORME_LOG_FILE` when set, `logs/readforme.log` otherwise. The
//! CLI logs to stderr only so stdout carries nothing but results.
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_ENV: &str = "READFORME_LOG_FILE";
const DEFAULT_LOG_PATH: &str = "logs/readforme.log";

static FILE_WRITER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the server subscriber. `RUST_LOG` overrides the default `info` level.
///
/// File logging is skipped, with a note on stderr, when the log file cannot be opened.
pub fn init_tracing() {
    let console = fmt::layer().with_target(false).compact();
    let file = file_writer().map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(console)
        .with(file)
        .init();
}

/// Install the CLI subscriber on stderr. `RUST_LOG` overrides the default `warn` level.
pub fn init_cli_tracing() {
    tracing_subscriber::registry()
        .with(env_filter("warn"))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn log_path() -> PathBuf {
    std::env::var_os(LOG_FILE_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH))
}

fn file_writer() -> Option<NonBlocking> {
    let path = log_path();
    match open_log_file(&path) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            // The guard flushes buffered records on drop and must outlive the subscriber.
            let _ = FILE_WRITER_GUARD.set(guard);
            Some(writer)
        }
        Err(err) => {
            eprintln!("File logging disabled, cannot open {}: {err}", path.display());
            None
        }
    }
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
