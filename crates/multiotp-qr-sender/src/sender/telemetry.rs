//! # Run logging
//!
//! Every run appends to a dated log file,
//! `{log_dir}/send-multiotp-qr_{DD.MM.YYYY}.log`, through a
//! `tracing_subscriber::fmt` layer. The console is reserved for the final
//! summary, so nothing is logged to stdout.
//!
//! The log file doubles as the body of the admin report sent when a run
//! aborts, which is why [`LogSink`] hands its path back to the caller.
//!
//! After the file is opened, older logs are rotated away so that only the
//! newest `keep_logs` files remain in the directory.

use anyhow::Context;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const APP_NAME: &str = "send-multiotp-qr";

/// The log file of the current run.
#[derive(Debug, Clone)]
pub struct LogSink {
    pub path: PathBuf,
}

/// Creates the log directory and file, installs the global subscriber and
/// rotates old logs.
///
/// # Errors
///
/// Fails if the directory cannot be created or the file cannot be opened.
/// Rotation failures are only reported.
pub fn init_logging(log_dir: &Path, keep_logs: usize) -> anyhow::Result<LogSink> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log dir {}", log_dir.display()))?;

    let path = log_file_path(log_dir, chrono::Local::now().date_naive());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true),
        )
        .try_init()
        .context("failed to install log subscriber")?;

    tracing::info!(app = APP_NAME, version = env!("CARGO_PKG_VERSION"), "Program started");

    tracing::info!(log_dir = %log_dir.display(), keep_logs, "Rotating logs");
    match rotate_logs(log_dir, keep_logs) {
        Ok(removed) => tracing::debug!(removed, "Log rotation done"),
        Err(err) => {
            println!("failed to rotate logs:\n\t{err}");
            tracing::warn!(%err, "Failed to rotate logs");
        }
    }

    Ok(LogSink { path })
}

/// `{log_dir}/send-multiotp-qr_{DD.MM.YYYY}.log`
pub fn log_file_path(log_dir: &Path, date: chrono::NaiveDate) -> PathBuf {
    log_dir.join(format!("{APP_NAME}_{}.log", date.format("%d.%m.%Y")))
}

/// Deletes all but the `keep` most recently modified files in `dir`.
///
/// Subdirectories are left alone. Returns the number of files removed.
pub fn rotate_logs(dir: &Path, keep: usize) -> io::Result<usize> {
    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if meta.is_file() {
            files.push((meta.modified()?, entry.path()));
        }
    }

    if files.len() <= keep {
        return Ok(0);
    }

    // Newest first.
    files.sort_by(|a, b| b.0.cmp(&a.0));

    let mut removed = 0;
    for (_, path) in files.into_iter().skip(keep) {
        fs::remove_file(&path)?;
        removed += 1;
    }
    Ok(removed)
}
