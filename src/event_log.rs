//! Persisted event log.
//!
//! The installer writes one line per event through a [`Logger`] handed to it
//! at construction. [`FileLogger`] appends lines of the form
//! `<YYYY-MM-DD HH:MM:SS> [<LEVEL>] <message>` to a file and mirrors them to
//! `tracing`; [`TracingLogger`] only forwards to `tracing`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Fire-and-forget sink for installer events.
///
/// Implementations must never panic or surface errors to the caller.
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

fn forward_to_tracing(level: LogLevel, message: &str) {
    match level {
        LogLevel::Info => tracing::info!("{message}"),
        LogLevel::Warn => tracing::warn!("{message}"),
        LogLevel::Error => tracing::error!("{message}"),
    }
}

/// Logger that only emits `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        forward_to_tracing(level, message);
    }
}

/// Append-only, line-oriented log file.
///
/// Writes are serialized by a mutex owned by the instance, so one
/// `FileLogger` can be shared (behind an `Arc`) between the installer and a
/// concurrent presence-refresh pass.
#[derive(Debug)]
pub struct FileLogger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub(crate) fn format_line(level: LogLevel, message: &str) -> String {
    format!(
        "{} [{}] {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        level,
        message
    )
}

impl Logger for FileLogger {
    fn log(&self, level: LogLevel, message: &str) {
        forward_to_tracing(level, message);

        let line = format_line(level, message);
        // A poisoned lock only means another writer panicked mid-line.
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{line}"));
        if let Err(e) = written {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to append to log file");
        }
    }
}
