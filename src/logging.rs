//! Tracing subscriber setup.
//!
//! While the panel owns the terminal, log lines must not reach stdout or
//! stderr. Dashboard mode therefore logs to a file or not at all; the
//! one-shot subcommands log to stderr.

use anyhow::Context;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

use crate::cli::LogLevel;

/// Where log lines go.
#[derive(Debug, Clone, Copy)]
pub enum LogTarget<'a> {
    Stderr,
    File(&'a Path),
    Discard,
}

/// Initializes tracing logging subsystem with configured log level
pub fn setup_logging(log_level: LogLevel, target: LogTarget<'_>) -> anyhow::Result<()> {
    let Some(level) = log_level.level() else {
        return Ok(());
    };

    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    match target {
        LogTarget::Discard => return Ok(()),
        LogTarget::Stderr => {
            let subscriber = builder.with_writer(io::stderr).finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set tracing subscriber")?;
        }
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let subscriber = builder.with_ansi(false).with_writer(Mutex::new(file)).finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set tracing subscriber")?;
        }
    }

    info!("Logging initialized with level: {:?}", log_level);
    Ok(())
}

/// Resolves the configured level name, falling back to `info`.
pub fn resolve_log_level(name: Option<&str>) -> LogLevel {
    name.and_then(LogLevel::from_name).unwrap_or(LogLevel::Info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_log_level() {
        assert_eq!(resolve_log_level(Some("debug")), LogLevel::Debug);
        assert_eq!(resolve_log_level(Some("OFF")), LogLevel::Off);
        assert_eq!(resolve_log_level(Some("loud")), LogLevel::Info);
        assert_eq!(resolve_log_level(None), LogLevel::Info);
    }

    #[test]
    fn test_off_installs_nothing() {
        assert!(setup_logging(LogLevel::Off, LogTarget::Stderr).is_ok());
        assert!(setup_logging(LogLevel::Debug, LogTarget::Discard).is_ok());
    }
}
