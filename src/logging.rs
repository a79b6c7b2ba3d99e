//! Logging setup
//!
//! Installs a `tracing-subscriber` fmt subscriber. Events go to stderr, or to
//! a log file through a non-blocking `tracing-appender` writer when one is
//! configured.

use crate::config::DEFAULT_LOG_FILTER;
use crate::error::WorkflowError;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive (EnvFilter syntax, e.g. `info,agent_workflow=debug`)
    pub filter: String,
    /// Write events to this file instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            log_file: None,
        }
    }
}

/// Install the global subscriber
///
/// An unparsable filter falls back to `info`. When a log file is configured
/// the returned guard owns the background writer: keep it alive for as long
/// as events should reach the file. Dropping it flushes what is buffered.
///
/// # Errors
/// * `WorkflowError::Config` if the log file cannot be opened or a global
///   subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>, WorkflowError> {
    let filter = EnvFilter::try_new(&config.filter)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let (result, guard) = match &config.log_file {
        Some(path) => {
            let appender = file_appender(path)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let result = builder.with_ansi(false).with_writer(writer).try_init();
            (result, Some(guard))
        }
        None => (builder.with_writer(std::io::stderr).try_init(), None),
    };

    result
        .map(|()| guard)
        .map_err(|e| WorkflowError::Config(format!("Failed to initialize logging: {}", e)))
}

/// Appender that writes (and appends) to exactly `path`, never rotating
fn file_appender(path: &Path) -> Result<RollingFileAppender, WorkflowError> {
    let name = path.file_name().ok_or_else(|| {
        WorkflowError::Config(format!("Log file path has no file name: {}", path.display()))
    })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name.to_string_lossy())
        .build(dir)
        .map_err(|e| {
            WorkflowError::Config(format!("Failed to open log file {}: {}", path.display(), e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_appender_rejects_path_without_name() {
        let result = file_appender(Path::new("/"));
        assert!(matches!(result, Err(WorkflowError::Config(_))));
    }

    #[test]
    fn test_init_writes_to_log_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("workflow.log");

        let guard = init(&LogConfig {
            filter: "info".to_string(),
            log_file: Some(path.clone()),
        })
        .expect("first init succeeds");
        assert!(guard.is_some());

        tracing::info!(marker = "log-file-test", "Logging initialized");

        // Flushes the background writer
        drop(guard);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Logging initialized"));
        assert!(contents.contains("log-file-test"));

        let second = init(&LogConfig::default());
        assert!(matches!(second, Err(WorkflowError::Config(_))));
    }
}
