use std::path::Path;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::error::{EtlError, Result};

/// Initialize the structured logging system.
///
/// Console output goes to stderr in the requested format; when a log file is
/// given, a JSON file layer with daily rotation is added. The returned guard
/// keeps the file writer flushing in the background and must be held for the
/// lifetime of the process.
pub fn init_logging(
    log_level: Option<&str>,
    format: &str,
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.unwrap_or("info")))
        .map_err(|err| EtlError::InvalidConfig(format!("Failed to create log filter: {err}")))?;

    let registry = Registry::default().with(env_filter);

    let guard = match (format, log_file) {
        ("json", Some(log_path)) => {
            let (appender, guard) = file_appender(log_path);
            let console_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true)
                .json();
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(true)
                .json();
            registry.with(console_layer).with(file_layer).init();
            Some(guard)
        }
        ("json", None) => {
            let console_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true)
                .json();
            registry.with(console_layer).init();
            None
        }
        (_, Some(log_path)) => {
            let (appender, guard) = file_appender(log_path);
            let console_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(true);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(true)
                .json();
            registry.with(console_layer).with(file_layer).init();
            Some(guard)
        }
        (_, None) => {
            let console_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(true);
            registry.with(console_layer).init();
            None
        }
    };

    info!("Logging system initialized");
    Ok(guard)
}

fn file_appender(log_path: &Path) -> (non_blocking::NonBlocking, WorkerGuard) {
    let directory = log_path.parent().unwrap_or_else(|| Path::new("."));
    let prefix = log_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("etl.log");
    non_blocking(rolling::daily(directory, prefix))
}

/// Performance timing utilities
pub struct OperationTimer {
    operation: String,
    start: std::time::Instant,
}

impl OperationTimer {
    /// Start timing an operation
    #[must_use]
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: std::time::Instant::now(),
        }
    }

    /// Log the elapsed time at info level and return it in milliseconds
    pub fn finish(self) -> u128 {
        let duration = self.start.elapsed().as_millis();
        tracing::info!(
            operation = %self.operation,
            duration_ms = duration,
            "Operation completed"
        );
        duration
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            let duration = self.start.elapsed().as_millis();
            tracing::debug!(
                operation = %self.operation,
                duration_ms = duration,
                "Operation finished"
            );
        }
    }
}
