use std::io;

use serde::Deserialize;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// `[logging]` section of the coordination config
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: String,

    /// Used when `RUST_LOG` is unset
    pub level: String,

    /// Mirror file output to stdout
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_dir: "./logs".to_string(), level: "info".to_string(), stdout: true }
    }
}

impl LoggingConfig {
    /// Parsed `level`, INFO when unrecognised
    pub fn default_level(&self) -> Level {
        self.level.trim().parse().unwrap_or(Level::INFO)
    }
}

/// Install the global subscriber: hourly rolling file, optionally stdout too
///
/// Keep the returned guard alive for the life of the process or buffered
/// file output is lost.
pub fn init(app_name: &str, logging: &LoggingConfig) -> WorkerGuard {
    let _ = std::fs::create_dir_all(&logging.log_dir);

    // Background thread owns the file I/O
    let file_appender = tracing_appender::rolling::hourly(&logging.log_dir, format!("{app_name}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::builder().with_default_directive(logging.default_level().into()).from_env_lossy();

    let file_layer =
        fmt::layer().with_writer(non_blocking).with_target(true).with_thread_ids(true).with_line_number(true).with_ansi(false).compact();

    let stdout_layer = logging.stdout.then(|| fmt::layer().with_writer(io::stdout).with_target(true).with_thread_ids(true).with_ansi(true).compact());

    tracing_subscriber::registry().with(env_filter).with(file_layer).with(stdout_layer).init();

    guard
}
