//! Logging setup for the CLI
//!
//! Compact human-readable output goes to stderr so it never interleaves with
//! prompts on stdout. With `--log-dir`, a daily-rolling JSON file is written
//! as well (useful when a long transfer fails unattended).

use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for JSON log files; `None` disables file logging
    pub log_dir: Option<PathBuf>,

    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,

    /// Whether to include file/line information in console logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            default_filter: "warn".to_string(),
            include_location: cfg!(debug_assertions),
        }
    }
}

impl LoggingConfig {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    pub fn with_log_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.log_dir = dir;
        self
    }
}

/// Initialize the global subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`.
pub fn init(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))?;

    let mut layers = Vec::new();

    let console_layer = fmt::layer()
        .compact()
        .with_target(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_writer(std::io::stderr)
        .with_filter(env_filter.clone())
        .boxed();
    layers.push(console_layer);

    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir)?;

        let file_appender = tracing_appender::rolling::daily(dir, "psql-transporter.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // The guard flushes on drop and must live until the process exits.
        std::mem::forget(guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(env_filter)
            .boxed();
        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        log_dir = ?config.log_dir,
        filter = %config.default_filter,
        "logging initialized"
    );
    Ok(())
}

/// Suggested location for `--log-dir`
pub fn default_log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("psql-transporter")
        .join("logs")
}
