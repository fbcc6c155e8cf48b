//! Logging setup for the sqlperf host
//!
//! Console output always goes to stderr so stdout stays reserved for metric
//! lines. It supports:
//! - Pretty console output for interactive runs, JSON for log shippers
//! - An optional daily-rolling JSON file
//! - Environment-based configuration via RUST_LOG

use clap::ValueEnum;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Console log format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Console output format
    pub format: LogFormat,

    /// Directory for rolling JSON log files; no file output when unset
    pub log_dir: Option<PathBuf>,

    /// Whether to include file/line information in logs
    pub include_location: bool,

    /// Whether to log span open/close events
    pub enable_spans: bool,

    /// Default log level filter
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            log_dir: None,
            include_location: cfg!(debug_assertions),
            enable_spans: false,
            default_filter: "info,sqlperf_check=info,sqlperf_connection=info,sqlperf_driver_mssql=info"
                .to_string(),
        }
    }
}

impl LoggingConfig {
    /// JSON console output without location info, for running under a supervisor
    pub fn production() -> Self {
        Self {
            format: LogFormat::Json,
            include_location: false,
            default_filter: "warn,sqlperf_cli=info,sqlperf_check=info,sqlperf_connection=info"
                .to_string(),
            ..Self::default()
        }
    }

    /// Verbose pretty output with spans
    pub fn development() -> Self {
        Self {
            include_location: true,
            enable_spans: true,
            default_filter: "debug,tiberius=info".to_string(),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_log_dir(mut self, log_dir: Option<PathBuf>) -> Self {
        self.log_dir = log_dir;
        self
    }
}

/// Initialize the global subscriber.
///
/// The returned guard flushes the file writer and must be held until exit.
pub fn init(config: LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    // RUST_LOG takes precedence over the default filter
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers = Vec::new();

    let console_layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events.clone())
            .with_ansi(true)
            .pretty()
            .with_filter(env_filter.clone())
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events.clone())
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_filter(env_filter.clone())
            .boxed(),
    };
    layers.push(console_layer);

    let mut guard = None;
    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir)?;

        let file_appender = tracing_appender::rolling::daily(log_dir, "sqlperf.log");
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(span_events)
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
        format = ?config.format,
        log_dir = ?config.log_dir,
        "logging initialized"
    );

    Ok(guard)
}

/// Default directory for log files
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sqlperf")
        .join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.log_dir.is_none());
        assert!(!config.enable_spans);
    }

    #[test]
    fn test_production_config() {
        let config = LoggingConfig::production();
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.include_location);
    }

    #[test]
    fn test_builders() {
        let config = LoggingConfig::development()
            .with_format(LogFormat::Json)
            .with_log_dir(Some(log_directory()));
        assert!(config.enable_spans);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.log_dir.is_some_and(|d| d.ends_with("sqlperf/logs")));
    }
}
