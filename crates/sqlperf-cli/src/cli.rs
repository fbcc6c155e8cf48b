//! sqlperf - collect SQL Server performance counters
//!
//! Runs the check for every configured instance on an interval and writes the
//! collected metrics to stdout as JSON lines.
//!
//! Usage:
//!   sqlperf --config sqlperf.toml
//!   sqlperf --config sqlperf.toml --once --log-format json
//!   SQLPERF_CONFIG=sqlperf.toml sqlperf --interval 30

mod logging;
mod settings;
mod sink;

use anyhow::Context as _;
use clap::Parser;
use sqlperf_check::{CheckConfig, InstanceConfig, MetricSink, SOURCE_TYPE_NAME, SqlServerCheck};
use sqlperf_connection::ConnectionRegistry;
use sqlperf_driver_mssql::MssqlDriver;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::logging::{LogFormat, LoggingConfig};
use crate::sink::JsonLinesSink;

#[derive(Parser)]
#[command(name = "sqlperf", about = "Collect SQL Server performance counters", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "SQLPERF_CONFIG")]
    config: PathBuf,

    /// Run a single collection cycle and exit.
    ///
    /// Rate metrics and average counters need two consecutive samples, so a
    /// single cycle writes only the values readable from one sample.
    #[arg(long)]
    once: bool,

    /// Seconds between cycles (overrides init_config.min_collection_interval)
    #[arg(long)]
    interval: Option<u64>,

    /// Console log format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Also write rolling JSON logs to this directory
    #[arg(long, env = "SQLPERF_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Write rolling JSON logs to the default log directory
    #[arg(long, conflicts_with = "log_dir")]
    log_to_file: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| cli.log_to_file.then(logging::log_directory));
    let logging_config = if cfg!(debug_assertions) {
        LoggingConfig::development()
    } else {
        LoggingConfig::production()
    }
    .with_format(cli.log_format)
    .with_log_dir(log_dir);
    let _guard = logging::init(logging_config)?;

    let config = settings::load(&cli.config)?;
    let interval = Duration::from_secs(
        cli.interval
            .unwrap_or(config.init_config.min_collection_interval)
            .max(1),
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(run(config, interval, cli.once))
}

async fn run(config: CheckConfig, interval: Duration, once: bool) -> anyhow::Result<()> {
    let registry = ConnectionRegistry::new(Arc::new(MssqlDriver::new()));
    let mut check = SqlServerCheck::new(&config.init_config);
    let sink = JsonLinesSink::stdout();

    tracing::info!(
        source_type = SOURCE_TYPE_NAME,
        instances = config.instances.len(),
        metrics = check.catalog().len(),
        interval_secs = interval.as_secs(),
        "starting collection"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, shutting down");
                break;
            }
        }

        run_cycle(&mut check, &registry, &config.instances, &sink).await;

        if once {
            break;
        }
    }

    registry.close_all().await;
    Ok(())
}

/// Check every instance in turn; a failing instance does not stop the others
async fn run_cycle(
    check: &mut SqlServerCheck,
    registry: &ConnectionRegistry,
    instances: &[InstanceConfig],
    sink: &dyn MetricSink,
) {
    let started = std::time::Instant::now();
    let mut submitted = 0;

    for instance in instances {
        match check.check(registry, instance, sink).await {
            Ok(outcome) => submitted += outcome.submitted,
            Err(e) => tracing::error!(
                host = %instance.host,
                database = %instance.database,
                error = %e,
                "check failed"
            ),
        }
    }

    tracing::debug!(
        submitted,
        duration_ms = started.elapsed().as_millis() as u64,
        "collection cycle complete"
    );
}
