//! sqlperf check - SQL Server performance counters
//!
//! This crate implements the check itself:
//! - Configuration model for instances and custom metrics
//! - The metric catalog (built-in and configured counters)
//! - Counter-type resolution from `sys.dm_os_performance_counters`
//! - Fetching counter values and dispatching them to a `MetricSink`

mod check;
mod collector;
pub mod config;
pub mod counter;
mod error;
pub mod metrics;
mod sink;

#[cfg(test)]
mod check_tests;

pub use check::{CheckOutcome, SOURCE_TYPE_NAME, SqlServerCheck};
pub use config::{CheckConfig, CustomMetricConfig, InitConfig, InstanceConfig};
pub use counter::CounterType;
pub use error::CheckError;
pub use metrics::{MetricDefinition, ReportKind, Scope};
pub use sink::{MemorySink, MetricSink, Sample, submit};
