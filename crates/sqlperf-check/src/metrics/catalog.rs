//! Built-in metrics

use super::definition::{MetricDefinition, Scope, TOTAL_INSTANCE};
use crate::config::CustomMetricConfig;

/// Built-in metrics: (reported name, counter name, instance name)
pub const DEFAULT_METRICS: &[(&str, &str, &str)] = &[
    ("sqlserver.buffer.cache_hit_ratio", "Buffer cache hit ratio", ""),
    ("sqlserver.buffer.page_life_expectancy", "Page life expectancy", ""),
    ("sqlserver.stats.batch_requests", "Batch Requests/sec", ""),
    ("sqlserver.stats.sql_compilations", "SQL Compilations/sec", ""),
    ("sqlserver.stats.sql_recompilations", "SQL Re-Compilations/sec", ""),
    ("sqlserver.stats.connections", "User connections", ""),
    ("sqlserver.stats.lock_waits", "Lock Waits/sec", TOTAL_INSTANCE),
    ("sqlserver.access.page_splits", "Page Splits/sec", ""),
    ("sqlserver.stats.procs_blocked", "Processes Blocked", ""),
    ("sqlserver.buffer.checkpoint_pages", "Checkpoint pages/sec", ""),
];

/// The built-in metrics as definitions
pub fn default_catalog() -> Vec<MetricDefinition> {
    DEFAULT_METRICS
        .iter()
        .map(|(name, counter, instance)| {
            MetricDefinition::new(*name, *counter, Scope::Instance(instance.to_string()))
        })
        .collect()
}

/// Built-in metrics followed by the valid custom ones.
///
/// Invalid custom metrics are logged and left out.
pub fn build_catalog(custom_metrics: &[CustomMetricConfig]) -> Vec<MetricDefinition> {
    let mut catalog = default_catalog();

    for custom in custom_metrics {
        match MetricDefinition::from_custom(custom) {
            Ok(def) => catalog.push(def),
            Err(e) => tracing::error!(metric = %custom.name, error = %e, "rejecting custom metric"),
        }
    }

    catalog
}
