//! Metric catalog
//!
//! Built-in SQL Server metrics plus the custom metrics loaded from
//! `init_config.custom_metrics`.

mod catalog;
mod definition;


pub use catalog::{DEFAULT_METRICS, build_catalog, default_catalog};
pub use definition::{ALL_INSTANCES, DEFAULT_TAG_BY, MetricDefinition, ReportKind, Scope, TOTAL_INSTANCE};
