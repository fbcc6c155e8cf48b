//! Check entry point

use std::collections::HashMap;
use std::sync::Arc;

use sqlperf_connection::{ConnKey, ConnectionRegistry};
use sqlperf_core::{Connection, ConnectionParams};

use crate::collector::{Collector, PreviousSamples};
use crate::config::{InitConfig, InstanceConfig};
use crate::counter::{Collection, resolve_collection};
use crate::error::CheckError;
use crate::metrics::{MetricDefinition, build_catalog};
use crate::sink::MetricSink;

/// Source type reported alongside the check's events
pub const SOURCE_TYPE_NAME: &str = "sql server";

/// Resolution state of one catalog entry for one instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Pending,
    Ready(Collection),
    Rejected,
}

/// What the check remembers about an instance between cycles
#[derive(Debug)]
struct InstanceState {
    /// Indexed like the catalog
    resolutions: Vec<Resolution>,
    previous: PreviousSamples,
}

impl InstanceState {
    fn new(metrics: usize) -> Self {
        Self {
            resolutions: vec![Resolution::Pending; metrics],
            previous: HashMap::new(),
        }
    }
}

/// Identifies a configured instance: its connection identity and its tags.
///
/// Instances differing only in tags share a connection but keep separate
/// resolution state and average-bulk history.
type InstanceKey = (ConnKey, Vec<String>);

/// Result of one check cycle for one instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckOutcome {
    /// Number of values submitted to the sink
    pub submitted: usize,
    /// Warnings raised during the cycle
    pub warnings: Vec<String>,
}

impl CheckOutcome {
    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }
}

/// The SQL Server performance-counter check
pub struct SqlServerCheck {
    catalog: Vec<MetricDefinition>,
    instances: HashMap<InstanceKey, InstanceState>,
}

impl SqlServerCheck {
    /// Build the check from its shared configuration.
    ///
    /// Invalid custom metrics are logged and rejected.
    pub fn new(init_config: &InitConfig) -> Self {
        let catalog = build_catalog(&init_config.custom_metrics);
        tracing::debug!(metrics = catalog.len(), "metric catalog loaded");
        Self {
            catalog,
            instances: HashMap::new(),
        }
    }

    /// Metrics collected for every instance
    pub fn catalog(&self) -> &[MetricDefinition] {
        &self.catalog
    }

    /// Run one collection cycle against `instance`.
    ///
    /// Per-metric failures become warnings in the outcome. Only failing to
    /// obtain a connection ends the cycle early.
    #[tracing::instrument(
        skip(self, registry, instance, sink),
        fields(host = %instance.host, database = %instance.database)
    )]
    pub async fn check(
        &mut self,
        registry: &ConnectionRegistry,
        instance: &InstanceConfig,
        sink: &dyn MetricSink,
    ) -> Result<CheckOutcome, CheckError> {
        let params = instance.connection_params();
        let key = ConnKey::from_params(&params);
        let mut conn = acquire(registry, &params, &key).await?;

        let metrics = self.catalog.len();
        let state = self
            .instances
            .entry((key.clone(), instance.tags.clone()))
            .or_insert_with(|| InstanceState::new(metrics));

        let mut outcome = CheckOutcome::default();

        for (idx, metric) in self.catalog.iter().enumerate() {
            let collection = match state.resolutions[idx] {
                Resolution::Rejected => continue,
                Resolution::Ready(collection) => collection,
                Resolution::Pending => {
                    let resolved = resolve_collection(conn.as_ref(), metric).await;
                    match resolved {
                        Ok(collection) => {
                            state.resolutions[idx] = Resolution::Ready(collection);
                            collection
                        }
                        Err(e @ CheckError::BaseCounter { .. }) => {
                            state.resolutions[idx] = Resolution::Rejected;
                            tracing::warn!(metric = %metric.name, "{}", e);
                            outcome.warn(e.to_string());
                            continue;
                        }
                        Err(e) => {
                            tracing::warn!(metric = %metric.name, error = %e, "unable to resolve counter type");
                            outcome.warn(format!("Unable to fetch metric: {}", metric.name));
                            if e.is_connection_error() {
                                conn = reacquire(registry, &params, &key).await?;
                            }
                            continue;
                        }
                    }
                }
            };

            let collected = Collector::new(conn.as_ref(), sink, &instance.tags)
                .collect(metric, collection, &mut state.previous)
                .await;
            match collected {
                Ok(submitted) => outcome.submitted += submitted,
                Err(e) => {
                    tracing::warn!(metric = %metric.name, error = %e, "unable to fetch metric");
                    outcome.warn(format!("Unable to fetch metric: {}", metric.name));
                    if e.is_connection_error() {
                        conn = reacquire(registry, &params, &key).await?;
                    }
                }
            }
        }

        tracing::debug!(
            submitted = outcome.submitted,
            warnings = outcome.warnings.len(),
            "check cycle complete"
        );
        Ok(outcome)
    }
}

async fn acquire(
    registry: &ConnectionRegistry,
    params: &ConnectionParams,
    key: &ConnKey,
) -> Result<Arc<dyn Connection>, CheckError> {
    registry
        .get_or_connect(params)
        .await
        .map_err(|source| CheckError::Connection {
            instance: key.redacted(),
            source,
        })
}

/// Drop the broken connection and open a fresh one
async fn reacquire(
    registry: &ConnectionRegistry,
    params: &ConnectionParams,
    key: &ConnKey,
) -> Result<Arc<dyn Connection>, CheckError> {
    registry.invalidate(key).await;
    acquire(registry, params, key).await
}
