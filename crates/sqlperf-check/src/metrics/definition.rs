//! Metric definitions and reporting kinds

use crate::config::CustomMetricConfig;
use crate::error::CheckError;
use std::fmt;
use std::str::FromStr;

/// Configured instance name meaning "every non-aggregate instance"
pub const ALL_INSTANCES: &str = "ALL";

/// Instance name of the aggregate row
pub const TOTAL_INSTANCE: &str = "_Total";

/// Tag key used for `ALL` metrics that do not configure `tag_by`
pub const DEFAULT_TAG_BY: &str = "instance";

/// How a value is submitted to the metrics backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Gauge,
    Rate,
    Histogram,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Gauge => "gauge",
            ReportKind::Rate => "rate",
            ReportKind::Histogram => "histogram",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauge" => Ok(ReportKind::Gauge),
            "rate" => Ok(ReportKind::Rate),
            "histogram" => Ok(ReportKind::Histogram),
            other => Err(other.to_string()),
        }
    }
}

/// Which counter instance rows a metric reads
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// One named instance; `""` for singular counters, `_Total` for the aggregate
    Instance(String),
    /// Every instance except `_Total`, each tagged separately
    All,
}

impl Scope {
    /// Scope for a configured instance name (`None` and `""` are singular)
    pub fn from_config(instance_name: Option<&str>) -> Self {
        match instance_name {
            Some(ALL_INSTANCES) => Scope::All,
            Some(name) => Scope::Instance(name.to_string()),
            None => Scope::Instance(String::new()),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Scope::All)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Instance(name) => write!(f, "{:?}", name),
            Scope::All => f.write_str(ALL_INSTANCES),
        }
    }
}

/// One metric the check collects
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDefinition {
    /// Name the metric is reported under
    pub name: String,
    /// `counter_name` in `sys.dm_os_performance_counters`
    pub counter_name: String,
    /// Explicit reporting kind; `None` infers it from the counter type
    pub kind: Option<ReportKind>,
    pub scope: Scope,
    /// Tag key carrying the instance name for `ALL` metrics
    pub tag_by: String,
}

impl MetricDefinition {
    pub fn new(name: impl Into<String>, counter_name: impl Into<String>, scope: Scope) -> Self {
        Self {
            name: name.into(),
            counter_name: counter_name.into(),
            kind: None,
            scope,
            tag_by: DEFAULT_TAG_BY.to_string(),
        }
    }

    pub fn with_kind(mut self, kind: ReportKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_tag_by(mut self, tag_by: impl Into<String>) -> Self {
        self.tag_by = tag_by.into();
        self
    }

    /// Validate a custom metric from configuration.
    ///
    /// An unknown `type` rejects the metric.
    pub fn from_custom(custom: &CustomMetricConfig) -> Result<Self, CheckError> {
        let scope = Scope::from_config(custom.instance_name.as_deref());
        let mut def = Self::new(&custom.name, &custom.counter_name, scope);

        if let Some(kind) = custom.metric_type.as_deref() {
            let kind = kind.parse::<ReportKind>().map_err(|kind| CheckError::InvalidMetricType {
                metric: custom.name.clone(),
                kind,
            })?;
            def = def.with_kind(kind);
        }
        if let Some(tag_by) = custom.tag_by.as_deref().filter(|t| !t.is_empty()) {
            def = def.with_tag_by(tag_by);
        }

        Ok(def)
    }
}
