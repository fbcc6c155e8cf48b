//! Counter value fetching and dispatch
//!
//! Every query is parameterized and reads `sys.dm_os_performance_counters`.
//! The view pads `counter_name` and `instance_name`, so both are trimmed
//! before they are compared or used as tags.

use std::collections::{BTreeMap, HashMap};

use sqlperf_core::{Connection, Row, Value};

use crate::counter::{Collection, base_counter_names};
use crate::error::{CheckError, Result};
use crate::metrics::{ALL_INSTANCES, MetricDefinition, ReportKind, Scope};
use crate::sink::{MetricSink, submit};

pub const SINGLE_INSTANCE_QUERY: &str = "select cntr_value \
     from sys.dm_os_performance_counters \
     where counter_name = @P1 \
     and instance_name = @P2";

pub const ALL_INSTANCES_QUERY: &str = "select instance_name, cntr_value \
     from sys.dm_os_performance_counters \
     where counter_name = @P1 \
     and instance_name != '_Total'";

pub const PAIR_SINGLE_INSTANCE_QUERY: &str = "select counter_name, instance_name, cntr_value \
     from sys.dm_os_performance_counters \
     where counter_name in (@P1, @P2, @P3) \
     and instance_name = @P4";

pub const PAIR_ALL_INSTANCES_QUERY: &str = "select counter_name, instance_name, cntr_value \
     from sys.dm_os_performance_counters \
     where counter_name in (@P1, @P2, @P3) \
     and instance_name != '_Total'";

/// Last (value, base) seen per (metric, counter instance), for average-bulk counters
pub(crate) type PreviousSamples = HashMap<(String, String), (f64, f64)>;

/// Fetches metrics over one connection and submits them with the instance's tags
pub(crate) struct Collector<'a> {
    conn: &'a dyn Connection,
    sink: &'a dyn MetricSink,
    tags: &'a [String],
}

impl<'a> Collector<'a> {
    pub(crate) fn new(conn: &'a dyn Connection, sink: &'a dyn MetricSink, tags: &'a [String]) -> Self {
        Self { conn, sink, tags }
    }

    /// Fetch `metric` and submit its values; returns how many were submitted
    pub(crate) async fn collect(
        &self,
        metric: &MetricDefinition,
        collection: Collection,
        previous: &mut PreviousSamples,
    ) -> Result<usize> {
        match collection {
            Collection::Raw(kind) => match &metric.scope {
                Scope::Instance(instance) => self.collect_single(metric, kind, instance).await,
                Scope::All => self.collect_all(metric, kind).await,
            },
            Collection::Fraction => {
                let pairs = self.complete_pairs(metric, self.fetch_pairs(metric).await?)?;
                let mut submitted = 0;
                for (instance, value, base) in pairs {
                    if base == 0.0 {
                        tracing::debug!(metric = %metric.name, instance = %instance, "base counter is zero, skipping");
                        continue;
                    }
                    self.emit(metric, ReportKind::Gauge, value / base * 100.0, &instance);
                    submitted += 1;
                }
                Ok(submitted)
            }
            Collection::AverageBulk => {
                let pairs = self.complete_pairs(metric, self.fetch_pairs(metric).await?)?;

                // Forget counter instances that are gone, e.g. a dropped database
                previous.retain(|(name, instance), _| {
                    name != &metric.name || pairs.iter().any(|(seen, _, _)| seen == instance)
                });

                let mut submitted = 0;
                for (instance, value, base) in pairs {
                    let key = (metric.name.clone(), instance.clone());
                    let Some((prev_value, prev_base)) = previous.insert(key, (value, base)) else {
                        continue;
                    };
                    let (delta, delta_base) = (value - prev_value, base - prev_base);
                    if delta < 0.0 || delta_base <= 0.0 {
                        continue;
                    }
                    self.emit(metric, ReportKind::Gauge, delta / delta_base, &instance);
                    submitted += 1;
                }
                Ok(submitted)
            }
        }
    }

    async fn collect_single(&self, metric: &MetricDefinition, kind: ReportKind, instance: &str) -> Result<usize> {
        let result = self
            .conn
            .query(
                SINGLE_INSTANCE_QUERY,
                &[Value::from(metric.counter_name.as_str()), Value::from(instance)],
            )
            .await?;

        let row = result.first().ok_or_else(|| CheckError::MissingRow {
            counter: metric.counter_name.clone(),
            instance: instance.to_string(),
        })?;
        let value = numeric(row, 0, &metric.counter_name)?;

        submit(self.sink, kind, &metric.name, value, self.tags);
        Ok(1)
    }

    async fn collect_all(&self, metric: &MetricDefinition, kind: ReportKind) -> Result<usize> {
        let result = self
            .conn
            .query(ALL_INSTANCES_QUERY, &[Value::from(metric.counter_name.as_str())])
            .await?;

        let mut submitted = 0;
        for row in &result.rows {
            let instance = text(row, 0);
            let value = numeric(row, 1, &metric.counter_name)?;
            self.emit(metric, kind, value, &instance);
            submitted += 1;
        }
        Ok(submitted)
    }

    /// Counter and base values per trimmed instance name
    async fn fetch_pairs(
        &self,
        metric: &MetricDefinition,
    ) -> Result<BTreeMap<String, (Option<f64>, Option<f64>)>> {
        let base_names = base_counter_names(&metric.counter_name);
        let mut params = vec![
            Value::from(metric.counter_name.as_str()),
            Value::from(base_names[0].as_str()),
            Value::from(base_names[1].as_str()),
        ];

        let sql = match &metric.scope {
            Scope::Instance(instance) => {
                params.push(Value::from(instance.as_str()));
                PAIR_SINGLE_INSTANCE_QUERY
            }
            Scope::All => PAIR_ALL_INSTANCES_QUERY,
        };
        let result = self.conn.query(sql, &params).await?;

        let mut pairs: BTreeMap<String, (Option<f64>, Option<f64>)> = BTreeMap::new();
        for row in &result.rows {
            let counter_name = text(row, 0);
            let instance = text(row, 1);
            let value = numeric(row, 2, &counter_name)?;
            let entry = pairs.entry(instance).or_default();
            if counter_name.eq_ignore_ascii_case(metric.counter_name.trim()) {
                entry.0 = Some(value);
            } else if base_names.iter().any(|b| counter_name.eq_ignore_ascii_case(b)) {
                entry.1 = Some(value);
            }
        }

        if pairs.is_empty() {
            if let Scope::Instance(instance) = &metric.scope {
                return Err(CheckError::MissingRow {
                    counter: metric.counter_name.clone(),
                    instance: instance.clone(),
                });
            }
        }
        Ok(pairs)
    }

    /// The (instance, value, base) triples with both halves present.
    ///
    /// A singular metric missing either row is an error. An `ALL` metric skips
    /// incomplete instances, but fails when rows came back and none of them
    /// pair up, which means the base counter was not found.
    fn complete_pairs(
        &self,
        metric: &MetricDefinition,
        pairs: BTreeMap<String, (Option<f64>, Option<f64>)>,
    ) -> Result<Vec<(String, f64, f64)>> {
        let fetched = pairs.len();
        let mut missing_base = false;
        let mut complete = Vec::with_capacity(fetched);

        for (instance, pair) in pairs {
            match pair {
                (Some(value), Some(base)) => complete.push((instance, value, base)),
                (value, _) if !metric.scope.is_all() => {
                    return Err(CheckError::MissingRow {
                        counter: if value.is_none() {
                            metric.counter_name.clone()
                        } else {
                            base_counter_names(&metric.counter_name)[0].clone()
                        },
                        instance,
                    });
                }
                (value, _) => {
                    missing_base |= value.is_some();
                    tracing::debug!(metric = %metric.name, instance = %instance, "incomplete counter pair, skipping");
                }
            }
        }

        if fetched > 0 && complete.is_empty() {
            return Err(CheckError::MissingRow {
                counter: if missing_base {
                    base_counter_names(&metric.counter_name)[0].clone()
                } else {
                    metric.counter_name.clone()
                },
                instance: ALL_INSTANCES.to_string(),
            });
        }
        Ok(complete)
    }

    /// Submit one value, tagging it with the counter instance for `ALL` metrics
    fn emit(&self, metric: &MetricDefinition, kind: ReportKind, value: f64, instance: &str) {
        if metric.scope.is_all() {
            let tags = instance_tags(&metric.tag_by, instance, self.tags);
            submit(self.sink, kind, &metric.name, value, &tags);
        } else {
            submit(self.sink, kind, &metric.name, value, self.tags);
        }
    }
}

/// `<tag_by>:<instance>` followed by the instance's configured tags
pub(crate) fn instance_tags(tag_by: &str, instance: &str, tags: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(tags.len() + 1);
    out.push(format!("{}:{}", tag_by, instance.trim()));
    out.extend(tags.iter().cloned());
    out
}

fn text(row: &Row, index: usize) -> String {
    match row.get(index) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string().trim().to_string(),
    }
}

fn numeric(row: &Row, index: usize, counter: &str) -> Result<f64> {
    let value = row.get(index).unwrap_or(&Value::Null);
    value.as_f64().ok_or_else(|| CheckError::InvalidValue {
        counter: counter.to_string(),
        value: value.to_string(),
    })
}
