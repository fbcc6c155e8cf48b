//! Counter type lookup

use sqlperf_core::{Connection, Value};

use super::{Collection, CounterType};
use crate::error::{CheckError, Result};
use crate::metrics::MetricDefinition;

pub const COUNTER_TYPE_QUERY: &str = "select cntr_type \
     from sys.dm_os_performance_counters \
     where counter_name = @P1";

/// Query the type code of `counter_name`
pub async fn resolve_counter_type(conn: &dyn Connection, counter_name: &str) -> Result<CounterType> {
    let result = conn
        .query(COUNTER_TYPE_QUERY, &[Value::from(counter_name)])
        .await?;

    let code = result
        .first()
        .and_then(|row| row.get(0))
        .ok_or_else(|| CheckError::UnknownCounter {
            counter: counter_name.to_string(),
        })?;

    code.as_i64()
        .map(CounterType::from_code)
        .ok_or_else(|| CheckError::InvalidValue {
            counter: counter_name.to_string(),
            value: code.to_string(),
        })
}

/// Resolve how `metric` is collected.
///
/// Base counters are rejected with `CheckError::BaseCounter`.
#[tracing::instrument(skip(conn, metric), fields(metric = %metric.name, counter = %metric.counter_name))]
pub async fn resolve_collection(conn: &dyn Connection, metric: &MetricDefinition) -> Result<Collection> {
    let counter_type = resolve_counter_type(conn, &metric.counter_name).await?;
    tracing::debug!(cntr_type = counter_type.code(), "resolved counter type");

    if let CounterType::Unknown(code) = counter_type {
        tracing::debug!(cntr_type = code, "unrecognized counter type, reporting as gauge");
    }

    counter_type
        .collection(metric.kind)
        .ok_or_else(|| CheckError::BaseCounter {
            metric: metric.name.clone(),
            counter: metric.counter_name.clone(),
        })
}

/// Candidate names of the base counter paired with a fraction or average counter.
///
/// SQL Server names most of them after the counter minus a `(ms)` unit
/// suffix (`Average Wait Time Base`), some after the full counter name
/// (`Avg Disk Read IO (ms) Base`). Both are tried; they coincide when the
/// counter has no unit suffix.
pub(crate) fn base_counter_names(counter_name: &str) -> [String; 2] {
    let full = counter_name.trim();
    let stem = full.strip_suffix("(ms)").unwrap_or(full).trim_end();
    [format!("{stem} base"), format!("{full} base")]
}
