use super::*;
use crate::error::CheckError;
use crate::metrics::{MetricDefinition, ReportKind, Scope};
use async_trait::async_trait;
use sqlperf_core::{Connection, QueryResult, Result, SqlPerfError, Value};

/// Answers the type query from a fixed (counter, cntr_type) list
struct TypeTable {
    types: Vec<(&'static str, i64)>,
}

#[async_trait]
impl Connection for TypeTable {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        assert_eq!(sql, COUNTER_TYPE_QUERY);
        let name = params.first().and_then(Value::as_str).unwrap_or_default();
        if name == "Broken" {
            return Err(SqlPerfError::Query("Invalid object name".into()));
        }
        let rows = self
            .types
            .iter()
            .filter(|(counter, _)| *counter == name)
            .map(|(_, code)| vec![Value::Int32(*code as i32)])
            .collect();
        Ok(QueryResult::from_rows(vec!["cntr_type".into()], rows))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }
}

fn table() -> TypeTable {
    TypeTable {
        types: vec![
            ("User connections", PERF_COUNTER_LARGE_RAWCOUNT),
            ("Buffer cache hit ratio", PERF_LARGE_RAW_FRACTION),
            ("Buffer cache hit ratio base", PERF_LARGE_RAW_BASE),
            ("Batch Requests/sec", PERF_COUNTER_BULK_COUNT),
            ("Average Wait Time (ms)", PERF_AVERAGE_BULK),
            ("Odd counter", 1_073_874_000),
        ],
    }
}

fn metric(counter: &str) -> MetricDefinition {
    MetricDefinition::new("sqlserver.test", counter, Scope::Instance(String::new()))
}

mod kind_tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(CounterType::from_code(65792), CounterType::LargeRawCount);
        assert_eq!(CounterType::from_code(537003264), CounterType::LargeRawFraction);
        assert_eq!(CounterType::from_code(1073939712), CounterType::LargeRawBase);
        assert_eq!(CounterType::from_code(272696576), CounterType::BulkCount);
        assert_eq!(CounterType::from_code(1073874176), CounterType::AverageBulk);
        assert_eq!(CounterType::from_code(42), CounterType::Unknown(42));
        assert_eq!(CounterType::Unknown(42).code(), 42);
    }

    #[test]
    fn test_inferred_collection() {
        assert_eq!(
            CounterType::LargeRawCount.collection(None),
            Some(Collection::Raw(ReportKind::Gauge))
        );
        assert_eq!(
            CounterType::BulkCount.collection(None),
            Some(Collection::Raw(ReportKind::Rate))
        );
        assert_eq!(CounterType::LargeRawFraction.collection(None), Some(Collection::Fraction));
        assert_eq!(CounterType::AverageBulk.collection(None), Some(Collection::AverageBulk));
        assert_eq!(
            CounterType::Unknown(7).collection(None),
            Some(Collection::Raw(ReportKind::Gauge))
        );
        assert_eq!(CounterType::LargeRawBase.collection(None), None);
    }

    #[test]
    fn test_explicit_kind_overrides_but_not_for_base() {
        assert_eq!(
            CounterType::LargeRawFraction.collection(Some(ReportKind::Histogram)),
            Some(Collection::Raw(ReportKind::Histogram))
        );
        assert_eq!(CounterType::LargeRawBase.collection(Some(ReportKind::Gauge)), None);
        assert!(Collection::Fraction.needs_base());
        assert!(!Collection::Raw(ReportKind::Gauge).needs_base());
    }

    #[test]
    fn test_base_counter_names() {
        assert_eq!(
            base_counter_names("Buffer cache hit ratio"),
            ["Buffer cache hit ratio base", "Buffer cache hit ratio base"]
        );
        assert_eq!(
            base_counter_names("Average Wait Time (ms)"),
            ["Average Wait Time base", "Average Wait Time (ms) base"]
        );
        assert_eq!(
            base_counter_names("  Cache Hit Ratio   "),
            ["Cache Hit Ratio base", "Cache Hit Ratio base"]
        );
    }
}

mod resolver_tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_counter_type() {
        let conn = table();
        assert_eq!(
            resolve_counter_type(&conn, "User connections").await.unwrap(),
            CounterType::LargeRawCount
        );
        assert_eq!(
            resolve_counter_type(&conn, "Batch Requests/sec").await.unwrap(),
            CounterType::BulkCount
        );
    }

    #[tokio::test]
    async fn test_missing_counter() {
        let err = resolve_counter_type(&table(), "No such counter").await.unwrap_err();
        assert!(matches!(err, CheckError::UnknownCounter { ref counter } if counter == "No such counter"));
    }

    #[tokio::test]
    async fn test_query_error_propagates() {
        let err = resolve_counter_type(&table(), "Broken").await.unwrap_err();
        assert!(matches!(err, CheckError::Query(SqlPerfError::Query(_))));
        assert!(!err.is_connection_error());
    }

    #[tokio::test]
    async fn test_resolve_collection_rejects_base() {
        let def = metric("Buffer cache hit ratio base");
        let err = resolve_collection(&table(), &def).await.unwrap_err();
        assert!(matches!(err, CheckError::BaseCounter { .. }));
        assert!(err.to_string().contains("is of type Base"));

        let def = metric("Buffer cache hit ratio base").with_kind(ReportKind::Gauge);
        let err = resolve_collection(&table(), &def).await.unwrap_err();
        assert!(matches!(err, CheckError::BaseCounter { .. }));
    }

    #[tokio::test]
    async fn test_resolve_collection() {
        let conn = table();
        assert_eq!(
            resolve_collection(&conn, &metric("Buffer cache hit ratio")).await.unwrap(),
            Collection::Fraction
        );
        assert_eq!(
            resolve_collection(&conn, &metric("Average Wait Time (ms)")).await.unwrap(),
            Collection::AverageBulk
        );
        assert_eq!(
            resolve_collection(&conn, &metric("Odd counter")).await.unwrap(),
            Collection::Raw(ReportKind::Gauge)
        );
        assert_eq!(
            resolve_collection(&conn, &metric("User connections").with_kind(ReportKind::Rate))
                .await
                .unwrap(),
            Collection::Raw(ReportKind::Rate)
        );
    }
}
