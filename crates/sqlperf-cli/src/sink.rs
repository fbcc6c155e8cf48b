//! JSON-lines metric output

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use sqlperf_check::{MetricSink, ReportKind};
use std::collections::HashMap;
use std::io::Write;

#[derive(Debug, Serialize)]
struct Line<'a> {
    metric: &'a str,
    kind: &'static str,
    value: f64,
    tags: &'a [String],
    timestamp: String,
}

/// Writes one JSON object per sample.
///
/// Rate submissions carry a cumulative counter; they are turned into a
/// per-second rate against the previous value for the same metric and tags.
/// The first value of a context, and any value lower than the previous one,
/// only primes it.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
    previous: Mutex<HashMap<(String, Vec<String>), (f64, DateTime<Utc>)>>,
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            previous: Mutex::new(HashMap::new()),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    /// Record a sample observed at `now`
    pub fn record_at(
        &self,
        kind: ReportKind,
        name: &str,
        value: f64,
        tags: &[String],
        now: DateTime<Utc>,
    ) {
        let value = match kind {
            ReportKind::Rate => match self.per_second(name, value, tags, now) {
                Some(rate) => rate,
                None => return,
            },
            ReportKind::Gauge | ReportKind::Histogram => value,
        };

        let line = Line {
            metric: name,
            kind: kind.as_str(),
            value,
            tags,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        if let Err(e) = write_line(&mut *self.writer.lock(), &line) {
            tracing::error!(metric = %name, error = %e, "failed to write metric");
        }
    }

    fn per_second(&self, name: &str, value: f64, tags: &[String], now: DateTime<Utc>) -> Option<f64> {
        let key = (name.to_string(), tags.to_vec());
        let (prev_value, prev_time) = self.previous.lock().insert(key, (value, now))?;

        let elapsed = (now - prev_time).num_milliseconds() as f64 / 1000.0;
        if elapsed <= 0.0 || value < prev_value {
            tracing::debug!(metric = %name, "counter reset or no elapsed time, re-priming rate");
            return None;
        }
        Some((value - prev_value) / elapsed)
    }
}

fn write_line<W: Write>(writer: &mut W, line: &Line<'_>) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, line)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

impl<W: Write + Send> MetricSink for JsonLinesSink<W> {
    fn gauge(&self, name: &str, value: f64, tags: &[String]) {
        self.record_at(ReportKind::Gauge, name, value, tags, Utc::now());
    }

    fn rate(&self, name: &str, value: f64, tags: &[String]) {
        self.record_at(ReportKind::Rate, name, value, tags, Utc::now());
    }

    fn histogram(&self, name: &str, value: f64, tags: &[String]) {
        self.record_at(ReportKind::Histogram, name, value, tags, Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn lines(sink: JsonLinesSink<Vec<u8>>) -> Vec<Value> {
        let out = String::from_utf8(sink.into_inner()).unwrap();
        out.lines().map(|l| serde_json::from_str(l).unwrap()).collect()
    }

    fn tags() -> Vec<String> {
        vec!["env:test".to_string()]
    }

    #[test]
    fn test_gauge_line() {
        let sink = JsonLinesSink::new(Vec::new());
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        sink.record_at(ReportKind::Gauge, "sqlserver.stats.connections", 42.0, &tags(), at);

        assert_eq!(
            lines(sink),
            vec![json!({
                "metric": "sqlserver.stats.connections",
                "kind": "gauge",
                "value": 42.0,
                "tags": ["env:test"],
                "timestamp": "2024-05-01T12:00:00.000Z",
            })]
        );
    }

    #[test]
    fn test_rate_needs_two_samples() {
        let sink = JsonLinesSink::new(Vec::new());
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        sink.record_at(ReportKind::Rate, "sqlserver.stats.batch_requests", 100.0, &tags(), at);
        sink.record_at(
            ReportKind::Rate,
            "sqlserver.stats.batch_requests",
            250.0,
            &tags(),
            at + Duration::seconds(15),
        );

        let lines = lines(sink);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["kind"], "rate");
        assert_eq!(lines[0]["value"], 10.0);
    }

    #[test]
    fn test_rate_contexts_are_separate_and_reset_reprimes() {
        let sink = JsonLinesSink::new(Vec::new());
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let other = vec!["env:other".to_string()];

        sink.record_at(ReportKind::Rate, "m", 100.0, &tags(), at);
        sink.record_at(ReportKind::Rate, "m", 5.0, &other, at + Duration::seconds(10));
        sink.record_at(ReportKind::Rate, "m", 50.0, &tags(), at + Duration::seconds(10));
        sink.record_at(ReportKind::Rate, "m", 70.0, &tags(), at + Duration::seconds(20));

        let lines = lines(sink);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["value"], 2.0);
        assert_eq!(lines[0]["tags"], json!(["env:test"]));
    }
}
