//! Metric submission interface

use parking_lot::Mutex;

use crate::metrics::ReportKind;

/// Receives the values collected by the check.
///
/// Implemented by the host; `rate` takes the raw cumulative counter value and
/// the host derives the per-second rate between submissions.
pub trait MetricSink: Send + Sync {
    fn gauge(&self, name: &str, value: f64, tags: &[String]);

    fn rate(&self, name: &str, value: f64, tags: &[String]);

    fn histogram(&self, name: &str, value: f64, tags: &[String]);
}

/// Submit a value through the sink method matching `kind`
pub fn submit(sink: &dyn MetricSink, kind: ReportKind, name: &str, value: f64, tags: &[String]) {
    match kind {
        ReportKind::Gauge => sink.gauge(name, value, tags),
        ReportKind::Rate => sink.rate(name, value, tags),
        ReportKind::Histogram => sink.histogram(name, value, tags),
    }
}

/// A submitted value
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub kind: ReportKind,
    pub name: String,
    pub value: f64,
    pub tags: Vec<String>,
}

/// Sink that keeps every submission in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    samples: Mutex<Vec<Sample>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All samples submitted so far, in order
    pub fn samples(&self) -> Vec<Sample> {
        self.samples.lock().clone()
    }

    /// Samples submitted under `name`
    pub fn samples_named(&self, name: &str) -> Vec<Sample> {
        self.samples
            .lock()
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect()
    }

    /// Remove and return all samples
    pub fn take(&self) -> Vec<Sample> {
        std::mem::take(&mut *self.samples.lock())
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    fn record(&self, kind: ReportKind, name: &str, value: f64, tags: &[String]) {
        self.samples.lock().push(Sample {
            kind,
            name: name.to_string(),
            value,
            tags: tags.to_vec(),
        });
    }
}

impl MetricSink for MemorySink {
    fn gauge(&self, name: &str, value: f64, tags: &[String]) {
        self.record(ReportKind::Gauge, name, value, tags);
    }

    fn rate(&self, name: &str, value: f64, tags: &[String]) {
        self.record(ReportKind::Rate, name, value, tags);
    }

    fn histogram(&self, name: &str, value: f64, tags: &[String]) {
        self.record(ReportKind::Histogram, name, value, tags);
    }
}
