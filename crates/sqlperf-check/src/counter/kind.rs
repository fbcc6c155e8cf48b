//! Counter type codes

use crate::metrics::ReportKind;

pub const PERF_COUNTER_LARGE_RAWCOUNT: i64 = 65792;
pub const PERF_LARGE_RAW_FRACTION: i64 = 537003264;
pub const PERF_LARGE_RAW_BASE: i64 = 1073939712;
pub const PERF_COUNTER_BULK_COUNT: i64 = 272696576;
pub const PERF_AVERAGE_BULK: i64 = 1073874176;

/// The `cntr_type` of a performance counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterType {
    /// Last observed value
    LargeRawCount,
    /// Numerator of a ratio; divided by its base counter
    LargeRawFraction,
    /// Denominator of a fraction or average; never reported on its own
    LargeRawBase,
    /// Cumulative count, reported as a per-second rate
    BulkCount,
    /// Cumulative sum averaged over the change of its base counter
    AverageBulk,
    Unknown(i64),
}

impl CounterType {
    pub fn from_code(code: i64) -> Self {
        match code {
            PERF_COUNTER_LARGE_RAWCOUNT => CounterType::LargeRawCount,
            PERF_LARGE_RAW_FRACTION => CounterType::LargeRawFraction,
            PERF_LARGE_RAW_BASE => CounterType::LargeRawBase,
            PERF_COUNTER_BULK_COUNT => CounterType::BulkCount,
            PERF_AVERAGE_BULK => CounterType::AverageBulk,
            other => CounterType::Unknown(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            CounterType::LargeRawCount => PERF_COUNTER_LARGE_RAWCOUNT,
            CounterType::LargeRawFraction => PERF_LARGE_RAW_FRACTION,
            CounterType::LargeRawBase => PERF_LARGE_RAW_BASE,
            CounterType::BulkCount => PERF_COUNTER_BULK_COUNT,
            CounterType::AverageBulk => PERF_AVERAGE_BULK,
            CounterType::Unknown(code) => *code,
        }
    }

    pub fn is_base(&self) -> bool {
        matches!(self, CounterType::LargeRawBase)
    }

    /// How a counter of this type is collected, `None` for base counters.
    ///
    /// An explicitly configured kind overrides the inferred one and reports
    /// the raw value.
    pub fn collection(&self, explicit: Option<ReportKind>) -> Option<Collection> {
        if self.is_base() {
            return None;
        }
        if let Some(kind) = explicit {
            return Some(Collection::Raw(kind));
        }
        Some(match self {
            CounterType::LargeRawCount | CounterType::Unknown(_) => {
                Collection::Raw(ReportKind::Gauge)
            }
            CounterType::BulkCount => Collection::Raw(ReportKind::Rate),
            CounterType::LargeRawFraction => Collection::Fraction,
            CounterType::AverageBulk => Collection::AverageBulk,
            CounterType::LargeRawBase => return None,
        })
    }
}

/// Collection strategy for a resolved metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// Submit `cntr_value` as-is with the given kind
    Raw(ReportKind),
    /// Gauge of `cntr_value / base * 100`
    Fraction,
    /// Gauge of `Δcntr_value / Δbase` between consecutive samples
    AverageBulk,
}

impl Collection {
    /// Whether the collection reads the paired `<counter> base` row too
    pub fn needs_base(&self) -> bool {
        matches!(self, Collection::Fraction | Collection::AverageBulk)
    }
}
