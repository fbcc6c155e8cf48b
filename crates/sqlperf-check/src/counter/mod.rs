//! Performance counter types
//!
//! `sys.dm_os_performance_counters.cntr_type` tells how a counter's value
//! must be interpreted. This module maps those codes to a collection
//! strategy and resolves them from the database.

mod kind;
mod resolver;

#[cfg(test)]
mod tests;

pub use kind::{
    Collection, CounterType, PERF_AVERAGE_BULK, PERF_COUNTER_BULK_COUNT,
    PERF_COUNTER_LARGE_RAWCOUNT, PERF_LARGE_RAW_BASE, PERF_LARGE_RAW_FRACTION,
};
pub(crate) use resolver::base_counter_names;
pub use resolver::{COUNTER_TYPE_QUERY, resolve_collection, resolve_counter_type};
