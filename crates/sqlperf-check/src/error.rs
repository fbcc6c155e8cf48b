//! Error types for the check

use sqlperf_core::SqlPerfError;
use thiserror::Error;

/// Errors raised while configuring or running the check
#[derive(Error, Debug)]
pub enum CheckError {
    /// The instance's connection could not be opened; aborts that instance's cycle
    #[error("Unable to connect to SQL Server for instance {instance}: {source}")]
    Connection {
        instance: String,
        #[source]
        source: SqlPerfError,
    },

    #[error("{metric} has an invalid metric type: {kind}")]
    InvalidMetricType { metric: String, kind: String },

    #[error("Metric {metric} is of type Base and shouldn't be reported this way (counter {counter})")]
    BaseCounter { metric: String, counter: String },

    #[error("Counter not found: {counter}")]
    UnknownCounter { counter: String },

    #[error("No row for counter {counter:?} with instance {instance:?}")]
    MissingRow { counter: String, instance: String },

    #[error("Counter {counter:?} returned a non-numeric value: {value}")]
    InvalidValue { counter: String, value: String },

    #[error("Query failed: {0}")]
    Query(#[from] SqlPerfError),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

impl CheckError {
    /// Whether the failure came from the transport rather than the query
    pub fn is_connection_error(&self) -> bool {
        match self {
            CheckError::Connection { .. } => true,
            CheckError::Query(e) => e.is_connection_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;
