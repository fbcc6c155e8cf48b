//! Error types for sqlperf

use thiserror::Error;

/// Core error type for sqlperf operations
#[derive(Error, Debug)]
pub enum SqlPerfError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Connection is closed")]
    Closed,
}

impl SqlPerfError {
    /// Whether the error means the underlying connection can no longer be
    /// trusted and must be recreated before the next use.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            SqlPerfError::Connection(_)
                | SqlPerfError::Io(_)
                | SqlPerfError::Timeout(_)
                | SqlPerfError::Closed
        )
    }
}

/// Result type alias for sqlperf operations
pub type Result<T> = std::result::Result<T, SqlPerfError>;
