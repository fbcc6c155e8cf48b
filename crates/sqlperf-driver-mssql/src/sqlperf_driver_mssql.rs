//! MS SQL Server driver for sqlperf
//!
//! Opens tiberius connections from `ConnectionParams` and runs the
//! parameterized performance-counter queries issued by the check.

mod connection;
mod driver;

#[cfg(test)]
mod connection_tests;
#[cfg(test)]
mod driver_tests;

pub use connection::{MssqlConnection, MssqlConnectionError};
pub use driver::MssqlDriver;
