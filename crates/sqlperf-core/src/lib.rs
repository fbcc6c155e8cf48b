//! sqlperf core - shared abstractions for the SQL Server performance check
//!
//! This crate provides the traits and types that the driver, the connection
//! registry and the check itself depend on:
//!
//! - `DatabaseDriver` - opens connections from `ConnectionParams`
//! - `Connection` - a live database handle that runs parameterized queries
//! - Common types like `Value`, `Row`, `QueryResult`

mod connection;
mod driver;
mod error;
mod types;


pub use connection::*;
pub use driver::*;
pub use error::*;
pub use types::*;
