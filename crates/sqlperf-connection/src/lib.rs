//! sqlperf connection - connection caching for check instances
//!
//! Connections are cached per `ConnKey` (host, username, password,
//! database) and recreated after a failed use.

mod key;
mod registry;


pub use key::ConnKey;
pub use registry::ConnectionRegistry;
