//! Database driver trait and connection parameters

use crate::{Connection, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Default SQL Server address used when an instance does not configure one
pub const DEFAULT_HOST: &str = "127.0.0.1,1433";

/// Default SQL Server port
pub const DEFAULT_PORT: u16 = 1433;

/// Default database used when an instance does not configure one
pub const DEFAULT_DATABASE: &str = "master";

/// Parameters needed to open a connection to one database instance
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Server address as configured (`host`, `host,port`, `host;port` or `host:port`)
    pub host: String,
    /// Database name
    pub database: String,
    /// Username (None for integrated security)
    pub username: Option<String>,
    /// Password
    pub password: Option<String>,
    /// Trust the server certificate without validation
    pub trust_cert: bool,
}

impl ConnectionParams {
    /// Create parameters for the given host and database
    pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            database: database.into(),
            username: None,
            password: None,
            trust_cert: false,
        }
    }

    /// Builder method: set credentials
    pub fn with_credentials(
        mut self,
        username: Option<impl Into<String>>,
        password: Option<impl Into<String>>,
    ) -> Self {
        self.username = username.map(Into::into);
        self.password = password.map(Into::into);
        self
    }

    /// Builder method: trust the server certificate
    pub fn with_trust_cert(mut self, trust: bool) -> Self {
        self.trust_cert = trust;
        self
    }

    /// Whether neither a username nor a password was given
    pub fn uses_integrated_security(&self) -> bool {
        self.username.as_deref().is_none_or(str::is_empty)
            && self.password.as_deref().is_none_or(str::is_empty)
    }

    /// Split the configured host into a server name and port.
    ///
    /// Accepts `,` and `;` as port separators, and `:` when the host holds a
    /// single colon (so bare IPv6 literals are left untouched). A missing or
    /// unparsable port falls back to 1433.
    pub fn server_address(&self) -> (String, u16) {
        let host = self.host.trim();
        let split = host
            .rfind([',', ';'])
            .or_else(|| (host.matches(':').count() == 1).then(|| host.rfind(':')).flatten());

        match split {
            Some(idx) => {
                let name = host[..idx].trim();
                let port = host[idx + 1..].trim().parse().unwrap_or(DEFAULT_PORT);
                (name.to_string(), port)
            }
            None => (host.to_string(), DEFAULT_PORT),
        }
    }
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_DATABASE)
    }
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("trust_cert", &self.trust_cert)
            .finish()
    }
}

/// A database driver able to open connections
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Unique identifier for this driver (e.g., "mssql")
    fn id(&self) -> &'static str;

    /// Build the driver's connection string for the given parameters
    fn build_connection_string(&self, params: &ConnectionParams) -> String;

    /// Open a new connection
    async fn connect(&self, params: &ConnectionParams) -> Result<Arc<dyn Connection>>;
}
