//! MS SQL Server driver implementation

use crate::connection::MssqlConnection;
use async_trait::async_trait;
use sqlperf_core::{Connection, ConnectionParams, DatabaseDriver, Result};
use std::sync::Arc;

/// How a connection authenticates.
///
/// Both the connection string and the tiberius login are derived from this,
/// so they always agree. Empty strings count as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Login<'a> {
    SqlServer {
        user: Option<&'a str>,
        password: Option<&'a str>,
    },
    Integrated,
}

impl<'a> Login<'a> {
    pub(crate) fn from_params(params: &'a ConnectionParams) -> Self {
        if params.uses_integrated_security() {
            return Login::Integrated;
        }
        Login::SqlServer {
            user: params.username.as_deref().filter(|u| !u.is_empty()),
            password: params.password.as_deref().filter(|p| !p.is_empty()),
        }
    }
}

/// MS SQL Server database driver
pub struct MssqlDriver;

impl MssqlDriver {
    /// Create a new MS SQL Server driver instance
    pub fn new() -> Self {
        tracing::debug!("MS SQL Server driver initialized");
        Self
    }
}

impl Default for MssqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for MssqlDriver {
    fn id(&self) -> &'static str {
        "mssql"
    }

    /// ADO connection string in the form OLE DB providers accept.
    ///
    /// Credentials are embedded when given; with neither a username nor a
    /// password the string asks for integrated security instead.
    fn build_connection_string(&self, params: &ConnectionParams) -> String {
        let mut conn_str = format!(
            "Provider=SQLOLEDB;Data Source={};Initial Catalog={};",
            params.host, params.database
        );

        match Login::from_params(params) {
            Login::SqlServer { user, password } => {
                if let Some(user) = user {
                    conn_str.push_str(&format!("User ID={};", user));
                }
                if let Some(password) = password {
                    conn_str.push_str(&format!("Password={};", password));
                }
            }
            Login::Integrated => conn_str.push_str("Integrated Security=SSPI;"),
        }

        conn_str
    }

    #[tracing::instrument(skip(self, params), fields(host = %params.host, database = %params.database))]
    async fn connect(&self, params: &ConnectionParams) -> Result<Arc<dyn Connection>> {
        tracing::debug!("connecting to MS SQL Server");
        let connection = MssqlConnection::connect(params).await?;
        Ok(Arc::new(connection))
    }
}
