//! Composite connection cache key

use sqlperf_core::ConnectionParams;

/// Identity of a cached connection.
///
/// Two instances share a connection exactly when host, username, password
/// and database are all equal. `trust_cert` is not part of the identity.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConnKey {
    host: String,
    username: Option<String>,
    password: Option<String>,
    database: String,
}

impl ConnKey {
    /// Build the key for a set of connection parameters
    pub fn from_params(params: &ConnectionParams) -> Self {
        Self {
            host: params.host.clone(),
            username: params.username.clone(),
            password: params.password.clone(),
            database: params.database.clone(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// `host:username:password:database` with the password masked, for logs
    pub fn redacted(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.host,
            self.username.as_deref().unwrap_or("None"),
            if self.password.is_some() { "********" } else { "None" },
            self.database
        )
    }
}

impl std::fmt::Display for ConnKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl std::fmt::Debug for ConnKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ConnKey").field(&self.redacted()).finish()
    }
}
