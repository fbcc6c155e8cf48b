//! Check configuration
//!
//! Mirrors the host's configuration shape: a shared `init_config` section
//! and one entry per monitored SQL Server instance.

use serde::{Deserialize, Serialize};
use sqlperf_core::{ConnectionParams, DEFAULT_DATABASE, DEFAULT_HOST};

use crate::error::CheckError;

/// Default interval between check runs, in seconds
pub const DEFAULT_COLLECTION_INTERVAL_SECS: u64 = 15;

/// Full check configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckConfig {
    #[serde(default)]
    pub init_config: InitConfig,
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

impl CheckConfig {
    /// Parse a TOML configuration document
    pub fn from_toml(content: &str) -> Result<Self, CheckError> {
        Ok(toml::from_str(content)?)
    }
}

/// Settings shared by every instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    /// Extra counters to collect on top of the built-in ones
    #[serde(default)]
    pub custom_metrics: Vec<CustomMetricConfig>,
    /// Seconds between check runs
    #[serde(default = "default_interval")]
    pub min_collection_interval: u64,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            custom_metrics: Vec::new(),
            min_collection_interval: DEFAULT_COLLECTION_INTERVAL_SECS,
        }
    }
}

fn default_interval() -> u64 {
    DEFAULT_COLLECTION_INTERVAL_SECS
}

/// A user-defined counter to collect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMetricConfig {
    /// Name to report the metric under
    pub name: String,
    /// `counter_name` in `sys.dm_os_performance_counters`
    pub counter_name: String,
    /// `gauge`, `rate` or `histogram`; inferred from the counter when absent
    #[serde(default, rename = "type")]
    pub metric_type: Option<String>,
    /// Counter instance to read, or `ALL` for every instance
    #[serde(default)]
    pub instance_name: Option<String>,
    /// Tag key for the instance name of `ALL` metrics
    #[serde(default)]
    pub tag_by: Option<String>,
}

/// One monitored SQL Server
#[derive(Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_database")]
    pub database: String,
    /// Tags attached to every metric of this instance
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub trust_server_certificate: bool,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

impl InstanceConfig {
    pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: None,
            password: None,
            database: database.into(),
            tags: Vec::new(),
            trust_server_certificate: false,
        }
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Connection parameters for this instance
    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams::new(&self.host, &self.database)
            .with_credentials(self.username.as_deref(), self.password.as_deref())
            .with_trust_cert(self.trust_server_certificate)
    }
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_DATABASE)
    }
}

impl std::fmt::Debug for InstanceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("database", &self.database)
            .field("tags", &self.tags)
            .field("trust_server_certificate", &self.trust_server_certificate)
            .finish()
    }
}
