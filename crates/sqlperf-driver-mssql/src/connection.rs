//! MS SQL Server connection implementation using tiberius

use crate::driver::Login;
use async_trait::async_trait;
use sqlperf_core::{Connection, ConnectionParams, QueryResult, Result, SqlPerfError, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, Row as TiberiusRow};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

/// MS SQL Server connection errors
#[derive(Debug, thiserror::Error)]
pub enum MssqlConnectionError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Tiberius error: {0}")]
    Tiberius(#[from] tiberius::error::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MssqlConnectionError> for SqlPerfError {
    fn from(err: MssqlConnectionError) -> Self {
        match err {
            MssqlConnectionError::ConnectionFailed(msg) => SqlPerfError::Connection(msg),
            MssqlConnectionError::AuthenticationFailed(msg) => SqlPerfError::Authentication(msg),
            MssqlConnectionError::QueryFailed(msg) => SqlPerfError::Query(msg),
            MssqlConnectionError::TypeConversion(msg) => SqlPerfError::Driver(msg),
            MssqlConnectionError::ConnectionClosed => SqlPerfError::Closed,
            MssqlConnectionError::Tiberius(e) => classify_tiberius_error(e),
            MssqlConnectionError::Io(e) => SqlPerfError::Io(e),
        }
    }
}

/// Map a tiberius error onto the core error kinds.
///
/// Transport failures and a desynchronized protocol stream become
/// `Connection` so the registry drops the handle; server-side errors (bad
/// counter name, permission denied) stay `Query`.
pub(crate) fn classify_tiberius_error(err: tiberius::error::Error) -> SqlPerfError {
    use tiberius::error::Error;

    match err {
        Error::Io { .. } | Error::Tls(_) | Error::Routing { .. } | Error::Protocol(_) => {
            SqlPerfError::Connection(err.to_string())
        }
        Error::Server(token) => SqlPerfError::Query(token.to_string()),
        other => SqlPerfError::Driver(other.to_string()),
    }
}

/// MS SQL Server connection using tiberius
pub struct MssqlConnection {
    client: Mutex<Client<Compat<TcpStream>>>,
    closed: AtomicBool,
    database: String,
}

impl MssqlConnection {
    /// Open a new MS SQL Server connection.
    ///
    /// SQL Server authentication is used when a username or password is
    /// given, integrated security otherwise.
    #[tracing::instrument(skip(params), fields(host = %params.host, database = %params.database))]
    pub async fn connect(
        params: &ConnectionParams,
    ) -> std::result::Result<Self, MssqlConnectionError> {
        let (server, port) = params.server_address();
        tracing::debug!(server = %server, port, "connecting to MS SQL Server");

        let mut config = Config::new();
        config.host(&server);
        config.port(port);
        config.database(&params.database);
        config.application_name("sqlperf");

        if params.trust_cert {
            config.trust_cert();
        }

        config.encryption(EncryptionLevel::Required);
        config.authentication(auth_method(params)?);

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| MssqlConnectionError::ConnectionFailed(e.to_string()))?;

        tcp.set_nodelay(true)?;
        let compat_stream = tcp.compat_write();

        let client = Client::connect(config, compat_stream)
            .await
            .map_err(|e| MssqlConnectionError::ConnectionFailed(e.to_string()))?;

        tracing::debug!("successfully connected to MS SQL Server");

        Ok(Self {
            client: Mutex::new(client),
            closed: AtomicBool::new(false),
            database: params.database.clone(),
        })
    }

    /// Database this connection was opened against
    pub fn database(&self) -> &str {
        &self.database
    }

    fn ensure_not_closed(&self) -> std::result::Result<(), MssqlConnectionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(MssqlConnectionError::ConnectionClosed);
        }
        Ok(())
    }
}

fn auth_method(params: &ConnectionParams) -> std::result::Result<AuthMethod, MssqlConnectionError> {
    match Login::from_params(params) {
        Login::SqlServer { user, password } => Ok(AuthMethod::sql_server(
            user.unwrap_or_default(),
            password.unwrap_or_default(),
        )),
        #[cfg(all(windows, feature = "winauth"))]
        Login::Integrated => Ok(AuthMethod::Integrated),
        #[cfg(not(all(windows, feature = "winauth")))]
        Login::Integrated => Err(MssqlConnectionError::AuthenticationFailed(
            "integrated security is only supported on Windows builds with the `winauth` feature"
                .to_string(),
        )),
    }
}

#[async_trait]
impl Connection for MssqlConnection {
    fn driver_name(&self) -> &str {
        "mssql"
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.ensure_not_closed()?;
        let start = std::time::Instant::now();

        let mut client = self.client.lock().await;

        let tiberius_params = values_to_tiberius_params(params);
        let param_refs: Vec<&dyn tiberius::ToSql> = tiberius_params
            .iter()
            .map(|p| p as &dyn tiberius::ToSql)
            .collect();

        let stream = match client.query(sql, &param_refs[..]).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, "query failed");
                return Err(classify_tiberius_error(e));
            }
        };

        let tib_rows = stream
            .into_first_result()
            .await
            .map_err(classify_tiberius_error)?;

        let columns: Vec<String> = tib_rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let mut rows = Vec::with_capacity(tib_rows.len());
        for tib_row in tib_rows {
            rows.push(tiberius_row_to_values(tib_row)?);
        }

        let mut result = QueryResult::from_rows(columns, rows);
        result.execution_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            row_count = result.row_count(),
            duration_ms = result.execution_time_ms,
            "query completed"
        );

        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        tracing::debug!("MS SQL Server connection closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Convert a tiberius row to a vector of Values by consuming the row
fn tiberius_row_to_values(row: TiberiusRow) -> Result<Vec<Value>> {
    row.into_iter().map(column_data_to_value).collect()
}

/// Convert tiberius ColumnData to a sqlperf Value.
///
/// The counter view only returns `nchar` and integer columns; anything else
/// is a conversion error.
pub(crate) fn column_data_to_value(col_data: ColumnData<'static>) -> Result<Value> {
    let value = match col_data {
        ColumnData::U8(v) => v.map(|v| Value::Int16(v as i16)),
        ColumnData::I16(v) => v.map(Value::Int16),
        ColumnData::I32(v) => v.map(Value::Int32),
        ColumnData::I64(v) => v.map(Value::Int64),
        ColumnData::F32(v) => v.map(Value::Float32),
        ColumnData::F64(v) => v.map(Value::Float64),
        ColumnData::String(v) => v.map(|s| Value::String(s.into_owned())),
        ColumnData::Numeric(v) => v.map(|n| Value::Decimal(n.to_string())),
        other => {
            return Err(MssqlConnectionError::TypeConversion(format!(
                "unsupported column type: {other:?}"
            ))
            .into());
        }
    };

    Ok(value.unwrap_or(Value::Null))
}

/// Container for tiberius parameter values
#[derive(Debug)]
pub(crate) enum TiberiusParam {
    Null,
    I16(i16),
    I32(i32),
    I64(i64),
    String(String),
}

impl tiberius::ToSql for TiberiusParam {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            TiberiusParam::Null => ColumnData::I32(None),
            TiberiusParam::I16(v) => ColumnData::I16(Some(*v)),
            TiberiusParam::I32(v) => ColumnData::I32(Some(*v)),
            TiberiusParam::I64(v) => ColumnData::I64(Some(*v)),
            TiberiusParam::String(v) => {
                ColumnData::String(Some(std::borrow::Cow::Borrowed(v.as_str())))
            }
        }
    }
}

/// Convert sqlperf Values to tiberius parameters
pub(crate) fn values_to_tiberius_params(values: &[Value]) -> Vec<TiberiusParam> {
    values
        .iter()
        .map(|v| match v {
            Value::Null => TiberiusParam::Null,
            Value::Int16(i) => TiberiusParam::I16(*i),
            Value::Int32(i) => TiberiusParam::I32(*i),
            Value::Int64(i) => TiberiusParam::I64(*i),
            Value::Float32(_) | Value::Float64(_) | Value::Decimal(_) => {
                TiberiusParam::String(v.to_string())
            }
            Value::String(s) => TiberiusParam::String(s.clone()),
        })
        .collect()
}

impl std::fmt::Debug for MssqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlConnection")
            .field("database", &self.database)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}
