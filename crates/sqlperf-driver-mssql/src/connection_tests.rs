//! Tests for MS SQL Server connection module

use crate::connection::{
    MssqlConnectionError, TiberiusParam, column_data_to_value, values_to_tiberius_params,
};
use sqlperf_core::{SqlPerfError, Value};
use std::borrow::Cow;
use tiberius::{ColumnData, ToSql};

// Value conversion tests

#[test]
fn test_counter_query_params() {
    let params = values_to_tiberius_params(&[
        Value::from("Lock Waits/sec"),
        Value::from("_Total"),
    ]);
    assert_eq!(params.len(), 2);
    assert!(matches!(&params[0], TiberiusParam::String(s) if s == "Lock Waits/sec"));
    assert!(matches!(&params[1], TiberiusParam::String(s) if s == "_Total"));
}

#[test]
fn test_value_to_tiberius_mixed_params() {
    let params = values_to_tiberius_params(&[
        Value::Null,
        Value::Int32(42),
        Value::Int64(65792),
        Value::Float64(0.5),
        Value::Decimal("1.5".to_string()),
    ]);
    assert_eq!(params.len(), 5);
    assert!(matches!(params[0], TiberiusParam::Null));
    assert!(matches!(params[1], TiberiusParam::I32(42)));
    assert!(matches!(params[2], TiberiusParam::I64(65792)));
    assert!(matches!(&params[3], TiberiusParam::String(s) if s == "0.5"));
    assert!(matches!(&params[4], TiberiusParam::String(s) if s == "1.5"));
}

#[test]
fn test_tiberius_param_to_sql() {
    assert!(matches!(TiberiusParam::Null.to_sql(), ColumnData::I32(None)));
    assert!(matches!(TiberiusParam::I64(7).to_sql(), ColumnData::I64(Some(7))));
    assert!(matches!(
        TiberiusParam::String("User connections".into()).to_sql(),
        ColumnData::String(Some(s)) if s == "User connections"
    ));
}

// Column data conversion tests

#[test]
fn test_column_data_to_value_bigint_counter() {
    let result = column_data_to_value(ColumnData::I64(Some(1_073_939_712))).unwrap();
    assert_eq!(result, Value::Int64(1_073_939_712));
}

#[test]
fn test_column_data_to_value_int_type_code() {
    let result = column_data_to_value(ColumnData::I32(Some(65792))).unwrap();
    assert_eq!(result, Value::Int32(65792));
}

#[test]
fn test_column_data_to_value_nulls() {
    assert_eq!(column_data_to_value(ColumnData::I64(None)).unwrap(), Value::Null);
    assert_eq!(column_data_to_value(ColumnData::String(None)).unwrap(), Value::Null);
    assert_eq!(column_data_to_value(ColumnData::I32(None)).unwrap(), Value::Null);
}

#[test]
fn test_column_data_to_value_padded_instance_name() {
    let result =
        column_data_to_value(ColumnData::String(Some(Cow::Owned("tempdb      ".into())))).unwrap();
    assert_eq!(result, Value::String("tempdb      ".to_string()));
}

#[test]
fn test_column_data_to_value_tinyint() {
    assert_eq!(column_data_to_value(ColumnData::U8(Some(9))).unwrap(), Value::Int16(9));
}

#[test]
fn test_column_data_to_value_rejects_unsupported_types() {
    let err = column_data_to_value(ColumnData::Bit(Some(true))).unwrap_err();
    assert!(matches!(err, SqlPerfError::Driver(ref msg) if msg.contains("unsupported column type")));
    assert!(!err.is_connection_error());
}

// Error conversion tests

#[test]
fn test_mssql_error_conversion() {
    let err: SqlPerfError = MssqlConnectionError::ConnectionClosed.into();
    assert!(matches!(err, SqlPerfError::Closed));

    let err: SqlPerfError = MssqlConnectionError::ConnectionFailed("refused".into()).into();
    assert!(err.is_connection_error());

    let err: SqlPerfError = MssqlConnectionError::QueryFailed("invalid object".into()).into();
    assert!(matches!(err, SqlPerfError::Query(_)));
    assert!(!err.is_connection_error());

    let err: SqlPerfError = MssqlConnectionError::AuthenticationFailed("login".into()).into();
    assert!(matches!(err, SqlPerfError::Authentication(_)));
}

#[test]
fn test_mssql_error_display() {
    let err = MssqlConnectionError::ConnectionFailed("test".to_string());
    assert!(err.to_string().contains("Connection failed"));

    let err = MssqlConnectionError::AuthenticationFailed("bad password".to_string());
    assert!(err.to_string().contains("Authentication failed"));

    let err = MssqlConnectionError::ConnectionClosed;
    assert!(err.to_string().contains("closed"));
}

#[test]
fn test_tiberius_io_error_is_connection_error() {
    let err = tiberius::error::Error::Io {
        kind: std::io::ErrorKind::ConnectionReset,
        message: "reset by peer".into(),
    };
    let err: SqlPerfError = MssqlConnectionError::Tiberius(err).into();
    assert!(err.is_connection_error());
}

#[test]
fn test_tiberius_protocol_error_is_connection_error() {
    let err = tiberius::error::Error::Protocol("unexpected token".into());
    let err: SqlPerfError = MssqlConnectionError::Tiberius(err).into();
    assert!(matches!(err, SqlPerfError::Connection(_)));
    assert!(err.is_connection_error());
}

#[test]
fn test_tiberius_conversion_error_is_not_a_connection_error() {
    let err = tiberius::error::Error::Conversion("bad value".into());
    let err: SqlPerfError = MssqlConnectionError::Tiberius(err).into();
    assert!(matches!(err, SqlPerfError::Driver(_)));
}
