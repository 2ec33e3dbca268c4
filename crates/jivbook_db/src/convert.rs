//! Column encodings shared by the SQL repositories.
//!
//! The `Any` driver has no portable timestamp or JSON type, so timestamps are
//! stored as epoch milliseconds, structured values as JSON text and booleans as
//! integers.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::any::AnyRow;
use sqlx::{Any, Decode, Row, Type, ValueRef};

use crate::error::DbError;

pub(crate) fn to_millis(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| DbError::DecodeError(format!("timestamp out of range: {}", millis)))
}

pub(crate) fn opt_from_millis(millis: Option<i64>) -> Result<Option<DateTime<Utc>>, DbError> {
    millis.map(from_millis).transpose()
}

/// Reads a column that may hold NULL.
///
/// The `Any` driver tags NULL values with their own type, which no
/// `Option<T>` decoder accepts, so the NULL check happens on the raw value.
pub(crate) fn nullable<'r, T>(row: &'r AnyRow, column: &str) -> Result<Option<T>, DbError>
where
    T: Decode<'r, Any> + Type<Any>,
{
    if row.try_get_raw(column)?.is_null() {
        return Ok(None);
    }
    Ok(Some(row.try_get(column)?))
}

pub(crate) fn to_json_text<T: Serialize>(value: &T) -> Result<String, DbError> {
    serde_json::to_string(value).map_err(|e| DbError::QueryError(e.to_string()))
}

pub(crate) fn from_json_text<T: DeserializeOwned>(text: &str) -> Result<T, DbError> {
    Ok(serde_json::from_str(text)?)
}

pub(crate) fn flag(value: bool) -> i64 {
    i64::from(value)
}

/// `$start, $start+1, ...` for `count` bind parameters.
pub(crate) fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ")
}
