//! Error types for the database client

use jivbook_common::models::ParseEnumError;
use jivbook_common::JivbookError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Database configuration error: {0}")]
    ConfigError(String),

    #[error("Database URL error: {0}")]
    UrlError(String),

    #[error("Database pool error: {0}")]
    PoolError(String),

    #[error("Database query error: {0}")]
    QueryError(String),

    /// A stored value could not be turned back into a domain value.
    #[error("Database decode error: {0}")]
    DecodeError(String),
}

impl From<ParseEnumError> for DbError {
    fn from(err: ParseEnumError) -> Self {
        DbError::DecodeError(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::DecodeError(err.to_string())
    }
}

impl From<DbError> for JivbookError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConfigError(message) => JivbookError::ConfigError(message),
            other => JivbookError::DatabaseError(other.to_string()),
        }
    }
}
