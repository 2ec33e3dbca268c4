use std::fmt;
use thiserror::Error;

/// The base error type for everything that reaches an HTTP caller.
///
/// Crates keep their own error enums and convert into `JivbookError` at the
/// handler boundary via `From` impls.
#[derive(Error, Debug)]
pub enum JivbookError {
    /// Error occurred while parsing data
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    /// Error occurred due to missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The caller identity is missing
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// The caller is known but not allowed to perform the operation
    #[error("Forbidden: {0}")]
    ForbiddenError(String),

    /// Error occurred during validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error occurred during database operation
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Error occurred during external service call
    #[error("External service error: {service_name} - {message}")]
    ExternalServiceError {
        service_name: String,
        message: String,
    },

    /// Error occurred due to a resource not being found
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Error occurred due to an internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl JivbookError {
    /// The message without the category prefix `Display` adds.
    pub fn message(&self) -> &str {
        match self {
            JivbookError::ParseError(message)
            | JivbookError::ConfigError(message)
            | JivbookError::AuthError(message)
            | JivbookError::ForbiddenError(message)
            | JivbookError::ValidationError(message)
            | JivbookError::DatabaseError(message)
            | JivbookError::NotFoundError(message)
            | JivbookError::InternalError(message) => message,
            JivbookError::ExternalServiceError { message, .. } => message,
        }
    }
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for JivbookError {
    fn status_code(&self) -> u16 {
        match self {
            JivbookError::ParseError(_) => 400,
            JivbookError::ConfigError(_) => 500,
            JivbookError::AuthError(_) => 401,
            JivbookError::ForbiddenError(_) => 403,
            JivbookError::ValidationError(_) => 400,
            JivbookError::DatabaseError(_) => 500,
            JivbookError::ExternalServiceError { .. } => 502,
            JivbookError::NotFoundError(_) => 404,
            JivbookError::InternalError(_) => 500,
        }
    }
}

impl From<serde_json::Error> for JivbookError {
    fn from(err: serde_json::Error) -> Self {
        JivbookError::ParseError(err.to_string())
    }
}

// Utility functions for error handling
pub fn validation_error<T: fmt::Display>(message: T) -> JivbookError {
    JivbookError::ValidationError(message.to_string())
}

pub fn not_found<T: fmt::Display>(message: T) -> JivbookError {
    JivbookError::NotFoundError(message.to_string())
}

pub fn external_service_error<T: fmt::Display>(service_name: &str, message: T) -> JivbookError {
    JivbookError::ExternalServiceError {
        service_name: service_name.to_string(),
        message: message.to_string(),
    }
}

pub fn internal_error<T: fmt::Display>(message: T) -> JivbookError {
    JivbookError::InternalError(message.to_string())
}
