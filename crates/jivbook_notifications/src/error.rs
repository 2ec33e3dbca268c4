use jivbook_common::error::{external_service_error, internal_error};
use jivbook_common::JivbookError;
use jivbook_db::DbError;
use thiserror::Error;

/// Errors of the notification service.
///
/// Expected business outcomes (no devices, no matching users, every token
/// failing) are not errors; they come back as unsuccessful reports.
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The push provider refused the call as a whole.
    #[error("Push delivery failed: {0}")]
    Delivery(String),

    #[error("{0}")]
    Internal(String),
}

impl From<JivbookError> for NotificationError {
    fn from(err: JivbookError) -> Self {
        match err {
            JivbookError::ValidationError(message) => NotificationError::Validation(message),
            JivbookError::NotFoundError(message) => NotificationError::NotFound(message),
            other => NotificationError::Internal(other.to_string()),
        }
    }
}

impl From<NotificationError> for JivbookError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::Database(db) => db.into(),
            NotificationError::Validation(message) => JivbookError::ValidationError(message),
            NotificationError::NotFound(message) => JivbookError::NotFoundError(message),
            NotificationError::Delivery(message) => external_service_error("fcm", message),
            NotificationError::Internal(message) => internal_error(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jivbook_common::error::validation_error;
    use jivbook_common::HttpStatusCode;

    #[test]
    fn test_status_codes_survive_conversion() {
        let validation: NotificationError = validation_error("Title is required").into();
        assert!(matches!(
            validation,
            NotificationError::Validation(ref m) if m == "Title is required"
        ));
        assert_eq!(JivbookError::from(validation).status_code(), 400);

        let missing = NotificationError::NotFound("Notification not found".into());
        assert_eq!(JivbookError::from(missing).status_code(), 404);

        let delivery = NotificationError::Delivery("quota exceeded".into());
        assert_eq!(JivbookError::from(delivery).status_code(), 502);

        let db = NotificationError::Database(DbError::QueryError("locked".into()));
        assert_eq!(JivbookError::from(db).status_code(), 500);
    }
}
