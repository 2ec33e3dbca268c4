use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::{HttpStatusCode, JivbookError};

/// Renders the error with the same envelope the handlers use for successes,
/// plus the numeric code for clients that branch on it.
///
/// Clients see the bare message. The prefixed `Display` form is for logs.
impl IntoResponse for JivbookError {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = self.message();
        let body = Json(json!({
            "success": false,
            "message": message,
            "error": {
                "message": message,
                "code": status_code.as_u16(),
            }
        }));

        (status_code, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{not_found, validation_error};
    use serde_json::Value;

    async fn body_of(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_response_status() {
        let response = not_found("Notification not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_error_body_carries_plain_message() {
        let response = JivbookError::ForbiddenError("Access denied".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_of(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Access denied");
        assert_eq!(body["error"]["message"], "Access denied");
        assert_eq!(body["error"]["code"], 403);

        let body = body_of(validation_error("Title is required").into_response()).await;
        assert_eq!(body["message"], "Title is required");
    }
}
