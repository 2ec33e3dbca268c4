//! Firebase Cloud Messaging client module
//!
//! Talks to the FCM HTTP v1 API (one message per request) and to the Instance ID
//! batch API for topic membership. Both base URLs are configurable so the
//! client can be pointed at an emulator or a mock server.

use std::time::Duration;

use jivbook_common::services::{TopicManagementError, TopicManagementResult};
use jivbook_config::FirebaseConfig;
use reqwest::{header, Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::AccessTokenProvider;
use crate::models::{
    FcmMessage, FcmResponse, GoogleErrorResponse, TopicBatchRequest, TopicBatchResponse,
};

pub const DEFAULT_FCM_BASE_URL: &str = "https://fcm.googleapis.com";
pub const DEFAULT_IID_BASE_URL: &str = "https://iid.googleapis.com";

/// Instance ID accepts at most this many tokens per batch call.
const TOPIC_BATCH_LIMIT: usize = 1000;

/// Errors that can occur when interacting with the Firebase APIs
#[derive(Error, Debug)]
pub enum FirebaseError {
    /// Error during authentication with Firebase
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Error during HTTP request to Firebase API
    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Missing required configuration
    #[error("Missing configuration: {0}")]
    ConfigError(String),

    /// Error returned by the Firebase API that could not be parsed
    #[error("Firebase API error: {0}")]
    ApiError(String),

    /// Structured error returned by FCM for one message
    #[error("FCM rejected the message ({status} {code}): {message}")]
    Fcm {
        status: u16,
        /// `errorCode` of the FCM detail when present, otherwise the canonical status
        code: String,
        message: String,
    },

    /// More tokens than one multicast may carry
    #[error("Too many device tokens in one call: {0} (maximum 500)")]
    BatchTooLarge(usize),

    #[error("Invalid topic name: {0}")]
    InvalidTopic(String),
}

impl FirebaseError {
    /// Whether the error means the target token will never work again.
    ///
    /// FCM reports unknown tokens as `UNREGISTERED` and malformed ones as an
    /// `INVALID_ARGUMENT` that names the registration token.
    pub fn is_invalid_token(&self) -> bool {
        match self {
            FirebaseError::Fcm { code, message, .. } => {
                code == "UNREGISTERED"
                    || (code == "INVALID_ARGUMENT"
                        && message.to_lowercase().contains("registration token"))
            }
            _ => false,
        }
    }

    /// Short machine-readable code for per-token reports.
    pub fn code(&self) -> &str {
        match self {
            FirebaseError::Fcm { code, .. } => code,
            FirebaseError::AuthError(_) => "AUTH_ERROR",
            FirebaseError::RequestError(_) => "REQUEST_FAILED",
            FirebaseError::ConfigError(_) => "CONFIG_ERROR",
            FirebaseError::ApiError(_) => "API_ERROR",
            FirebaseError::BatchTooLarge(_) => "BATCH_TOO_LARGE",
            FirebaseError::InvalidTopic(_) => "INVALID_TOPIC",
        }
    }
}

/// Accepts `news` as well as `/topics/news`; FCM allows `[a-zA-Z0-9-_.~%]+`.
pub fn normalize_topic(topic: &str) -> Result<&str, FirebaseError> {
    let name = topic.strip_prefix("/topics/").unwrap_or(topic);
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '%'));
    if valid {
        Ok(name)
    } else {
        Err(FirebaseError::InvalidTopic(topic.to_string()))
    }
}

/// Client for interacting with the Firebase Cloud Messaging API
#[derive(Debug)]
pub struct FirebaseClient {
    /// HTTP client for making requests to the FCM API
    client: Client,
    project_id: String,
    fcm_base_url: String,
    iid_base_url: String,
    tokens: AccessTokenProvider,
}

impl FirebaseClient {
    /// Creates a new Firebase client with the given configuration
    ///
    /// # Errors
    ///
    /// Fails when the project id or the credentials are missing, or the HTTP
    /// client cannot be built.
    pub fn new(config: &FirebaseConfig) -> Result<Self, FirebaseError> {
        let tokens = AccessTokenProvider::from_config(config)?;
        Self::with_token_provider(config, tokens)
    }

    pub fn with_token_provider(
        config: &FirebaseConfig,
        tokens: AccessTokenProvider,
    ) -> Result<Self, FirebaseError> {
        if config.project_id.trim().is_empty() {
            return Err(FirebaseError::ConfigError(
                "Missing project_id in FirebaseConfig".to_string(),
            ));
        }

        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            project_id: config.project_id.clone(),
            fcm_base_url: trim_base(config.fcm_base_url.as_deref(), DEFAULT_FCM_BASE_URL),
            iid_base_url: trim_base(config.iid_base_url.as_deref(), DEFAULT_IID_BASE_URL),
            tokens,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// A bearer token for the next request(s).
    pub async fn access_token(&self) -> Result<String, FirebaseError> {
        self.tokens.token().await
    }

    /// Sends one message, fetching an access token first
    ///
    /// # Returns
    ///
    /// The provider message name, `projects/{project_id}/messages/{message_id}`
    pub async fn send_message(&self, message: &FcmMessage) -> Result<String, FirebaseError> {
        let access_token = self.access_token().await?;
        self.send_message_with_token(&access_token, message).await
    }

    /// Sends one message with an already obtained access token
    pub async fn send_message_with_token(
        &self,
        access_token: &str,
        message: &FcmMessage,
    ) -> Result<String, FirebaseError> {
        let url = format!(
            "{}/v1/projects/{}/messages:send",
            self.fcm_base_url, self.project_id
        );

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(fcm_error(status, &error_text));
        }

        let fcm_response: FcmResponse = response.json().await?;
        Ok(fcm_response.name)
    }

    /// Subscribes `tokens` to `topic` through the Instance ID API
    pub async fn subscribe_to_topic(
        &self,
        tokens: &[String],
        topic: &str,
    ) -> Result<TopicManagementResult, FirebaseError> {
        self.manage_topic("batchAdd", tokens, topic).await
    }

    /// Removes `tokens` from `topic` through the Instance ID API
    pub async fn unsubscribe_from_topic(
        &self,
        tokens: &[String],
        topic: &str,
    ) -> Result<TopicManagementResult, FirebaseError> {
        self.manage_topic("batchRemove", tokens, topic).await
    }

    async fn manage_topic(
        &self,
        operation: &str,
        tokens: &[String],
        topic: &str,
    ) -> Result<TopicManagementResult, FirebaseError> {
        let topic = normalize_topic(topic)?;
        let mut result = TopicManagementResult::default();
        if tokens.is_empty() {
            return Ok(result);
        }

        let access_token = self.access_token().await?;
        let url = format!("{}/iid/v1:{}", self.iid_base_url, operation);
        debug!(
            "Topic {} for '{}' with {} token(s)",
            operation,
            topic,
            tokens.len()
        );

        for (chunk_index, chunk) in tokens.chunks(TOPIC_BATCH_LIMIT).enumerate() {
            let body = TopicBatchRequest {
                to: format!("/topics/{}", topic),
                registration_tokens: chunk,
            };

            let response = self
                .client
                .post(&url)
                .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
                .header("access_token_auth", "true")
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let error_text = response.text().await?;
                return Err(fcm_error(status, &error_text));
            }

            let batch: TopicBatchResponse = response.json().await?;
            let offset = chunk_index * TOPIC_BATCH_LIMIT;
            for (index, item) in batch.results.into_iter().enumerate() {
                match item.error {
                    Some(reason) => {
                        result.failure_count += 1;
                        result.errors.push(TopicManagementError {
                            index: offset + index,
                            reason,
                        });
                    }
                    None => result.success_count += 1,
                }
            }
        }

        if result.failure_count > 0 {
            warn!(
                "Topic {} for '{}': {} of {} token(s) failed",
                operation,
                topic,
                result.failure_count,
                tokens.len()
            );
        }
        Ok(result)
    }
}

fn trim_base(configured: Option<&str>, default: &str) -> String {
    configured
        .filter(|url| !url.is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

/// Turns a non-2xx response into a structured error.
fn fcm_error(status: StatusCode, body: &str) -> FirebaseError {
    match serde_json::from_str::<GoogleErrorResponse>(body) {
        Ok(parsed) => {
            let error = parsed.error;
            let code = error
                .details
                .iter()
                .find_map(|detail| detail.error_code.clone())
                .unwrap_or(error.status);
            FirebaseError::Fcm {
                status: status.as_u16(),
                code,
                message: error.message,
            }
        }
        Err(_) => FirebaseError::ApiError(format!("{}: {}", status, body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_detail_is_invalid_token() {
        let body = r#"{
            "error": {
                "code": 404,
                "message": "Requested entity was not found.",
                "status": "NOT_FOUND",
                "details": [{
                    "@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError",
                    "errorCode": "UNREGISTERED"
                }]
            }
        }"#;
        let error = fcm_error(StatusCode::NOT_FOUND, body);
        assert_eq!(error.code(), "UNREGISTERED");
        assert!(error.is_invalid_token());
    }

    #[test]
    fn test_invalid_registration_token_argument_is_invalid_token() {
        let body = r#"{"error": {"code": 400, "status": "INVALID_ARGUMENT",
            "message": "The registration token is not a valid FCM registration token"}}"#;
        assert!(fcm_error(StatusCode::BAD_REQUEST, body).is_invalid_token());
    }

    #[test]
    fn test_other_failures_are_transient() {
        let bad_payload = r#"{"error": {"code": 400, "status": "INVALID_ARGUMENT",
            "message": "Invalid value at 'message.data[0].value'"}}"#;
        assert!(!fcm_error(StatusCode::BAD_REQUEST, bad_payload).is_invalid_token());

        let unavailable = r#"{"error": {"code": 503, "status": "UNAVAILABLE", "message": "try later"}}"#;
        assert!(!fcm_error(StatusCode::SERVICE_UNAVAILABLE, unavailable).is_invalid_token());

        let garbage = fcm_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(matches!(garbage, FirebaseError::ApiError(_)));
        assert!(!garbage.is_invalid_token());
    }

    #[test]
    fn test_topic_names() {
        assert_eq!(normalize_topic("pet-news").unwrap(), "pet-news");
        assert_eq!(normalize_topic("/topics/pet_news.v2").unwrap(), "pet_news.v2");
        assert!(normalize_topic("").is_err());
        assert!(normalize_topic("pet news").is_err());
    }

    #[test]
    fn test_missing_project_id() {
        let config = FirebaseConfig {
            project_id: " ".to_string(),
            key_path: None,
            fcm_base_url: None,
            iid_base_url: None,
            access_token: Some("t".to_string()),
            send_concurrency: 1,
            web_icon: String::new(),
            request_timeout_secs: None,
        };
        assert!(matches!(
            FirebaseClient::new(&config),
            Err(FirebaseError::ConfigError(_))
        ));
    }
}
