//! Wire types of the FCM HTTP v1 and Instance ID APIs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request body of `projects/{id}/messages:send`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FcmMessage {
    pub message: Message,
}

/// One FCM v1 message. Exactly one of `token` and `topic` is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    /// FCM only accepts string values here.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<ApnsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webpush: Option<WebpushConfig>,
}

/// Cross-platform notification shown by the OS.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Android transport priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AndroidMessagePriority {
    Normal,
    High,
}

/// Priority of the notification shown in the Android tray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AndroidNotificationPriority {
    PriorityLow,
    PriorityDefault,
    PriorityHigh,
    PriorityMax,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AndroidConfig {
    pub priority: AndroidMessagePriority,
    pub notification: AndroidNotification,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AndroidNotification {
    pub channel_id: String,
    pub notification_priority: AndroidNotificationPriority,
    pub sound: String,
    pub default_vibrate_timings: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApnsConfig {
    pub payload: ApnsPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm_options: Option<ApnsFcmOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApnsPayload {
    pub aps: Aps,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aps {
    pub alert: ApsAlert,
    pub sound: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApsAlert {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApnsFcmOptions {
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebpushConfig {
    pub notification: WebpushNotification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm_options: Option<WebpushFcmOptions>,
}

/// Mirrors the browser Notification API, hence the camelCase keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebpushNotification {
    pub title: String,
    pub body: String,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub require_interaction: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<WebpushAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebpushAction {
    pub action: String,
    pub title: String,
}

/// FCM only accepts absolute HTTPS links here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebpushFcmOptions {
    pub link: String,
}

/// Successful response of `messages:send`.
#[derive(Debug, Deserialize)]
pub struct FcmResponse {
    /// `projects/{project_id}/messages/{message_id}`
    pub name: String,
}

/// Error envelope shared by the Google APIs.
#[derive(Debug, Deserialize)]
pub struct GoogleErrorResponse {
    pub error: GoogleError,
}

#[derive(Debug, Deserialize)]
pub struct GoogleError {
    #[serde(default)]
    pub message: String,
    /// Canonical status, e.g. `NOT_FOUND` or `INVALID_ARGUMENT`.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub details: Vec<GoogleErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleErrorDetail {
    #[serde(rename = "@type", default)]
    pub type_url: String,
    /// FCM specific code, e.g. `UNREGISTERED`.
    #[serde(default)]
    pub error_code: Option<String>,
}

/// Request body of the Instance ID `batchAdd` / `batchRemove` calls.
#[derive(Debug, Serialize)]
pub struct TopicBatchRequest<'a> {
    pub to: String,
    pub registration_tokens: &'a [String],
}

#[derive(Debug, Deserialize)]
pub struct TopicBatchResponse {
    #[serde(default)]
    pub results: Vec<TopicBatchItem>,
}

/// `{}` on success, `{"error": "NOT_FOUND"}` otherwise.
#[derive(Debug, Deserialize)]
pub struct TopicBatchItem {
    #[serde(default)]
    pub error: Option<String>,
}
