//! Domain models shared by the registry, the record store, the delivery adapter
//! and the HTTP layer.
//!
//! The string forms of [`Platform`], [`NotificationType`], [`NotificationCategory`],
//! [`NotificationPriority`] and [`NotificationStatus`] are stored in the database
//! and read by the mobile and web clients. They must not change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{validation_error, JivbookError};

/// Maximum title length accepted for a notification.
pub const MAX_TITLE_LEN: usize = 100;
/// Maximum body length accepted for a notification.
pub const MAX_BODY_LEN: usize = 500;

/// Returned when a stored or submitted enum value is not one of the known variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

fn parse_error(kind: &'static str, value: &str) -> ParseEnumError {
    ParseEnumError {
        kind,
        value: value.to_string(),
    }
}

/// Client platform a device token was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Platform {
    Android,
    Ios,
    Web,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Web => "web",
        }
    }
}

impl FromStr for Platform {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            "web" => Ok(Platform::Web),
            other => Err(parse_error("platform", other)),
        }
    }
}

/// Business category of a notification. Drives channel routing on the clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum NotificationType {
    System,
    PetInquiry,
    Chat,
    Follow,
    Post,
    Promotion,
    Admin,
    Custom,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::System => "system",
            NotificationType::PetInquiry => "pet_inquiry",
            NotificationType::Chat => "chat",
            NotificationType::Follow => "follow",
            NotificationType::Post => "post",
            NotificationType::Promotion => "promotion",
            NotificationType::Admin => "admin",
            NotificationType::Custom => "custom",
        }
    }
}

impl FromStr for NotificationType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(NotificationType::System),
            "pet_inquiry" => Ok(NotificationType::PetInquiry),
            "chat" => Ok(NotificationType::Chat),
            "follow" => Ok(NotificationType::Follow),
            "post" => Ok(NotificationType::Post),
            "promotion" => Ok(NotificationType::Promotion),
            "admin" => Ok(NotificationType::Admin),
            "custom" => Ok(NotificationType::Custom),
            other => Err(parse_error("notification type", other)),
        }
    }
}

/// Severity-like presentation hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum NotificationCategory {
    #[default]
    Info,
    Warning,
    Success,
    Error,
    Promotional,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Info => "info",
            NotificationCategory::Warning => "warning",
            NotificationCategory::Success => "success",
            NotificationCategory::Error => "error",
            NotificationCategory::Promotional => "promotional",
        }
    }
}

impl FromStr for NotificationCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(NotificationCategory::Info),
            "warning" => Ok(NotificationCategory::Warning),
            "success" => Ok(NotificationCategory::Success),
            "error" => Ok(NotificationCategory::Error),
            "promotional" => Ok(NotificationCategory::Promotional),
            other => Err(parse_error("notification category", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum NotificationPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl NotificationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Normal => "normal",
            NotificationPriority::High => "high",
            NotificationPriority::Critical => "critical",
        }
    }

    /// High and critical notifications ask the client to keep them on screen.
    pub fn is_urgent(&self) -> bool {
        matches!(
            self,
            NotificationPriority::High | NotificationPriority::Critical
        )
    }
}

impl FromStr for NotificationPriority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(NotificationPriority::Low),
            "normal" => Ok(NotificationPriority::Normal),
            "high" => Ok(NotificationPriority::High),
            "critical" => Ok(NotificationPriority::Critical),
            other => Err(parse_error("notification priority", other)),
        }
    }
}

/// Delivery lifecycle state.
///
/// `draft → sending → sent | failed`, or `draft → scheduled → (replayed) | cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum NotificationStatus {
    #[default]
    Draft,
    Scheduled,
    Sending,
    Sent,
    Failed,
    Cancelled,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Draft => "draft",
            NotificationStatus::Scheduled => "scheduled",
            NotificationStatus::Sending => "sending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
            NotificationStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for NotificationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(NotificationStatus::Draft),
            "scheduled" => Ok(NotificationStatus::Scheduled),
            "sending" => Ok(NotificationStatus::Sending),
            "sent" => Ok(NotificationStatus::Sent),
            "failed" => Ok(NotificationStatus::Failed),
            "cancelled" => Ok(NotificationStatus::Cancelled),
            other => Err(parse_error("notification status", other)),
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Device tokens ---

/// Free-form metadata reported by the client app at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeviceInfo {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
}

/// A push token issued to one app installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeviceToken {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub platform: Platform,
    pub device_id: String,
    pub device_info: DeviceInfo,
    pub is_active: bool,
    pub last_used: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input of a device registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistration {
    pub user_id: String,
    pub token: String,
    pub platform: Platform,
    pub device_id: String,
    #[serde(default)]
    pub device_info: DeviceInfo,
}

// --- Notifications ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AgeRange {
    #[serde(default)]
    pub min: Option<u32>,
    #[serde(default)]
    pub max: Option<u32>,
}

/// Audience selection of a broadcast. Empty lists mean "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TargetFilters {
    pub platform: Vec<Platform>,
    pub user_types: Vec<String>,
    pub locations: Vec<String>,
    pub pet_categories: Vec<String>,
    pub age_range: Option<AgeRange>,
}

impl TargetFilters {
    pub fn is_empty(&self) -> bool {
        self == &TargetFilters::default()
    }
}

/// Outcome counters of a delivery attempt.
///
/// `open_rate` and `click_rate` are part of the stored shape but nothing computes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeliveryStats {
    pub total_targeted: i64,
    pub successful_deliveries: i64,
    pub failed_deliveries: i64,
    pub open_rate: f64,
    pub click_rate: f64,
}

/// What a caller provides when sending or scheduling a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub category: NotificationCategory,
    #[serde(default)]
    pub priority: NotificationPriority,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub action_url: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl NotificationContent {
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        notification_type: NotificationType,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            image: None,
            notification_type,
            category: NotificationCategory::default(),
            priority: NotificationPriority::default(),
            data: Map::new(),
            action_url: None,
            expires_at: None,
        }
    }

    pub fn with_category(mut self, category: NotificationCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_action_url(mut self, action_url: impl Into<String>) -> Self {
        self.action_url = Some(action_url.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Checks the required fields and the stored length limits.
    ///
    /// Blank text counts as missing; the limits apply to the text as stored.
    pub fn validate(&self) -> Result<(), JivbookError> {
        if self.title.trim().is_empty() {
            return Err(validation_error("Title is required"));
        }
        if self.title.chars().count() > MAX_TITLE_LEN {
            return Err(validation_error(format!(
                "Title cannot exceed {} characters",
                MAX_TITLE_LEN
            )));
        }
        if self.body.trim().is_empty() {
            return Err(validation_error("Body is required"));
        }
        if self.body.chars().count() > MAX_BODY_LEN {
            return Err(validation_error(format!(
                "Body cannot exceed {} characters",
                MAX_BODY_LEN
            )));
        }
        Ok(())
    }
}

/// One persisted notification attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub body: String,
    pub image: Option<String>,
    /// `None` for broadcasts and topic sends.
    pub recipient: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub category: NotificationCategory,
    pub priority: NotificationPriority,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub data: Map<String, Value>,
    pub action_url: Option<String>,
    pub target_filters: TargetFilters,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: NotificationStatus,
    pub delivery_stats: DeliveryStats,
    pub created_by: Option<String>,
    pub message_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    /// Builds a fresh, unsaved record with a new id.
    pub fn new(
        content: NotificationContent,
        recipient: Option<String>,
        created_by: Option<String>,
        status: NotificationStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: content.title,
            body: content.body,
            image: content.image,
            recipient,
            notification_type: content.notification_type,
            category: content.category,
            priority: content.priority,
            data: content.data,
            action_url: content.action_url,
            target_filters: TargetFilters::default(),
            scheduled_for: None,
            expires_at: content.expires_at,
            status,
            delivery_stats: DeliveryStats::default(),
            created_by,
            message_id: None,
            is_read: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// The caller-facing part of the record, used to replay scheduled notifications.
    pub fn content(&self) -> NotificationContent {
        NotificationContent {
            title: self.title.clone(),
            body: self.body.clone(),
            image: self.image.clone(),
            notification_type: self.notification_type,
            category: self.category,
            priority: self.priority,
            data: self.data.clone(),
            action_url: self.action_url.clone(),
            expires_at: self.expires_at,
        }
    }
}

// --- Read models ---

/// Page metadata as the mobile and web clients read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Pagination {
    #[serde(rename = "currentPage")]
    pub page: u32,
    #[serde(rename = "itemsPerPage")]
    pub limit: u32,
    #[serde(rename = "totalItems")]
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let pages = if limit == 0 {
            0
        } else {
            (total + i64::from(limit) - 1) / i64::from(limit)
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

/// Counts and delivery totals for one (type, status) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TypeStatusStats {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub status: NotificationStatus,
    pub count: i64,
    pub total_targeted: i64,
    pub successful_deliveries: i64,
    pub failed_deliveries: i64,
}

/// Volume of one calendar day (UTC), formatted `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DailyStats {
    pub date: String,
    pub count: i64,
    pub successful_deliveries: i64,
}

// --- Preferences ---

/// A user's notification preferences. Fields missing from stored or submitted
/// JSON take their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NotificationSettings {
    pub enable_push_notifications: bool,
    pub enable_email_notifications: bool,
    #[serde(rename = "enableSMSNotifications")]
    pub enable_sms_notifications: bool,
    pub notification_types: NotificationTypeToggles,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enable_push_notifications: true,
            enable_email_notifications: true,
            enable_sms_notifications: false,
            notification_types: NotificationTypeToggles::default(),
        }
    }
}

/// Per-type opt-ins. Everything is on except promotions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NotificationTypeToggles {
    pub chat: bool,
    pub pet_inquiry: bool,
    pub follow: bool,
    pub post: bool,
    pub system: bool,
    pub promotion: bool,
}

impl Default for NotificationTypeToggles {
    fn default() -> Self {
        Self {
            chat: true,
            pet_inquiry: true,
            follow: true,
            post: true,
            system: true,
            promotion: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enum_wire_names_are_stable() {
        assert_eq!(
            serde_json::to_value(NotificationType::PetInquiry).unwrap(),
            json!("pet_inquiry")
        );
        assert_eq!(
            serde_json::to_value(NotificationStatus::Cancelled).unwrap(),
            json!("cancelled")
        );
        assert_eq!(serde_json::to_value(Platform::Ios).unwrap(), json!("ios"));
        for status in [
            NotificationStatus::Draft,
            NotificationStatus::Scheduled,
            NotificationStatus::Sending,
            NotificationStatus::Sent,
            NotificationStatus::Failed,
            NotificationStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<NotificationStatus>(), Ok(status));
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                json!(status.as_str())
            );
        }
        assert!("archived".parse::<NotificationStatus>().is_err());
    }

    #[test]
    fn test_content_defaults_when_deserializing() {
        let content: NotificationContent = serde_json::from_value(json!({
            "title": "Hello",
            "body": "World",
            "type": "custom"
        }))
        .unwrap();

        assert_eq!(content.category, NotificationCategory::Info);
        assert_eq!(content.priority, NotificationPriority::Normal);
        assert!(content.data.is_empty());
        assert!(content.action_url.is_none());
    }

    #[test]
    fn test_unknown_payload_keys_survive_round_trip() {
        let content = NotificationContent::new("Hi", "There", NotificationType::Custom)
            .with_data("campaign", "spring")
            .with_data("nested", json!({"a": [1, 2, 3], "future_key": true}));
        let notification =
            Notification::new(content, Some("u1".into()), None, NotificationStatus::Draft);

        let json = serde_json::to_string(&notification).unwrap();
        let restored: Notification = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.data, notification.data);
        assert_eq!(restored.data["nested"]["future_key"], json!(true));
    }

    #[test]
    fn test_validate_limits() {
        let ok = NotificationContent::new("Title", "Body", NotificationType::System);
        assert!(ok.validate().is_ok());

        let long_title =
            NotificationContent::new("t".repeat(101), "Body", NotificationType::System);
        assert!(long_title.validate().is_err());

        let long_body =
            NotificationContent::new("Title", "b".repeat(501), NotificationType::System);
        assert!(long_body.validate().is_err());

        let empty = NotificationContent::new("  ", "Body", NotificationType::System);
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_validate_counts_surrounding_whitespace() {
        let padded_title = format!("{}   ", "t".repeat(100));
        let err = NotificationContent::new(padded_title, "Body", NotificationType::System)
            .validate()
            .unwrap_err();
        assert_eq!(err.message(), "Title cannot exceed 100 characters");

        let padded_body = format!(" {}", "b".repeat(500));
        let err = NotificationContent::new("Title", padded_body, NotificationType::System)
            .validate()
            .unwrap_err();
        assert_eq!(err.message(), "Body cannot exceed 500 characters");

        let exact =
            NotificationContent::new("t".repeat(100), "b".repeat(500), NotificationType::System);
        assert!(exact.validate().is_ok());
    }

    #[test]
    fn test_settings_wire_shape_and_defaults() {
        let defaults = serde_json::to_value(NotificationSettings::default()).unwrap();
        assert_eq!(
            defaults,
            json!({
                "enablePushNotifications": true,
                "enableEmailNotifications": true,
                "enableSMSNotifications": false,
                "notificationTypes": {
                    "chat": true,
                    "petInquiry": true,
                    "follow": true,
                    "post": true,
                    "system": true,
                    "promotion": false
                }
            })
        );

        let partial: NotificationSettings = serde_json::from_value(json!({
            "enableSMSNotifications": true,
            "notificationTypes": {"promotion": true}
        }))
        .unwrap();
        assert!(partial.enable_push_notifications);
        assert!(partial.enable_sms_notifications);
        assert!(partial.notification_types.promotion);
        assert!(partial.notification_types.chat);
    }

    #[test]
    fn test_pagination_pages() {
        assert_eq!(Pagination::new(1, 20, 0).pages, 0);
        assert_eq!(Pagination::new(1, 20, 20).pages, 1);
        assert_eq!(Pagination::new(2, 20, 41).pages, 3);
        assert_eq!(
            serde_json::to_value(Pagination::new(2, 20, 41)).unwrap(),
            json!({"currentPage": 2, "itemsPerPage": 20, "totalItems": 41, "totalPages": 3})
        );
    }
}
