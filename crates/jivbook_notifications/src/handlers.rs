// HTTP handlers of the notification routes

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use jivbook_common::error::validation_error;
use jivbook_common::models::{
    DeviceInfo, DeviceRegistration, Notification, NotificationCategory, NotificationContent,
    NotificationPriority, NotificationSettings, NotificationStatus, NotificationType, Platform,
    TargetFilters,
};
use jivbook_common::services::TopicManagementResult;
use jivbook_common::JivbookError;
use jivbook_db::NotificationFilter;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::auth::{AdminUser, AuthenticatedUser};
use crate::events::NotificationEvent;
use crate::models::{
    Audience, NotificationAnalytics, NotificationListing, SendReport, UserNotifications,
};
use crate::scheduler::{JobStatus, NotificationScheduler};
use crate::service::NotificationService;

/// Shared state of the notification routes.
#[derive(Clone)]
pub struct NotificationState {
    pub service: Arc<NotificationService>,
    /// `None` when the background jobs are disabled.
    pub scheduler: Option<Arc<NotificationScheduler>>,
}

/// Envelope of every successful response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

fn done(message: &str) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        message: message.to_string(),
        data: None,
    })
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, JivbookError>;

// --- Request and response bodies ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RegisterDeviceRequest {
    pub token: Option<String>,
    pub platform: Option<Platform>,
    pub device_id: Option<String>,
    #[serde(default)]
    pub device_info: DeviceInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RegisteredDevice {
    /// Id of the registry record.
    pub device_id: String,
    pub token: String,
    pub platform: Platform,
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UnregisterDeviceRequest {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TopicRequest {
    pub topic: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct AllNotificationsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<NotificationStatus>,
    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct AnalyticsQuery {
    /// Trailing window in days, default 7.
    pub date_range: Option<i64>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdatedResponse {
    pub updated: u64,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TriggerResponse {
    pub triggered: bool,
}

/// Notification fields of the admin send requests. Title and body are required.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ContentFields {
    pub title: Option<String>,
    pub body: Option<String>,
    pub image: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,
    pub category: Option<NotificationCategory>,
    pub priority: Option<NotificationPriority>,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub data: Map<String, Value>,
    pub action_url: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ContentFields {
    fn into_content(
        self,
        default_type: NotificationType,
        missing: &str,
    ) -> Result<NotificationContent, JivbookError> {
        let (Some(title), Some(body)) = (self.title, self.body) else {
            return Err(validation_error(missing));
        };
        Ok(NotificationContent {
            title,
            body,
            image: self.image,
            notification_type: self.notification_type.unwrap_or(default_type),
            category: self.category.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            data: self.data,
            action_url: self.action_url,
            expires_at: self.expires_at,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SendToUserRequest {
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub content: ContentFields,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SendBroadcastRequest {
    #[serde(flatten)]
    pub content: ContentFields,
    #[serde(default)]
    pub target_filters: TargetFilters,
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SendToTopicRequest {
    pub topic: Option<String>,
    #[serde(flatten)]
    pub content: ContentFields,
}

/// Goes to `userId` when set, otherwise to everyone matching `targetFilters`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ScheduleRequest {
    #[serde(flatten)]
    pub content: ContentFields,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub target_filters: TargetFilters,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TestNotificationRequest {
    /// Defaults to the calling admin.
    pub user_id: Option<String>,
}

fn required(value: Option<String>, message: &str) -> Result<String, JivbookError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| validation_error(message))
}

// --- User routes ---

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/notifications/register-device",
    request_body = RegisterDeviceRequest,
    responses(
        (status = 200, description = "Device registered", body = RegisteredDevice),
        (status = 400, description = "Token, platform or deviceId missing"),
        (status = 401, description = "No caller identity")
    ),
    tag = "Notifications"
))]
pub async fn register_device_handler(
    State(state): State<Arc<NotificationState>>,
    user: AuthenticatedUser,
    Json(payload): Json<RegisterDeviceRequest>,
) -> ApiResult<RegisteredDevice> {
    const MISSING: &str = "Token, platform, and deviceId are required";
    let token = required(payload.token, MISSING)?;
    let device_id = required(payload.device_id, MISSING)?;
    let platform = payload.platform.ok_or_else(|| validation_error(MISSING))?;

    let device = state
        .service
        .register_device(DeviceRegistration {
            user_id: user.id,
            token,
            platform,
            device_id,
            device_info: payload.device_info,
        })
        .await?;

    Ok(ApiResponse::ok(
        "Device registered successfully",
        RegisteredDevice {
            device_id: device.id,
            token: device.token,
            platform: device.platform,
        },
    ))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/notifications/unregister-device",
    request_body = UnregisterDeviceRequest,
    responses(
        (status = 200, description = "Device unregistered (also when the token was unknown)"),
        (status = 400, description = "Token missing")
    ),
    tag = "Notifications"
))]
pub async fn unregister_device_handler(
    State(state): State<Arc<NotificationState>>,
    user: AuthenticatedUser,
    Json(payload): Json<UnregisterDeviceRequest>,
) -> ApiResult<()> {
    let token = required(payload.token, "Token is required")?;
    state.service.unregister_device(&user.id, &token).await?;
    Ok(done("Device unregistered successfully"))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/notifications/topics/subscribe",
    request_body = TopicRequest,
    responses(
        (status = 200, description = "Caller's devices subscribed", body = TopicManagementResult)
    ),
    tag = "Notifications"
))]
pub async fn subscribe_topic_handler(
    State(state): State<Arc<NotificationState>>,
    user: AuthenticatedUser,
    Json(payload): Json<TopicRequest>,
) -> ApiResult<TopicManagementResult> {
    let topic = required(payload.topic, "Topic is required")?;
    let result = state.service.subscribe_user_to_topic(&user.id, &topic).await?;
    Ok(ApiResponse::ok("Subscribed to topic successfully", result))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/notifications/topics/unsubscribe",
    request_body = TopicRequest,
    responses(
        (status = 200, description = "Caller's devices unsubscribed", body = TopicManagementResult)
    ),
    tag = "Notifications"
))]
pub async fn unsubscribe_topic_handler(
    State(state): State<Arc<NotificationState>>,
    user: AuthenticatedUser,
    Json(payload): Json<TopicRequest>,
) -> ApiResult<TopicManagementResult> {
    let topic = required(payload.topic, "Topic is required")?;
    let result = state
        .service
        .unsubscribe_user_from_topic(&user.id, &topic)
        .await?;
    Ok(ApiResponse::ok("Unsubscribed from topic successfully", result))
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/notifications/my-notifications",
    params(PageQuery),
    responses(
        (status = 200, description = "Visible notifications, newest first",
         body = UserNotifications)
    ),
    tag = "Notifications"
))]
pub async fn my_notifications_handler(
    State(state): State<Arc<NotificationState>>,
    user: AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<UserNotifications> {
    let notifications = state
        .service
        .get_user_notifications(&user.id, query.page, query.limit)
        .await?;
    Ok(ApiResponse::ok(
        "Notifications retrieved successfully",
        notifications,
    ))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/notifications/unread-count",
    responses((status = 200, description = "Unread visible notifications", body = CountResponse)),
    tag = "Notifications"
))]
pub async fn unread_count_handler(
    State(state): State<Arc<NotificationState>>,
    user: AuthenticatedUser,
) -> ApiResult<CountResponse> {
    let count = state.service.get_unread_count(&user.id).await?;
    Ok(ApiResponse::ok(
        "Unread count retrieved successfully",
        CountResponse { count },
    ))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/notifications/{id}/read",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked as read"),
        (status = 404, description = "Not one of the caller's notifications")
    ),
    tag = "Notifications"
))]
pub async fn mark_as_read_handler(
    State(state): State<Arc<NotificationState>>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.service.mark_as_read(&id, &user.id).await?;
    Ok(done("Notification marked as read"))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/notifications/mark-all-read",
    responses(
        (status = 200, description = "Number of notifications marked", body = UpdatedResponse)
    ),
    tag = "Notifications"
))]
pub async fn mark_all_as_read_handler(
    State(state): State<Arc<NotificationState>>,
    user: AuthenticatedUser,
) -> ApiResult<UpdatedResponse> {
    let updated = state.service.mark_all_as_read(&user.id).await?;
    Ok(ApiResponse::ok(
        "All notifications marked as read",
        UpdatedResponse { updated },
    ))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/notifications/{id}",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Not one of the caller's notifications")
    ),
    tag = "Notifications"
))]
pub async fn delete_notification_handler(
    State(state): State<Arc<NotificationState>>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.service.delete_notification(&id, &user.id).await?;
    Ok(done("Notification deleted successfully"))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/notifications/settings",
    responses(
        (status = 200, description = "Stored preferences, or the defaults",
         body = NotificationSettings)
    ),
    tag = "Notifications"
))]
pub async fn get_settings_handler(
    State(state): State<Arc<NotificationState>>,
    user: AuthenticatedUser,
) -> ApiResult<NotificationSettings> {
    let settings = state.service.get_notification_settings(&user.id).await?;
    Ok(ApiResponse::ok(
        "Notification settings retrieved successfully",
        settings,
    ))
}

/// Missing fields take their defaults, so the body replaces every preference.
#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/notifications/settings",
    request_body = NotificationSettings,
    responses((status = 200, description = "Saved preferences", body = NotificationSettings)),
    tag = "Notifications"
))]
pub async fn update_settings_handler(
    State(state): State<Arc<NotificationState>>,
    user: AuthenticatedUser,
    Json(settings): Json<NotificationSettings>,
) -> ApiResult<NotificationSettings> {
    let settings = state
        .service
        .update_notification_settings(&user.id, settings)
        .await?;
    Ok(ApiResponse::ok(
        "Notification settings updated successfully",
        settings,
    ))
}

// --- Admin routes ---

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/notifications/admin/send-to-user",
    request_body = SendToUserRequest,
    responses(
        (status = 200, description = "Delivery report", body = SendReport),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Caller is not an admin")
    ),
    tag = "Notifications Admin"
))]
pub async fn send_to_user_handler(
    State(state): State<Arc<NotificationState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<SendToUserRequest>,
) -> ApiResult<SendReport> {
    const MISSING: &str = "User ID, title, and body are required";
    let user_id = required(payload.user_id, MISSING)?;
    let content = payload.content.into_content(NotificationType::Custom, MISSING)?;

    let report = state
        .service
        .send_to_user(&user_id, content, Some(&admin.id))
        .await?;
    Ok(ApiResponse::ok("Notification sent successfully", report))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/notifications/admin/send-broadcast",
    request_body = SendBroadcastRequest,
    responses(
        (status = 200, description = "Delivery report", body = SendReport),
        (status = 403, description = "Caller is not an admin")
    ),
    tag = "Notifications Admin"
))]
pub async fn send_broadcast_handler(
    State(state): State<Arc<NotificationState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<SendBroadcastRequest>,
) -> ApiResult<SendReport> {
    let content = payload
        .content
        .into_content(NotificationType::Admin, "Title and body are required")?;

    let report = state
        .service
        .send_broadcast(content, Some(&admin.id), payload.target_filters)
        .await?;
    info!(
        "Broadcast {} by {}: {}",
        report.notification.id, admin.id, report.message
    );
    Ok(ApiResponse::ok(
        "Broadcast notification sent successfully",
        report,
    ))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/notifications/admin/send-to-topic",
    request_body = SendToTopicRequest,
    responses(
        (status = 200, description = "Delivery report", body = SendReport),
        (status = 502, description = "Push provider refused the send")
    ),
    tag = "Notifications Admin"
))]
pub async fn send_to_topic_handler(
    State(state): State<Arc<NotificationState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<SendToTopicRequest>,
) -> ApiResult<SendReport> {
    const MISSING: &str = "Topic, title, and body are required";
    let topic = required(payload.topic, MISSING)?;
    let content = payload.content.into_content(NotificationType::Admin, MISSING)?;

    let report = state
        .service
        .send_to_topic(&topic, content, Some(&admin.id))
        .await?;
    Ok(ApiResponse::ok("Topic notification sent successfully", report))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/notifications/admin/schedule",
    request_body = ScheduleRequest,
    responses(
        (status = 200, description = "Stored scheduled notification", body = Notification),
        (status = 400, description = "Missing fields or scheduledFor not in the future")
    ),
    tag = "Notifications Admin"
))]
pub async fn schedule_notification_handler(
    State(state): State<Arc<NotificationState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<ScheduleRequest>,
) -> ApiResult<Notification> {
    const MISSING: &str = "Title, body, and scheduledFor are required";
    let scheduled_for = payload
        .scheduled_for
        .ok_or_else(|| validation_error(MISSING))?;
    let content = payload.content.into_content(NotificationType::Admin, MISSING)?;
    let audience = match payload.user_id.filter(|id| !id.trim().is_empty()) {
        Some(user_id) => Audience::User(user_id),
        None => Audience::Broadcast(payload.target_filters),
    };

    let notification = state
        .service
        .schedule_notification(content, audience, scheduled_for, Some(&admin.id))
        .await?;
    Ok(ApiResponse::ok(
        "Notification scheduled successfully",
        notification,
    ))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/notifications/admin/test",
    request_body = TestNotificationRequest,
    responses((status = 200, description = "Delivery report", body = SendReport)),
    tag = "Notifications Admin"
))]
pub async fn test_notification_handler(
    State(state): State<Arc<NotificationState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<TestNotificationRequest>,
) -> ApiResult<SendReport> {
    let target = payload
        .user_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| admin.id.clone());

    let report = state
        .service
        .send_test_notification(&target, Some(&admin.id))
        .await?;
    Ok(ApiResponse::ok("Test notification sent successfully", report))
}

/// Body: `{"eventType": ..., "eventData": {...}}` where the event type is one of
/// `new_message`, `pet_inquiry`, `new_follower` or `post_liked`.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/notifications/admin/event",
    responses(
        (status = 200, description = "Delivery report", body = SendReport),
        (status = 422, description = "Unknown event type or missing event fields")
    ),
    tag = "Notifications Admin"
))]
pub async fn event_notification_handler(
    State(state): State<Arc<NotificationState>>,
    AdminUser(admin): AdminUser,
    Json(event): Json<NotificationEvent>,
) -> ApiResult<SendReport> {
    let report = state
        .service
        .send_event_notification(event, Some(&admin.id))
        .await?;
    Ok(ApiResponse::ok("Event notification sent successfully", report))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/notifications/admin/all-notifications",
    params(AllNotificationsQuery),
    responses(
        (status = 200, description = "Every notification, newest first", body = NotificationListing)
    ),
    tag = "Notifications Admin"
))]
pub async fn all_notifications_handler(
    State(state): State<Arc<NotificationState>>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<AllNotificationsQuery>,
) -> ApiResult<NotificationListing> {
    let filter = NotificationFilter {
        status: query.status,
        notification_type: query.notification_type,
    };
    let listing = state
        .service
        .list_all_notifications(filter, query.page, query.limit)
        .await?;
    Ok(ApiResponse::ok(
        "All notifications retrieved successfully",
        listing,
    ))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/notifications/admin/{id}/cancel",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Cancelled notification", body = Notification),
        (status = 400, description = "Not in scheduled status"),
        (status = 404, description = "Unknown id")
    ),
    tag = "Notifications Admin"
))]
pub async fn cancel_scheduled_handler(
    State(state): State<Arc<NotificationState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Notification> {
    let notification = state.service.cancel_scheduled(&id).await?;
    info!("Scheduled notification {} cancelled by {}", id, admin.id);
    Ok(ApiResponse::ok(
        "Scheduled notification cancelled successfully",
        notification,
    ))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/notifications/admin/analytics",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Counts per type and status, and per day",
         body = NotificationAnalytics)
    ),
    tag = "Notifications Admin"
))]
pub async fn analytics_handler(
    State(state): State<Arc<NotificationState>>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<NotificationAnalytics> {
    let analytics = state.service.get_analytics(query.date_range).await?;
    Ok(ApiResponse::ok("Analytics retrieved successfully", analytics))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/notifications/admin/jobs",
    responses((status = 200, description = "Background job status", body = [JobStatus])),
    tag = "Notifications Admin"
))]
pub async fn jobs_status_handler(
    State(state): State<Arc<NotificationState>>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Vec<JobStatus>> {
    let jobs = state
        .scheduler
        .as_ref()
        .map(|scheduler| scheduler.jobs_status())
        .unwrap_or_default();
    Ok(ApiResponse::ok("Jobs status retrieved successfully", jobs))
}

/// Runs one scheduled-notification pass now, even when the background jobs are disabled.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/notifications/admin/jobs/trigger",
    responses((status = 200, description = "Whether the pass completed", body = TriggerResponse)),
    tag = "Notifications Admin"
))]
pub async fn trigger_jobs_handler(
    State(state): State<Arc<NotificationState>>,
    AdminUser(admin): AdminUser,
) -> ApiResult<TriggerResponse> {
    info!("Scheduled pass triggered by {}", admin.id);
    let triggered = match &state.scheduler {
        Some(scheduler) => scheduler.trigger_scheduled_processing().await,
        None => state.service.process_scheduled_notifications().await.is_ok(),
    };
    Ok(ApiResponse::ok(
        "Scheduled processing triggered",
        TriggerResponse { triggered },
    ))
}
