#![cfg(feature = "openapi")]

use jivbook_common::models::{
    AgeRange, DailyStats, DeliveryStats, DeviceInfo, DeviceToken, Notification,
    NotificationCategory, NotificationPriority, NotificationSettings, NotificationStatus,
    NotificationType, NotificationTypeToggles, Pagination, Platform, TargetFilters,
    TypeStatusStats,
};
use jivbook_common::services::{TopicManagementError, TopicManagementResult};
use utoipa::OpenApi;

use crate::handlers::{
    ContentFields, CountResponse, RegisterDeviceRequest, RegisteredDevice, ScheduleRequest,
    SendBroadcastRequest, SendToTopicRequest, SendToUserRequest, TestNotificationRequest,
    TopicRequest, TriggerResponse, UnregisterDeviceRequest, UpdatedResponse,
};
use crate::models::{NotificationAnalytics, NotificationListing, SendReport, UserNotifications};
use crate::scheduler::JobStatus;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::register_device_handler,
        crate::handlers::unregister_device_handler,
        crate::handlers::subscribe_topic_handler,
        crate::handlers::unsubscribe_topic_handler,
        crate::handlers::my_notifications_handler,
        crate::handlers::unread_count_handler,
        crate::handlers::mark_as_read_handler,
        crate::handlers::mark_all_as_read_handler,
        crate::handlers::delete_notification_handler,
        crate::handlers::get_settings_handler,
        crate::handlers::update_settings_handler,
        crate::handlers::send_to_user_handler,
        crate::handlers::send_broadcast_handler,
        crate::handlers::send_to_topic_handler,
        crate::handlers::schedule_notification_handler,
        crate::handlers::test_notification_handler,
        crate::handlers::event_notification_handler,
        crate::handlers::all_notifications_handler,
        crate::handlers::cancel_scheduled_handler,
        crate::handlers::analytics_handler,
        crate::handlers::jobs_status_handler,
        crate::handlers::trigger_jobs_handler
    ),
    components(
        schemas(
            RegisterDeviceRequest,
            RegisteredDevice,
            UnregisterDeviceRequest,
            TopicRequest,
            ContentFields,
            SendToUserRequest,
            SendBroadcastRequest,
            SendToTopicRequest,
            ScheduleRequest,
            TestNotificationRequest,
            CountResponse,
            UpdatedResponse,
            TriggerResponse,
            SendReport,
            UserNotifications,
            NotificationListing,
            NotificationAnalytics,
            JobStatus,
            Notification,
            NotificationType,
            NotificationCategory,
            NotificationPriority,
            NotificationStatus,
            DeliveryStats,
            NotificationSettings,
            NotificationTypeToggles,
            TargetFilters,
            AgeRange,
            Pagination,
            TypeStatusStats,
            DailyStats,
            DeviceToken,
            DeviceInfo,
            Platform,
            TopicManagementResult,
            TopicManagementError
        )
    ),
    tags(
        (name = "Notifications", description = "Device registration and the caller's inbox"),
        (
            name = "Notifications Admin",
            description = "Sending, scheduling and analytics (admin only)"
        )
    ),
    servers(
        (url = "/api", description = "Jivbook API server")
    )
)]
pub struct NotificationApiDoc;
