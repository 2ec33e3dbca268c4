use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{
    all_notifications_handler, analytics_handler, cancel_scheduled_handler,
    delete_notification_handler, event_notification_handler, get_settings_handler,
    jobs_status_handler, mark_all_as_read_handler, mark_as_read_handler,
    my_notifications_handler, register_device_handler, schedule_notification_handler,
    send_broadcast_handler, send_to_topic_handler, send_to_user_handler,
    subscribe_topic_handler, test_notification_handler, trigger_jobs_handler,
    unread_count_handler, unregister_device_handler, unsubscribe_topic_handler,
    update_settings_handler, NotificationState,
};

/// All notification routes, relative to the API root.
pub fn routes(state: NotificationState) -> Router {
    Router::new()
        .route("/notifications/register-device", post(register_device_handler))
        .route(
            "/notifications/unregister-device",
            post(unregister_device_handler),
        )
        .route("/notifications/topics/subscribe", post(subscribe_topic_handler))
        .route(
            "/notifications/topics/unsubscribe",
            post(unsubscribe_topic_handler),
        )
        .route("/notifications/my-notifications", get(my_notifications_handler))
        .route("/notifications/unread-count", get(unread_count_handler))
        .route("/notifications/mark-all-read", put(mark_all_as_read_handler))
        .route(
            "/notifications/settings",
            get(get_settings_handler).put(update_settings_handler),
        )
        .route("/notifications/{id}/read", put(mark_as_read_handler))
        .route("/notifications/{id}", delete(delete_notification_handler))
        // Admin
        .route("/notifications/admin/send-to-user", post(send_to_user_handler))
        .route(
            "/notifications/admin/send-broadcast",
            post(send_broadcast_handler),
        )
        .route("/notifications/admin/send-to-topic", post(send_to_topic_handler))
        .route(
            "/notifications/admin/schedule",
            post(schedule_notification_handler),
        )
        .route("/notifications/admin/test", post(test_notification_handler))
        .route("/notifications/admin/event", post(event_notification_handler))
        .route(
            "/notifications/admin/all-notifications",
            get(all_notifications_handler),
        )
        .route("/notifications/admin/{id}/cancel", put(cancel_scheduled_handler))
        .route("/notifications/admin/analytics", get(analytics_handler))
        .route("/notifications/admin/jobs", get(jobs_status_handler))
        .route("/notifications/admin/jobs/trigger", post(trigger_jobs_handler))
        .with_state(Arc::new(state))
}
