use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use jivbook_common::models::{
    DeviceInfo, DeviceRegistration, Notification, NotificationContent, NotificationSettings,
    NotificationStatus, NotificationType, Platform, TargetFilters,
};
use jivbook_common::services::{
    BoxFuture, BoxedError, DeliveryFailure, DynPushDelivery, MulticastResult, PushDelivery,
    SendResult, TokenSendResponse, TopicManagementResult,
};
use jivbook_db::{
    DbClient, DeviceTokenRepository, NotificationFilter, NotificationRepository,
    SqlDeviceTokenRepository, SqlNotificationRepository, SqlUserDirectory, UserDirectory,
    UserProfile,
};
use serde_json::{json, Map, Value};

use crate::{Audience, NotificationError, NotificationEvent, NotificationService, ServiceSettings};

/// Delivers every token except those starting with `dead-`, and refuses the
/// calls whose (zero-based) index is listed in `failing_calls`.
#[derive(Default)]
struct RecordingPush {
    batches: Mutex<Vec<Vec<String>>>,
    extra_data: Mutex<Vec<Map<String, Value>>>,
    topics: Mutex<Vec<String>>,
    failing_calls: Vec<usize>,
}

impl RecordingPush {
    fn failing(calls: &[usize]) -> Self {
        Self {
            failing_calls: calls.to_vec(),
            ..Self::default()
        }
    }

    fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

impl PushDelivery for RecordingPush {
    type Error = BoxedError;

    fn send_to_multiple_devices<'a>(
        &'a self,
        tokens: &'a [String],
        _notification: &'a Notification,
        extra_data: &'a Map<String, Value>,
    ) -> BoxFuture<'a, MulticastResult, Self::Error> {
        Box::pin(async move {
            let call = {
                let mut batches = self.batches.lock().unwrap();
                batches.push(tokens.to_vec());
                batches.len() - 1
            };
            self.extra_data.lock().unwrap().push(extra_data.clone());
            if self.failing_calls.contains(&call) {
                return Err(BoxedError("provider unavailable".into()));
            }

            let responses = tokens
                .iter()
                .map(|token| {
                    if token.starts_with("dead-") {
                        TokenSendResponse::failed(
                            token.as_str(),
                            DeliveryFailure {
                                code: "UNREGISTERED".into(),
                                message: "Requested entity was not found.".into(),
                                invalid_token: true,
                            },
                        )
                    } else {
                        TokenSendResponse::delivered(
                            token.as_str(),
                            format!("projects/test/messages/{}", token),
                        )
                    }
                })
                .collect();
            Ok(MulticastResult::from_responses(responses))
        })
    }

    fn send_to_device<'a>(
        &'a self,
        token: &'a str,
        _notification: &'a Notification,
        _extra_data: &'a Map<String, Value>,
    ) -> BoxFuture<'a, SendResult, Self::Error> {
        Box::pin(async move { Ok(SendResult::sent(format!("projects/test/messages/{}", token))) })
    }

    fn send_to_topic<'a>(
        &'a self,
        topic: &'a str,
        _notification: &'a Notification,
        _extra_data: &'a Map<String, Value>,
    ) -> BoxFuture<'a, SendResult, Self::Error> {
        Box::pin(async move {
            self.topics.lock().unwrap().push(topic.to_string());
            if topic == "broken" {
                return Err(BoxedError("topic send refused".into()));
            }
            Ok(SendResult::sent("projects/test/messages/topic"))
        })
    }

    fn subscribe_to_topic<'a>(
        &'a self,
        tokens: &'a [String],
        _topic: &'a str,
    ) -> BoxFuture<'a, TopicManagementResult, Self::Error> {
        Box::pin(async move {
            Ok(TopicManagementResult {
                success_count: tokens.len(),
                ..TopicManagementResult::default()
            })
        })
    }

    fn unsubscribe_from_topic<'a>(
        &'a self,
        tokens: &'a [String],
        topic: &'a str,
    ) -> BoxFuture<'a, TopicManagementResult, Self::Error> {
        self.subscribe_to_topic(tokens, topic)
    }
}

struct Fixture {
    service: NotificationService,
    push: Arc<RecordingPush>,
    devices: SqlDeviceTokenRepository,
    notifications: SqlNotificationRepository,
    users: SqlUserDirectory,
}

async fn fixture_with(push: RecordingPush, batch_size: usize) -> Fixture {
    let db = DbClient::from_url("sqlite::memory:").await.unwrap();
    let devices = SqlDeviceTokenRepository::new(db.clone());
    let notifications = SqlNotificationRepository::new(db.clone());
    let users = SqlUserDirectory::new(db);
    devices.init_schema().await.unwrap();
    notifications.init_schema().await.unwrap();
    users.init_schema().await.unwrap();

    let push = Arc::new(push);
    let dyn_push: DynPushDelivery = push.clone();
    let settings = ServiceSettings {
        batch_size,
        ..ServiceSettings::default()
    };
    let service = NotificationService::new(
        devices.clone(),
        notifications.clone(),
        users.clone(),
        dyn_push,
        settings,
    );

    Fixture {
        service,
        push,
        devices,
        notifications,
        users,
    }
}

async fn fixture() -> Fixture {
    fixture_with(RecordingPush::default(), 500).await
}

async fn register(f: &Fixture, user_id: &str, token: &str, device_id: &str, platform: Platform) {
    f.devices
        .register_device(DeviceRegistration {
            user_id: user_id.to_string(),
            token: token.to_string(),
            platform,
            device_id: device_id.to_string(),
            device_info: DeviceInfo::default(),
        })
        .await
        .unwrap();
}

async fn user(f: &Fixture, id: &str, is_admin: bool) {
    f.users
        .upsert_user(UserProfile {
            id: id.to_string(),
            is_admin,
            ..UserProfile::default()
        })
        .await
        .unwrap();
}

fn content() -> NotificationContent {
    NotificationContent::new(
        "Adoption day",
        "Meet our pets this Saturday",
        NotificationType::Promotion,
    )
}

async fn stored(f: &Fixture, id: &str) -> Notification {
    f.notifications.find_by_id(id).await.unwrap().unwrap()
}

async fn count_with_status(f: &Fixture, status: NotificationStatus) -> i64 {
    let filter = NotificationFilter {
        status: Some(status),
        ..NotificationFilter::default()
    };
    f.notifications.list_all(&filter, 1, 100).await.unwrap().total
}

#[tokio::test]
async fn test_send_to_user_without_devices_fails_softly() {
    let f = fixture().await;

    let report = f.service.send_to_user("u1", content(), Some("admin-1")).await.unwrap();

    assert!(!report.success);
    assert_eq!(report.message, "No active devices found for user");
    assert_eq!(report.delivery_stats.total_targeted, 0);
    assert_eq!(report.notification.status, NotificationStatus::Failed);
    assert_eq!(stored(&f, &report.notification.id).await.status, NotificationStatus::Failed);
    assert!(f.push.batches().is_empty());
}

#[tokio::test]
async fn test_send_to_user_counts_per_token_outcomes() {
    let f = fixture().await;
    register(&f, "u1", "tok-phone", "d1", Platform::Android).await;
    register(&f, "u1", "dead-tablet", "d2", Platform::Ios).await;

    let report = f.service.send_to_user("u1", content(), None).await.unwrap();

    assert!(report.success);
    assert_eq!(report.delivery_stats.total_targeted, 2);
    assert_eq!(report.delivery_stats.successful_deliveries, 1);
    assert_eq!(report.delivery_stats.failed_deliveries, 1);
    assert_eq!(report.message_id.as_deref(), Some("projects/test/messages/tok-phone"));

    let record = stored(&f, &report.notification.id).await;
    assert_eq!(record.status, NotificationStatus::Sent);
    assert_eq!(record.recipient.as_deref(), Some("u1"));
    assert_eq!(record.delivery_stats.successful_deliveries, 1);
    assert_eq!(record.message_id, report.message_id);

    let extra = f.push.extra_data.lock().unwrap().clone();
    assert_eq!(extra[0]["userId"], json!("u1"));
}

#[tokio::test]
async fn test_invalid_content_creates_no_record() {
    let f = fixture().await;
    let empty_title = NotificationContent::new(" ", "Body", NotificationType::Custom);

    let err = f.service.send_to_user("u1", empty_title, None).await.unwrap_err();

    assert!(matches!(err, NotificationError::Validation(ref m) if m == "Title is required"));
    let all = f
        .notifications
        .list_all(&NotificationFilter::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(all.total, 0);
}

#[tokio::test]
async fn test_broadcast_batches_and_counts_refused_batch_as_failed() {
    let f = fixture_with(RecordingPush::failing(&[1]), 2).await;
    for id in ["u1", "u2", "u3"] {
        user(&f, id, false).await;
    }
    register(&f, "u1", "tok-1", "d1", Platform::Android).await;
    register(&f, "u1", "tok-2", "d2", Platform::Android).await;
    register(&f, "u2", "tok-3", "d3", Platform::Ios).await;
    register(&f, "u2", "tok-4", "d4", Platform::Web).await;
    register(&f, "u3", "tok-5", "d5", Platform::Android).await;

    let report = f
        .service
        .send_broadcast(content(), Some("admin-1"), TargetFilters::default())
        .await
        .unwrap();

    let batches = f.push.batches();
    assert_eq!(batches.len(), 3);
    assert_eq!(batches.iter().map(Vec::len).sum::<usize>(), 5);
    assert_eq!(report.delivery_stats.total_targeted, 5);
    assert_eq!(report.delivery_stats.successful_deliveries, 3);
    assert_eq!(report.delivery_stats.failed_deliveries, 2);
    assert!(report.success);

    let record = stored(&f, &report.notification.id).await;
    assert_eq!(record.status, NotificationStatus::Sent);
    assert!(record.recipient.is_none());
}

#[tokio::test]
async fn test_broadcast_where_every_batch_fails() {
    let f = fixture_with(RecordingPush::failing(&[0, 1]), 1).await;
    user(&f, "u1", false).await;
    register(&f, "u1", "tok-1", "d1", Platform::Android).await;
    register(&f, "u1", "tok-2", "d2", Platform::Android).await;

    let report = f
        .service
        .send_broadcast(content(), None, TargetFilters::default())
        .await
        .unwrap();

    assert!(!report.success);
    assert_eq!(report.message, "Delivery failed: provider unavailable");
    assert_eq!(report.delivery_stats.failed_deliveries, 2);
    assert_eq!(stored(&f, &report.notification.id).await.status, NotificationStatus::Failed);
}

#[tokio::test]
async fn test_broadcast_matching_no_users_leaves_nothing_sending() {
    let f = fixture().await;
    user(&f, "u1", false).await;
    register(&f, "u1", "tok-1", "d1", Platform::Android).await;

    let filters = TargetFilters {
        user_types: vec!["admin".into()],
        ..TargetFilters::default()
    };
    let report = f
        .service
        .send_broadcast(content(), None, filters.clone())
        .await
        .unwrap();

    assert!(!report.success);
    assert_eq!(report.message, "No users match the filter criteria");
    assert_eq!(count_with_status(&f, NotificationStatus::Sending).await, 0);
    let record = stored(&f, &report.notification.id).await;
    assert_eq!(record.status, NotificationStatus::Failed);
    assert_eq!(record.target_filters, filters);
    assert!(f.push.batches().is_empty());
}

#[tokio::test]
async fn test_broadcast_users_without_devices() {
    let f = fixture().await;
    user(&f, "u1", true).await;

    let report = f
        .service
        .send_broadcast(content(), None, TargetFilters::default())
        .await
        .unwrap();

    assert!(!report.success);
    assert_eq!(report.message, "No active devices found for target users");
    assert_eq!(report.delivery_stats.total_targeted, 0);
}

#[tokio::test]
async fn test_broadcast_narrowed_by_platform() {
    let f = fixture().await;
    user(&f, "u1", false).await;
    register(&f, "u1", "tok-android", "d1", Platform::Android).await;
    register(&f, "u1", "tok-ios", "d2", Platform::Ios).await;

    let filters = TargetFilters {
        platform: vec![Platform::Ios],
        ..TargetFilters::default()
    };
    f.service.send_broadcast(content(), None, filters).await.unwrap();

    assert_eq!(f.push.batches(), vec![vec!["tok-ios".to_string()]]);
}

#[tokio::test]
async fn test_schedule_rejects_past_times() {
    let f = fixture().await;

    let err = f
        .service
        .schedule_notification(
            content(),
            Audience::User("u1".into()),
            Utc::now() - Duration::minutes(5),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        NotificationError::Validation(ref m) if m == "Scheduled time must be in the future"
    ));
    assert_eq!(count_with_status(&f, NotificationStatus::Scheduled).await, 0);
}

#[tokio::test]
async fn test_schedule_broadcast_keeps_filters() {
    let f = fixture().await;
    let at = Utc::now() + Duration::hours(2);
    let filters = TargetFilters {
        pet_categories: vec!["dogs".into()],
        ..TargetFilters::default()
    };

    let scheduled = f
        .service
        .schedule_notification(content(), Audience::Broadcast(filters.clone()), at, Some("admin-1"))
        .await
        .unwrap();

    let record = stored(&f, &scheduled.id).await;
    assert_eq!(record.status, NotificationStatus::Scheduled);
    assert!(record.recipient.is_none());
    assert_eq!(record.target_filters, filters);
    assert_eq!(
        record.scheduled_for.map(|t| t.timestamp_millis()),
        Some(at.timestamp_millis())
    );
}

#[tokio::test]
async fn test_cancel_rules() {
    let f = fixture().await;

    let missing = f.service.cancel_scheduled("nope").await.unwrap_err();
    assert!(matches!(missing, NotificationError::NotFound(ref m) if m == "Notification not found"));

    let sent = f
        .notifications
        .create(Notification::new(content(), Some("u1".into()), None, NotificationStatus::Sent))
        .await
        .unwrap();
    let err = f.service.cancel_scheduled(&sent.id).await.unwrap_err();
    assert!(matches!(
        err,
        NotificationError::Validation(ref m) if m == "Can only cancel scheduled notifications"
    ));

    let scheduled = f
        .service
        .schedule_notification(
            content(),
            Audience::User("u1".into()),
            Utc::now() + Duration::hours(1),
            None,
        )
        .await
        .unwrap();
    let cancelled = f.service.cancel_scheduled(&scheduled.id).await.unwrap();
    assert_eq!(cancelled.status, NotificationStatus::Cancelled);
    assert_eq!(stored(&f, &scheduled.id).await.status, NotificationStatus::Cancelled);
}

/// Inserts a scheduled record that is already due.
async fn due_record(
    f: &Fixture,
    recipient: Option<&str>,
    status: NotificationStatus,
) -> Notification {
    let mut record = Notification::new(
        content(),
        recipient.map(str::to_string),
        Some("admin-1".into()),
        status,
    );
    record.scheduled_for = Some(Utc::now() - Duration::minutes(1));
    f.notifications.create(record).await.unwrap()
}

#[tokio::test]
async fn test_processing_replays_and_removes_due_records() {
    let f = fixture().await;
    register(&f, "u1", "tok-1", "d1", Platform::Android).await;
    let with_device = due_record(&f, Some("u1"), NotificationStatus::Scheduled).await;
    let without_device = due_record(&f, Some("u2"), NotificationStatus::Scheduled).await;
    let cancelled = due_record(&f, Some("u1"), NotificationStatus::Cancelled).await;

    let report = f.service.process_scheduled_notifications().await.unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.undelivered, 1);
    assert_eq!(report.errors, 0);

    assert!(f.notifications.find_by_id(&with_device.id).await.unwrap().is_none());
    assert!(f.notifications.find_by_id(&without_device.id).await.unwrap().is_none());
    assert_eq!(stored(&f, &cancelled.id).await.status, NotificationStatus::Cancelled);
    assert_eq!(count_with_status(&f, NotificationStatus::Scheduled).await, 0);

    // the replay is a new record that carries the original creator
    let sent = f
        .notifications
        .list_all(
            &NotificationFilter {
                status: Some(NotificationStatus::Sent),
                ..NotificationFilter::default()
            },
            1,
            10,
        )
        .await
        .unwrap();
    assert_eq!(sent.total, 1);
    assert_ne!(sent.items[0].id, with_device.id);
    assert_eq!(sent.items[0].created_by.as_deref(), Some("admin-1"));

    let second = f.service.process_scheduled_notifications().await.unwrap();
    assert_eq!(second.processed, 0);
}

#[tokio::test]
async fn test_processing_marks_erroring_replays_failed() {
    let f = fixture().await;
    let mut record = Notification::new(
        NotificationContent::new("", "Body", NotificationType::Admin),
        Some("u1".into()),
        None,
        NotificationStatus::Scheduled,
    );
    record.scheduled_for = Some(Utc::now() - Duration::minutes(1));
    let broken = f.notifications.create(record).await.unwrap();

    let report = f.service.process_scheduled_notifications().await.unwrap();

    assert_eq!(report.errors, 1);
    assert_eq!(stored(&f, &broken.id).await.status, NotificationStatus::Failed);
}

#[tokio::test]
async fn test_topic_send() {
    let f = fixture().await;

    let report = f.service.send_to_topic("pet-news", content(), None).await.unwrap();
    assert!(report.success);
    assert_eq!(report.message_id.as_deref(), Some("projects/test/messages/topic"));
    let record = stored(&f, &report.notification.id).await;
    assert_eq!(record.status, NotificationStatus::Sent);
    assert_eq!(record.message_id.as_deref(), Some("projects/test/messages/topic"));

    let err = f.service.send_to_topic("broken", content(), None).await.unwrap_err();
    assert!(matches!(err, NotificationError::Delivery(_)));
    assert_eq!(count_with_status(&f, NotificationStatus::Sending).await, 0);

    let missing = f.service.send_to_topic(" ", content(), None).await.unwrap_err();
    assert!(matches!(missing, NotificationError::Validation(_)));
}

#[tokio::test]
async fn test_topic_membership_uses_active_tokens() {
    let f = fixture().await;
    register(&f, "u1", "tok-1", "d1", Platform::Android).await;
    register(&f, "u1", "tok-2", "d2", Platform::Web).await;

    let subscribed = f.service.subscribe_user_to_topic("u1", "pet-news").await.unwrap();
    assert_eq!(subscribed.success_count, 2);

    let nobody = f.service.unsubscribe_user_from_topic("u9", "pet-news").await.unwrap();
    assert_eq!(nobody, TopicManagementResult::default());
}

#[tokio::test]
async fn test_event_notification() {
    let f = fixture().await;
    register(&f, "u2", "tok-1", "d1", Platform::Android).await;

    let event = NotificationEvent::NewFollower {
        followed_user_id: "u2".into(),
        follower_id: "u9".into(),
        follower_name: "Ravi".into(),
    };
    let report = f
        .service
        .send_event_notification(event, Some("system"))
        .await
        .unwrap();

    let record = stored(&f, &report.notification.id).await;
    assert_eq!(record.title, "New Follower");
    assert_eq!(record.recipient.as_deref(), Some("u2"));
    assert_eq!(record.notification_type, NotificationType::Follow);
    assert_eq!(record.created_by.as_deref(), Some("system"));
    assert_eq!(record.data["followerId"], json!("u9"));
}

#[tokio::test]
async fn test_inbox_operations() {
    let f = fixture().await;
    for _ in 0..3 {
        f.notifications
            .create(Notification::new(content(), Some("u1".into()), None, NotificationStatus::Sent))
            .await
            .unwrap();
    }
    f.notifications
        .create(Notification::new(content(), Some("u1".into()), None, NotificationStatus::Failed))
        .await
        .unwrap();

    let inbox = f.service.get_user_notifications("u1", Some(1), Some(2)).await.unwrap();
    assert_eq!(inbox.notifications.len(), 2);
    assert_eq!(inbox.pagination.total, 3);
    assert_eq!(inbox.pagination.pages, 2);
    assert_eq!(inbox.unread_count, 3);

    let first = inbox.notifications[0].id.clone();
    f.service.mark_as_read(&first, "u1").await.unwrap();
    assert_eq!(f.service.get_unread_count("u1").await.unwrap(), 2);
    assert!(matches!(
        f.service.mark_as_read(&first, "u2").await,
        Err(NotificationError::NotFound(_))
    ));

    assert_eq!(f.service.mark_all_as_read("u1").await.unwrap(), 2);
    assert_eq!(f.service.get_unread_count("u1").await.unwrap(), 0);

    f.service.delete_notification(&first, "u1").await.unwrap();
    assert!(matches!(
        f.service.delete_notification(&first, "u1").await,
        Err(NotificationError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_settings_fall_back_to_defaults_until_saved() {
    let f = fixture().await;
    assert_eq!(
        f.service.get_notification_settings("u1").await.unwrap(),
        NotificationSettings::default()
    );

    let mut wanted = NotificationSettings {
        enable_sms_notifications: true,
        ..NotificationSettings::default()
    };
    wanted.notification_types.follow = false;
    let saved = f
        .service
        .update_notification_settings("u1", wanted.clone())
        .await
        .unwrap();
    assert_eq!(saved, wanted);

    assert_eq!(f.service.get_notification_settings("u1").await.unwrap(), wanted);
    assert_eq!(
        f.service.get_notification_settings("u2").await.unwrap(),
        NotificationSettings::default()
    );
}

#[tokio::test]
async fn test_default_page_size_and_analytics_window() {
    let f = fixture().await;
    let inbox = f.service.get_user_notifications("u1", None, None).await.unwrap();
    assert_eq!(inbox.pagination.page, 1);
    assert_eq!(inbox.pagination.limit, 20);

    let analytics = f.service.get_analytics(None).await.unwrap();
    assert_eq!(analytics.date_range, 7);
    assert!(analytics.analytics.is_empty());
}

#[tokio::test]
async fn test_token_cleanup_keeps_fresh_active_tokens() {
    let f = fixture().await;
    register(&f, "u1", "tok-keep", "d1", Platform::Android).await;
    register(&f, "u1", "tok-gone", "d2", Platform::Android).await;
    f.devices.unregister_device("u1", "tok-gone").await.unwrap();

    assert_eq!(f.service.cleanup_stale_tokens().await.unwrap(), 1);
    assert!(f.devices.find_by_token("tok-gone").await.unwrap().is_none());
    assert!(f.devices.find_by_token("tok-keep").await.unwrap().is_some());
}

#[tokio::test]
async fn test_expired_cleanup_spares_scheduled_records() {
    let f = fixture().await;
    let yesterday = Utc::now() - Duration::days(1);
    let mut sent = Notification::new(content(), Some("u1".into()), None, NotificationStatus::Sent);
    sent.expires_at = Some(yesterday);
    let sent = f.notifications.create(sent).await.unwrap();
    let mut scheduled =
        Notification::new(content(), Some("u1".into()), None, NotificationStatus::Scheduled);
    scheduled.expires_at = Some(yesterday);
    scheduled.scheduled_for = Some(Utc::now() + Duration::days(1));
    let scheduled = f.notifications.create(scheduled).await.unwrap();

    assert_eq!(f.service.cleanup_expired().await.unwrap(), 1);
    assert!(f.notifications.find_by_id(&sent.id).await.unwrap().is_none());
    assert!(f.notifications.find_by_id(&scheduled.id).await.unwrap().is_some());
}
