//! Notification service
//!
//! Resolves who a notification goes to, records every attempt in the record
//! store, hands the tokens to the [`PushDelivery`](jivbook_common::services::PushDelivery)
//! capability and persists the outcome.
//!
//! Record lifecycle:
//!
//! - immediate sends: `sending → sent | failed`
//! - scheduled sends: `scheduled → (replayed as a new record, then deleted) | failed | cancelled`

use chrono::{DateTime, Duration, Utc};
use jivbook_common::models::{
    DeliveryStats, DeviceRegistration, DeviceToken, Notification, NotificationContent,
    NotificationSettings, NotificationStatus, NotificationType, Pagination, TargetFilters,
};
use jivbook_common::services::{DynPushDelivery, TopicManagementResult};
use jivbook_db::{
    DeviceTokenRepository, NotificationFilter, NotificationRepository, SqlDeviceTokenRepository,
    SqlNotificationRepository, SqlUserDirectory, UserDirectory, UserFilter,
};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::error::NotificationError;
use crate::events::NotificationEvent;
use crate::models::{
    Audience, DeliveryTally, NotificationAnalytics, NotificationListing, ProcessReport,
    SendReport, ServiceSettings, UserNotifications, MAX_BATCH_SIZE,
};

const NO_DEVICES_FOR_USER: &str = "No active devices found for user";
const NO_MATCHING_USERS: &str = "No users match the filter criteria";
const NO_DEVICES_FOR_TARGETS: &str = "No active devices found for target users";
const NOT_FOUND: &str = "Notification not found";
const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_ANALYTICS_DAYS: i64 = 7;

/// Tokens to deliver to, or why there are none.
enum Targets {
    Tokens(Vec<String>),
    Empty(&'static str),
}

pub struct NotificationService<
    D = SqlDeviceTokenRepository,
    N = SqlNotificationRepository,
    U = SqlUserDirectory,
> {
    devices: D,
    notifications: N,
    users: U,
    push: DynPushDelivery,
    settings: ServiceSettings,
}

impl<D, N, U> NotificationService<D, N, U>
where
    D: DeviceTokenRepository + Send + Sync,
    N: NotificationRepository + Send + Sync,
    U: UserDirectory + Send + Sync,
{
    pub fn new(
        devices: D,
        notifications: N,
        users: U,
        push: DynPushDelivery,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            devices,
            notifications,
            users,
            push,
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    // --- Devices ---

    pub async fn register_device(
        &self,
        registration: DeviceRegistration,
    ) -> Result<DeviceToken, NotificationError> {
        let device = self.devices.register_device(registration).await?;
        info!(
            "Registered {} device {} for user {}",
            device.platform.as_str(),
            device.device_id,
            device.user_id
        );
        Ok(device)
    }

    /// Deactivates `token` for `user_id`. Unknown tokens are not an error.
    pub async fn unregister_device(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<bool, NotificationError> {
        let changed = self.devices.unregister_device(user_id, token).await?;
        debug!("Unregister device for user {}: changed={}", user_id, changed);
        Ok(changed)
    }

    // --- Sending ---

    /// Sends `content` to every active device of `user_id`.
    pub async fn send_to_user(
        &self,
        user_id: &str,
        content: NotificationContent,
        created_by: Option<&str>,
    ) -> Result<SendReport, NotificationError> {
        content.validate()?;
        let record = Notification::new(
            content,
            Some(user_id.to_string()),
            created_by.map(str::to_string),
            NotificationStatus::Sending,
        );
        let notification = self.notifications.create(record).await?;

        let mut extra_data = Map::new();
        extra_data.insert("userId".to_string(), Value::String(user_id.to_string()));

        let targets = self.user_targets(user_id).await;
        self.deliver(notification, targets, &extra_data).await
    }

    /// Sends `content` to every active device of the users matching `filters`.
    pub async fn send_broadcast(
        &self,
        content: NotificationContent,
        created_by: Option<&str>,
        filters: TargetFilters,
    ) -> Result<SendReport, NotificationError> {
        content.validate()?;
        let mut record = Notification::new(
            content,
            None,
            created_by.map(str::to_string),
            NotificationStatus::Sending,
        );
        record.target_filters = filters;
        let notification = self.notifications.create(record).await?;

        let targets = self.broadcast_targets(&notification.target_filters).await;
        self.deliver(notification, targets, &Map::new()).await
    }

    /// Sends `content` to the devices subscribed to `topic`.
    ///
    /// A provider refusal marks the record `failed` and is returned as
    /// [`NotificationError::Delivery`].
    pub async fn send_to_topic(
        &self,
        topic: &str,
        content: NotificationContent,
        created_by: Option<&str>,
    ) -> Result<SendReport, NotificationError> {
        if topic.trim().is_empty() {
            return Err(NotificationError::Validation("Topic is required".to_string()));
        }
        content.validate()?;
        let record = Notification::new(
            content,
            None,
            created_by.map(str::to_string),
            NotificationStatus::Sending,
        );
        let mut notification = self.notifications.create(record).await?;

        let result = match self
            .push
            .send_to_topic(topic, &notification, &Map::new())
            .await
        {
            Ok(result) => result,
            Err(err) => {
                error!(
                    "Topic send of notification {} to '{}' failed: {}",
                    notification.id, topic, err
                );
                self.abandon(&notification).await;
                return Err(NotificationError::Delivery(err.to_string()));
            }
        };

        let status = if result.success {
            NotificationStatus::Sent
        } else {
            NotificationStatus::Failed
        };
        let stats = DeliveryStats::default();
        self.notifications
            .update_delivery(&notification.id, status, &stats, result.message_id.as_deref())
            .await?;
        notification.status = status;
        notification.message_id = result.message_id.clone();

        let message = match &result.error {
            Some(error) if !result.success => format!("Delivery failed: {}", error),
            _ => format!("Notification sent to topic '{}'", topic),
        };
        info!("Notification {} to topic '{}': {}", notification.id, topic, status);
        Ok(SendReport {
            success: result.success,
            message,
            notification,
            delivery_stats: stats,
            message_id: result.message_id,
        })
    }

    pub async fn subscribe_user_to_topic(
        &self,
        user_id: &str,
        topic: &str,
    ) -> Result<TopicManagementResult, NotificationError> {
        let tokens = self.active_tokens(user_id).await?;
        if tokens.is_empty() {
            return Ok(TopicManagementResult::default());
        }
        self.push
            .subscribe_to_topic(&tokens, topic)
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))
    }

    pub async fn unsubscribe_user_from_topic(
        &self,
        user_id: &str,
        topic: &str,
    ) -> Result<TopicManagementResult, NotificationError> {
        let tokens = self.active_tokens(user_id).await?;
        if tokens.is_empty() {
            return Ok(TopicManagementResult::default());
        }
        self.push
            .unsubscribe_from_topic(&tokens, topic)
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))
    }

    pub async fn send_event_notification(
        &self,
        event: NotificationEvent,
        system_user: Option<&str>,
    ) -> Result<SendReport, NotificationError> {
        debug!("Handling {} event for {}", event.name(), event.recipient());
        self.send_to_user(event.recipient(), event.content(), system_user)
            .await
    }

    pub async fn send_test_notification(
        &self,
        user_id: &str,
        created_by: Option<&str>,
    ) -> Result<SendReport, NotificationError> {
        let content = NotificationContent::new(
            "Test Notification",
            "This is a test notification from Jivbook admin panel",
            NotificationType::System,
        )
        .with_data("isTest", true);
        self.send_to_user(user_id, content, created_by).await
    }

    // --- Scheduling ---

    /// Stores `content` for delivery at `scheduled_for`, which must lie in the future.
    pub async fn schedule_notification(
        &self,
        content: NotificationContent,
        audience: Audience,
        scheduled_for: DateTime<Utc>,
        created_by: Option<&str>,
    ) -> Result<Notification, NotificationError> {
        content.validate()?;
        if scheduled_for <= Utc::now() {
            return Err(NotificationError::Validation(
                "Scheduled time must be in the future".to_string(),
            ));
        }

        let (recipient, filters) = match audience {
            Audience::User(user_id) => (Some(user_id), TargetFilters::default()),
            Audience::Broadcast(filters) => (None, filters),
        };
        let mut record = Notification::new(
            content,
            recipient,
            created_by.map(str::to_string),
            NotificationStatus::Scheduled,
        );
        record.target_filters = filters;
        record.scheduled_for = Some(scheduled_for);

        let notification = self.notifications.create(record).await?;
        info!(
            "Notification {} scheduled for {}",
            notification.id, scheduled_for
        );
        Ok(notification)
    }

    pub async fn cancel_scheduled(&self, id: &str) -> Result<Notification, NotificationError> {
        let mut notification = self
            .notifications
            .find_by_id(id)
            .await?
            .ok_or_else(|| NotificationError::NotFound(NOT_FOUND.to_string()))?;

        if notification.status != NotificationStatus::Scheduled {
            return Err(NotificationError::Validation(
                "Can only cancel scheduled notifications".to_string(),
            ));
        }

        self.notifications
            .set_status(id, NotificationStatus::Cancelled)
            .await?;
        notification.status = NotificationStatus::Cancelled;
        info!("Scheduled notification {} cancelled", id);
        Ok(notification)
    }

    /// Replays every due scheduled record as an immediate send.
    ///
    /// A replay that completes deletes the scheduled record, whatever the
    /// delivery outcome; one that errors marks it `failed`. Errors of single
    /// records never abort the pass.
    pub async fn process_scheduled_notifications(
        &self,
    ) -> Result<ProcessReport, NotificationError> {
        let due = self.notifications.find_due_scheduled(Utc::now()).await?;
        let mut report = ProcessReport {
            processed: due.len(),
            ..ProcessReport::default()
        };
        if due.is_empty() {
            debug!("No scheduled notifications due");
            return Ok(report);
        }

        info!("Processing {} scheduled notification(s)", due.len());
        for scheduled in due {
            match self.replay(&scheduled).await {
                Ok(sent) => {
                    if sent.success {
                        report.delivered += 1;
                    } else {
                        report.undelivered += 1;
                    }
                    if let Err(err) = self.notifications.delete(&scheduled.id).await {
                        error!(
                            "Failed to delete processed scheduled notification {}: {}",
                            scheduled.id, err
                        );
                    }
                }
                Err(err) => {
                    report.errors += 1;
                    error!(
                        "Failed to process scheduled notification {}: {}",
                        scheduled.id, err
                    );
                    if let Err(err) = self
                        .notifications
                        .set_status(&scheduled.id, NotificationStatus::Failed)
                        .await
                    {
                        error!(
                            "Failed to mark scheduled notification {} as failed: {}",
                            scheduled.id, err
                        );
                    }
                }
            }
        }

        info!(
            "Scheduled pass done: {} delivered, {} undelivered, {} errors",
            report.delivered, report.undelivered, report.errors
        );
        Ok(report)
    }

    // --- Inbox ---

    pub async fn get_user_notifications(
        &self,
        user_id: &str,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<UserNotifications, NotificationError> {
        let (page, limit) = self.page_bounds(page, limit);
        let now = Utc::now();
        let listed = self
            .notifications
            .list_visible_for_user(user_id, now, page, limit)
            .await?;
        let unread_count = self.notifications.unread_count(user_id, now).await?;

        Ok(UserNotifications {
            notifications: listed.items,
            pagination: Pagination::new(page, limit, listed.total),
            unread_count,
        })
    }

    pub async fn get_unread_count(&self, user_id: &str) -> Result<i64, NotificationError> {
        Ok(self.notifications.unread_count(user_id, Utc::now()).await?)
    }

    pub async fn mark_as_read(&self, id: &str, user_id: &str) -> Result<(), NotificationError> {
        if self.notifications.mark_as_read(id, user_id).await? {
            Ok(())
        } else {
            Err(NotificationError::NotFound(NOT_FOUND.to_string()))
        }
    }

    pub async fn mark_all_as_read(&self, user_id: &str) -> Result<u64, NotificationError> {
        Ok(self.notifications.mark_all_as_read(user_id).await?)
    }

    pub async fn delete_notification(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<(), NotificationError> {
        if self.notifications.delete_for_user(id, user_id).await? {
            Ok(())
        } else {
            Err(NotificationError::NotFound(NOT_FOUND.to_string()))
        }
    }

    // --- Preferences ---

    /// The stored preferences, or the defaults for users who never saved any.
    pub async fn get_notification_settings(
        &self,
        user_id: &str,
    ) -> Result<NotificationSettings, NotificationError> {
        Ok(self
            .users
            .find_notification_settings(user_id)
            .await?
            .unwrap_or_default())
    }

    pub async fn update_notification_settings(
        &self,
        user_id: &str,
        settings: NotificationSettings,
    ) -> Result<NotificationSettings, NotificationError> {
        self.users
            .save_notification_settings(user_id, &settings)
            .await?;
        info!("Updated notification settings of user {}", user_id);
        Ok(settings)
    }

    // --- Administration ---

    pub async fn list_all_notifications(
        &self,
        filter: NotificationFilter,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<NotificationListing, NotificationError> {
        let (page, limit) = self.page_bounds(page, limit);
        let listed = self.notifications.list_all(&filter, page, limit).await?;
        Ok(NotificationListing {
            notifications: listed.items,
            pagination: Pagination::new(page, limit, listed.total),
        })
    }

    /// Aggregates over the trailing `days` (default 7).
    pub async fn get_analytics(
        &self,
        days: Option<i64>,
    ) -> Result<NotificationAnalytics, NotificationError> {
        let days = days.unwrap_or(DEFAULT_ANALYTICS_DAYS).max(1);
        let since = Utc::now() - Duration::days(days);
        let analytics = self.notifications.stats_by_type_and_status(since).await?;
        let daily_stats = self.notifications.daily_stats(since).await?;
        Ok(NotificationAnalytics {
            analytics,
            daily_stats,
            date_range: days,
        })
    }

    /// Deletes `sent`/`failed` records whose expiry has passed.
    pub async fn cleanup_expired(&self) -> Result<u64, NotificationError> {
        let deleted = self.notifications.delete_expired(Utc::now()).await?;
        info!("Deleted {} expired notification(s)", deleted);
        Ok(deleted)
    }

    /// Deletes device tokens that are inactive or unused for the retention period.
    pub async fn cleanup_stale_tokens(&self) -> Result<u64, NotificationError> {
        let cutoff = Utc::now() - Duration::days(self.settings.token_retention_days);
        let deleted = self.devices.delete_stale(cutoff).await?;
        info!("Deleted {} inactive or stale device token(s)", deleted);
        Ok(deleted)
    }

    // --- Internals ---

    async fn replay(&self, scheduled: &Notification) -> Result<SendReport, NotificationError> {
        let created_by = scheduled.created_by.as_deref();
        match &scheduled.recipient {
            Some(user_id) => {
                self.send_to_user(user_id, scheduled.content(), created_by)
                    .await
            }
            None => {
                self.send_broadcast(
                    scheduled.content(),
                    created_by,
                    scheduled.target_filters.clone(),
                )
                .await
            }
        }
    }

    async fn active_tokens(&self, user_id: &str) -> Result<Vec<String>, NotificationError> {
        Ok(self
            .devices
            .find_active_by_user(user_id)
            .await?
            .into_iter()
            .map(|device| device.token)
            .collect())
    }

    async fn user_targets(&self, user_id: &str) -> Result<Targets, NotificationError> {
        let tokens = self.active_tokens(user_id).await?;
        if tokens.is_empty() {
            return Ok(Targets::Empty(NO_DEVICES_FOR_USER));
        }
        Ok(Targets::Tokens(tokens))
    }

    async fn broadcast_targets(
        &self,
        filters: &TargetFilters,
    ) -> Result<Targets, NotificationError> {
        let user_ids = self
            .users
            .find_user_ids(&UserFilter::from_target_filters(filters))
            .await?;
        if user_ids.is_empty() {
            return Ok(Targets::Empty(NO_MATCHING_USERS));
        }

        let devices = self
            .devices
            .find_active_by_users(&user_ids, &filters.platform)
            .await?;
        if devices.is_empty() {
            return Ok(Targets::Empty(NO_DEVICES_FOR_TARGETS));
        }

        debug!(
            "Broadcast audience: {} user(s), {} device(s)",
            user_ids.len(),
            devices.len()
        );
        Ok(Targets::Tokens(
            devices.into_iter().map(|device| device.token).collect(),
        ))
    }

    /// Sends to the resolved targets and settles the record in `sent` or `failed`.
    async fn deliver(
        &self,
        mut notification: Notification,
        targets: Result<Targets, NotificationError>,
        extra_data: &Map<String, Value>,
    ) -> Result<SendReport, NotificationError> {
        let tokens = match targets {
            Ok(Targets::Tokens(tokens)) => tokens,
            Ok(Targets::Empty(reason)) => {
                info!("Notification {} not sent: {}", notification.id, reason);
                let stats = DeliveryStats::default();
                self.notifications
                    .update_delivery(&notification.id, NotificationStatus::Failed, &stats, None)
                    .await?;
                notification.status = NotificationStatus::Failed;
                return Ok(SendReport {
                    success: false,
                    message: reason.to_string(),
                    notification,
                    delivery_stats: stats,
                    message_id: None,
                });
            }
            Err(err) => {
                self.abandon(&notification).await;
                return Err(err);
            }
        };

        let tally = self.dispatch(&notification, &tokens, extra_data).await;
        let status = if tally.delivered() {
            NotificationStatus::Sent
        } else {
            NotificationStatus::Failed
        };
        let stats = tally.stats();
        self.notifications
            .update_delivery(
                &notification.id,
                status,
                &stats,
                tally.first_message_id.as_deref(),
            )
            .await?;

        notification.status = status;
        notification.delivery_stats = stats.clone();
        if tally.first_message_id.is_some() {
            notification.message_id = tally.first_message_id.clone();
        }
        info!(
            "Notification {} {}: {}/{} device(s) in {} batch(es)",
            notification.id,
            status,
            stats.successful_deliveries,
            stats.total_targeted,
            tally.batches
        );

        Ok(SendReport {
            success: status == NotificationStatus::Sent,
            message: tally.summary(),
            notification,
            delivery_stats: stats,
            message_id: tally.first_message_id,
        })
    }

    /// Sequential batches; a batch the provider refuses counts as failed in full.
    async fn dispatch(
        &self,
        notification: &Notification,
        tokens: &[String],
        extra_data: &Map<String, Value>,
    ) -> DeliveryTally {
        let batch_size = self.settings.batch_size.clamp(1, MAX_BATCH_SIZE);
        let mut tally = DeliveryTally::default();

        for batch in tokens.chunks(batch_size) {
            match self
                .push
                .send_to_multiple_devices(batch, notification, extra_data)
                .await
            {
                Ok(result) => tally.record(batch.len(), Ok(&result)),
                Err(err) => {
                    warn!(
                        "Batch {} of notification {} failed ({} token(s)): {}",
                        tally.batches + 1,
                        notification.id,
                        batch.len(),
                        err
                    );
                    tally.record(batch.len(), Err(err.to_string()));
                }
            }
        }
        tally
    }

    /// Moves a record out of `sending` after an error interrupted it.
    async fn abandon(&self, notification: &Notification) {
        if let Err(err) = self
            .notifications
            .set_status(&notification.id, NotificationStatus::Failed)
            .await
        {
            error!(
                "Failed to mark notification {} as failed: {}",
                notification.id, err
            );
        }
    }

    fn page_bounds(&self, page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
        let page = page.unwrap_or(1).max(1);
        let limit = limit
            .unwrap_or(self.settings.default_page_size)
            .clamp(1, MAX_PAGE_SIZE);
        (page, limit)
    }
}
