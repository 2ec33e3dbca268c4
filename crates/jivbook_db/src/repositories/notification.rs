//! Notification record store
//!
//! Persists every notification attempt together with its targeting, payload,
//! schedule and delivery outcome.
//!
//! A record is *visible* to a user (counted as unread, listed in the inbox) when
//! `recipient = user AND status = 'sent' AND (expires_at IS NULL OR expires_at > now)`.

use chrono::{DateTime, Utc};
use std::future::Future;

use crate::error::DbError;

pub use jivbook_common::models::{
    DailyStats, DeliveryStats, Notification, NotificationStatus, NotificationType,
    TypeStatusStats,
};

/// Optional filters of the admin listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    pub status: Option<NotificationStatus>,
    pub notification_type: Option<NotificationType>,
}

/// One page of records plus the total number of matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Repository for notifications
pub trait NotificationRepository {
    /// Create the `notifications` table and its indexes if they don't already exist
    fn init_schema(&self) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Insert a new record
    fn create(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<Notification, DbError>> + Send;

    fn find_by_id(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Notification>, DbError>> + Send;

    /// Store the outcome of a delivery attempt
    fn update_delivery(
        &self,
        id: &str,
        status: NotificationStatus,
        stats: &DeliveryStats,
        message_id: Option<&str>,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    fn set_status(
        &self,
        id: &str,
        status: NotificationStatus,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Number of visible, unread records of `user_id` at `now`
    fn unread_count(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<i64, DbError>> + Send;

    /// Visible records of `user_id`, newest first
    ///
    /// `page` starts at 1.
    fn list_visible_for_user(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        page: u32,
        limit: u32,
    ) -> impl Future<Output = Result<Page<Notification>, DbError>> + Send;

    /// Flip `is_read` on one record of `user_id`
    ///
    /// # Returns
    ///
    /// `false` if no record with that id belongs to the user
    fn mark_as_read(
        &self,
        id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Flip `is_read` on every unread `sent` record of `user_id`
    fn mark_all_as_read(&self, user_id: &str) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Delete one record of `user_id`
    fn delete_for_user(
        &self,
        id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Every record matching `filter`, newest first
    fn list_all(
        &self,
        filter: &NotificationFilter,
        page: u32,
        limit: u32,
    ) -> impl Future<Output = Result<Page<Notification>, DbError>> + Send;

    /// Records with status `scheduled` whose `scheduled_for` is at or before `now`
    fn find_due_scheduled(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Notification>, DbError>> + Send;

    /// Hard-delete `sent`/`failed` records whose `expires_at` lies before `now`
    ///
    /// Records in any other status are kept regardless of expiry.
    fn delete_expired(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Counts and delivery totals per (type, status) for records created since `since`
    fn stats_by_type_and_status(
        &self,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<TypeStatusStats>, DbError>> + Send;

    /// Per-day volume and successful deliveries since `since`, oldest day first
    fn daily_stats(
        &self,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<DailyStats>, DbError>> + Send;
}
