//! SQL implementation of the notification repository

use chrono::{DateTime, Utc};
use sqlx::any::AnyRow;
use sqlx::Row;
use std::collections::BTreeMap;
use tracing::{debug, error, info};

use crate::convert::{
    flag, from_json_text, from_millis, nullable, opt_from_millis, to_json_text, to_millis,
};
use crate::error::DbError;
use crate::repositories::notification::{
    DailyStats, DeliveryStats, Notification, NotificationFilter, NotificationRepository,
    NotificationStatus, Page, TypeStatusStats,
};
use crate::DbClient;

const COLUMNS: &str = "id, title, body, image, recipient, notification_type, category, priority, \
     data, action_url, target_filters, scheduled_for, expires_at, status, total_targeted, \
     successful_deliveries, failed_deliveries, open_rate, click_rate, created_by, message_id, \
     is_read, created_at, updated_at";

/// Visible-to-recipient predicate; binds `$1` = user id, `$2` = now.
const VISIBLE: &str =
    "recipient = $1 AND status = 'sent' AND (expires_at IS NULL OR expires_at > $2)";

/// SQL implementation of the notification repository
#[derive(Debug, Clone)]
pub struct SqlNotificationRepository {
    /// The database client
    db_client: DbClient,
}

impl SqlNotificationRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }

    async fn count(&self, query: &str, binds: &[String]) -> Result<i64, DbError> {
        let mut statement = sqlx::query(query);
        for value in binds {
            statement = statement.bind(value);
        }
        let row = statement
            .fetch_one(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to count notifications: {}", e);
                DbError::QueryError(e.to_string())
            })?;
        Ok(row.try_get("total")?)
    }
}

fn offset(page: u32, limit: u32) -> i64 {
    i64::from(page.max(1) - 1) * i64::from(limit)
}

fn notification_from_row(row: &AnyRow) -> Result<Notification, DbError> {
    let notification_type: String = row.try_get("notification_type")?;
    let category: String = row.try_get("category")?;
    let priority: String = row.try_get("priority")?;
    let status: String = row.try_get("status")?;
    let data: String = row.try_get("data")?;
    let target_filters: String = row.try_get("target_filters")?;
    let is_read: i64 = row.try_get("is_read")?;

    Ok(Notification {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        body: row.try_get("body")?,
        image: nullable(row, "image")?,
        recipient: nullable(row, "recipient")?,
        notification_type: notification_type.parse()?,
        category: category.parse()?,
        priority: priority.parse()?,
        data: from_json_text(&data)?,
        action_url: nullable(row, "action_url")?,
        target_filters: from_json_text(&target_filters)?,
        scheduled_for: opt_from_millis(nullable(row, "scheduled_for")?)?,
        expires_at: opt_from_millis(nullable(row, "expires_at")?)?,
        status: status.parse()?,
        delivery_stats: DeliveryStats {
            total_targeted: row.try_get("total_targeted")?,
            successful_deliveries: row.try_get("successful_deliveries")?,
            failed_deliveries: row.try_get("failed_deliveries")?,
            open_rate: row.try_get("open_rate")?,
            click_rate: row.try_get("click_rate")?,
        },
        created_by: nullable(row, "created_by")?,
        message_id: nullable(row, "message_id")?,
        is_read: is_read != 0,
        created_at: from_millis(row.try_get("created_at")?)?,
        updated_at: from_millis(row.try_get("updated_at")?)?,
    })
}

impl NotificationRepository for SqlNotificationRepository {
    async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing notification schema");

        let query = r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                image TEXT,
                recipient TEXT,
                notification_type TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT 'info',
                priority TEXT NOT NULL DEFAULT 'normal',
                data TEXT NOT NULL DEFAULT '{}',
                action_url TEXT,
                target_filters TEXT NOT NULL DEFAULT '{}',
                scheduled_for BIGINT,
                expires_at BIGINT,
                status TEXT NOT NULL DEFAULT 'draft',
                total_targeted BIGINT NOT NULL DEFAULT 0,
                successful_deliveries BIGINT NOT NULL DEFAULT 0,
                failed_deliveries BIGINT NOT NULL DEFAULT 0,
                open_rate DOUBLE PRECISION NOT NULL DEFAULT 0,
                click_rate DOUBLE PRECISION NOT NULL DEFAULT 0,
                created_by TEXT,
                message_id TEXT,
                is_read BIGINT NOT NULL DEFAULT 0,
                created_at BIGINT NOT NULL,
                updated_at BIGINT NOT NULL
            )
        "#;
        self.db_client.execute(query).await?;

        for index in [
            "CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications (recipient, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_notifications_status_schedule ON notifications (status, scheduled_for)",
            "CREATE INDEX IF NOT EXISTS idx_notifications_type_created ON notifications (notification_type, created_at)",
        ] {
            self.db_client.execute(index).await?;
        }

        info!("Notification schema initialized successfully");
        Ok(())
    }

    async fn create(&self, notification: Notification) -> Result<Notification, DbError> {
        debug!(
            "Creating {} notification {} with status {}",
            notification.notification_type.as_str(),
            notification.id,
            notification.status
        );

        let query = r#"
            INSERT INTO notifications (
                id, title, body, image, recipient, notification_type, category, priority,
                data, action_url, target_filters, scheduled_for, expires_at, status,
                total_targeted, successful_deliveries, failed_deliveries, open_rate, click_rate,
                created_by, message_id, is_read, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22, $23, $24)
        "#;

        let stats = &notification.delivery_stats;
        sqlx::query(query)
            .bind(&notification.id)
            .bind(&notification.title)
            .bind(&notification.body)
            .bind(notification.image.clone())
            .bind(notification.recipient.clone())
            .bind(notification.notification_type.as_str())
            .bind(notification.category.as_str())
            .bind(notification.priority.as_str())
            .bind(to_json_text(&notification.data)?)
            .bind(notification.action_url.clone())
            .bind(to_json_text(&notification.target_filters)?)
            .bind(notification.scheduled_for.map(to_millis))
            .bind(notification.expires_at.map(to_millis))
            .bind(notification.status.as_str())
            .bind(stats.total_targeted)
            .bind(stats.successful_deliveries)
            .bind(stats.failed_deliveries)
            .bind(stats.open_rate)
            .bind(stats.click_rate)
            .bind(notification.created_by.clone())
            .bind(notification.message_id.clone())
            .bind(flag(notification.is_read))
            .bind(to_millis(notification.created_at))
            .bind(to_millis(notification.updated_at))
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to insert notification: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        Ok(notification)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Notification>, DbError> {
        let query = format!("SELECT {} FROM notifications WHERE id = $1", COLUMNS);

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to find notification {}: {}", id, e);
                DbError::QueryError(e.to_string())
            })?;

        row.as_ref().map(notification_from_row).transpose()
    }

    async fn update_delivery(
        &self,
        id: &str,
        status: NotificationStatus,
        stats: &DeliveryStats,
        message_id: Option<&str>,
    ) -> Result<bool, DbError> {
        debug!("Recording delivery outcome {} for notification {}", status, id);

        let query = r#"
            UPDATE notifications
            SET status = $1, total_targeted = $2, successful_deliveries = $3,
                failed_deliveries = $4, message_id = COALESCE($5, message_id), updated_at = $6
            WHERE id = $7
        "#;

        let result = sqlx::query(query)
            .bind(status.as_str())
            .bind(stats.total_targeted)
            .bind(stats.successful_deliveries)
            .bind(stats.failed_deliveries)
            .bind(message_id)
            .bind(to_millis(Utc::now()))
            .bind(id)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to update notification {}: {}", id, e);
                DbError::QueryError(e.to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_status(&self, id: &str, status: NotificationStatus) -> Result<bool, DbError> {
        let query = "UPDATE notifications SET status = $1, updated_at = $2 WHERE id = $3";

        let result = sqlx::query(query)
            .bind(status.as_str())
            .bind(to_millis(Utc::now()))
            .bind(id)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to set status of notification {}: {}", id, e);
                DbError::QueryError(e.to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to delete notification {}: {}", id, e);
                DbError::QueryError(e.to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn unread_count(&self, user_id: &str, now: DateTime<Utc>) -> Result<i64, DbError> {
        let query = format!(
            "SELECT COUNT(*) AS total FROM notifications WHERE {} AND is_read = 0",
            VISIBLE
        );

        let row = sqlx::query(&query)
            .bind(user_id)
            .bind(to_millis(now))
            .fetch_one(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to count unread notifications: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        Ok(row.try_get("total")?)
    }

    async fn list_visible_for_user(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        page: u32,
        limit: u32,
    ) -> Result<Page<Notification>, DbError> {
        let query = format!(
            "SELECT {} FROM notifications WHERE {} ORDER BY created_at DESC LIMIT $3 OFFSET $4",
            COLUMNS, VISIBLE
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(to_millis(now))
            .bind(i64::from(limit))
            .bind(offset(page, limit))
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to list notifications for user {}: {}", user_id, e);
                DbError::QueryError(e.to_string())
            })?;
        let items = rows
            .iter()
            .map(notification_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS total FROM notifications WHERE {}",
            VISIBLE
        ))
        .bind(user_id)
        .bind(to_millis(now))
        .fetch_one(self.db_client.pool())
        .await
        .map_err(|e| {
            error!("Failed to count notifications for user {}: {}", user_id, e);
            DbError::QueryError(e.to_string())
        })?;

        Ok(Page {
            items,
            total: row.try_get("total")?,
        })
    }

    async fn mark_as_read(&self, id: &str, user_id: &str) -> Result<bool, DbError> {
        let query = r#"
            UPDATE notifications
            SET is_read = 1, updated_at = $1
            WHERE id = $2 AND recipient = $3
        "#;

        let result = sqlx::query(query)
            .bind(to_millis(Utc::now()))
            .bind(id)
            .bind(user_id)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to mark notification {} as read: {}", id, e);
                DbError::QueryError(e.to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_as_read(&self, user_id: &str) -> Result<u64, DbError> {
        let query = r#"
            UPDATE notifications
            SET is_read = 1, updated_at = $1
            WHERE recipient = $2 AND is_read = 0 AND status = 'sent'
        "#;

        let result = sqlx::query(query)
            .bind(to_millis(Utc::now()))
            .bind(user_id)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to mark notifications of {} as read: {}", user_id, e);
                DbError::QueryError(e.to_string())
            })?;

        Ok(result.rows_affected())
    }

    async fn delete_for_user(&self, id: &str, user_id: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND recipient = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to delete notification {}: {}", id, e);
                DbError::QueryError(e.to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_all(
        &self,
        filter: &NotificationFilter,
        page: u32,
        limit: u32,
    ) -> Result<Page<Notification>, DbError> {
        let mut conditions = Vec::new();
        let mut binds = Vec::new();
        if let Some(status) = filter.status {
            binds.push(status.as_str().to_string());
            conditions.push(format!("status = ${}", binds.len()));
        }
        if let Some(notification_type) = filter.notification_type {
            binds.push(notification_type.as_str().to_string());
            conditions.push(format!("notification_type = ${}", binds.len()));
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {} FROM notifications{} ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            COLUMNS,
            where_clause,
            binds.len() + 1,
            binds.len() + 2
        );
        let mut statement = sqlx::query(&query);
        for value in &binds {
            statement = statement.bind(value);
        }
        let rows = statement
            .bind(i64::from(limit))
            .bind(offset(page, limit))
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to list notifications: {}", e);
                DbError::QueryError(e.to_string())
            })?;
        let items = rows
            .iter()
            .map(notification_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let total = self
            .count(
                &format!("SELECT COUNT(*) AS total FROM notifications{}", where_clause),
                &binds,
            )
            .await?;

        Ok(Page { items, total })
    }

    async fn find_due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<Notification>, DbError> {
        let query = format!(
            "SELECT {} FROM notifications WHERE status = 'scheduled' AND scheduled_for <= $1 ORDER BY scheduled_for",
            COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(to_millis(now))
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to find due scheduled notifications: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        rows.iter().map(notification_from_row).collect()
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
        let query = r#"
            DELETE FROM notifications
            WHERE expires_at < $1 AND status IN ('sent', 'failed')
        "#;

        let result = sqlx::query(query)
            .bind(to_millis(now))
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to delete expired notifications: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        Ok(result.rows_affected())
    }

    async fn stats_by_type_and_status(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<TypeStatusStats>, DbError> {
        let query = r#"
            SELECT notification_type, status,
                   COUNT(*) AS total,
                   CAST(COALESCE(SUM(total_targeted), 0) AS BIGINT) AS total_targeted,
                   CAST(COALESCE(SUM(successful_deliveries), 0) AS BIGINT) AS successful_deliveries,
                   CAST(COALESCE(SUM(failed_deliveries), 0) AS BIGINT) AS failed_deliveries
            FROM notifications
            WHERE created_at >= $1
            GROUP BY notification_type, status
            ORDER BY notification_type, status
        "#;

        let rows = sqlx::query(query)
            .bind(to_millis(since))
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to aggregate notifications: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        rows.iter()
            .map(|row| -> Result<TypeStatusStats, DbError> {
                let notification_type: String = row.try_get("notification_type")?;
                let status: String = row.try_get("status")?;
                Ok(TypeStatusStats {
                    notification_type: notification_type.parse()?,
                    status: status.parse()?,
                    count: row.try_get("total")?,
                    total_targeted: row.try_get("total_targeted")?,
                    successful_deliveries: row.try_get("successful_deliveries")?,
                    failed_deliveries: row.try_get("failed_deliveries")?,
                })
            })
            .collect()
    }

    async fn daily_stats(&self, since: DateTime<Utc>) -> Result<Vec<DailyStats>, DbError> {
        // Bucketing happens here rather than in SQL; date functions differ per backend
        let rows = sqlx::query(
            "SELECT created_at, successful_deliveries FROM notifications WHERE created_at >= $1",
        )
        .bind(to_millis(since))
        .fetch_all(self.db_client.pool())
        .await
        .map_err(|e| {
            error!("Failed to load notifications for daily stats: {}", e);
            DbError::QueryError(e.to_string())
        })?;

        let mut days: BTreeMap<String, (i64, i64)> = BTreeMap::new();
        for row in &rows {
            let created_at = from_millis(row.try_get("created_at")?)?;
            let successful: i64 = row.try_get("successful_deliveries")?;
            let entry = days
                .entry(created_at.format("%Y-%m-%d").to_string())
                .or_default();
            entry.0 += 1;
            entry.1 += successful;
        }

        Ok(days
            .into_iter()
            .map(|(date, (count, successful_deliveries))| DailyStats {
                date,
                count,
                successful_deliveries,
            })
            .collect())
    }
}
