//! SQL implementation of the device token repository

use chrono::{DateTime, Utc};
use sqlx::any::AnyRow;
use sqlx::Row;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::convert::{flag, from_json_text, from_millis, placeholders, to_json_text, to_millis};
use crate::error::DbError;
use crate::repositories::device_token::{
    DeviceRegistration, DeviceToken, DeviceTokenRepository, Platform,
};
use crate::DbClient;

/// Largest number of values bound into one `IN (...)` list.
const IN_CHUNK: usize = 500;

const COLUMNS: &str =
    "id, user_id, token, platform, device_id, device_info, is_active, last_used, created_at, updated_at";

/// SQL implementation of the device token repository
#[derive(Debug, Clone)]
pub struct SqlDeviceTokenRepository {
    /// The database client
    db_client: DbClient,
}

impl SqlDeviceTokenRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }
}

fn device_token_from_row(row: &AnyRow) -> Result<DeviceToken, DbError> {
    let platform: String = row.try_get("platform")?;
    let device_info: String = row.try_get("device_info")?;
    let is_active: i64 = row.try_get("is_active")?;

    Ok(DeviceToken {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        token: row.try_get("token")?,
        platform: platform.parse()?,
        device_id: row.try_get("device_id")?,
        device_info: from_json_text(&device_info)?,
        is_active: is_active != 0,
        last_used: from_millis(row.try_get("last_used")?)?,
        created_at: from_millis(row.try_get("created_at")?)?,
        updated_at: from_millis(row.try_get("updated_at")?)?,
    })
}

impl DeviceTokenRepository for SqlDeviceTokenRepository {
    async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing device token schema");

        let query = r#"
            CREATE TABLE IF NOT EXISTS device_tokens (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                token TEXT NOT NULL UNIQUE,
                platform TEXT NOT NULL,
                device_id TEXT NOT NULL,
                device_info TEXT NOT NULL DEFAULT '{}',
                is_active BIGINT NOT NULL DEFAULT 1,
                last_used BIGINT NOT NULL,
                created_at BIGINT NOT NULL,
                updated_at BIGINT NOT NULL
            )
        "#;
        self.db_client.execute(query).await?;

        self.db_client
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_device_tokens_user_active ON device_tokens (user_id, is_active)",
            )
            .await?;
        self.db_client
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_device_tokens_user_device ON device_tokens (user_id, device_id)",
            )
            .await?;

        info!("Device token schema initialized successfully");
        Ok(())
    }

    async fn register_device(
        &self,
        registration: DeviceRegistration,
    ) -> Result<DeviceToken, DbError> {
        debug!(
            "Registering {} device {} for user: {}",
            registration.platform.as_str(),
            registration.device_id,
            registration.user_id
        );

        let now = from_millis(to_millis(Utc::now()))?;
        let now_ms = to_millis(now);
        let device_info = to_json_text(&registration.device_info)?;

        let existing = self.find_by_token(&registration.token).await?;

        let stored = if let Some(existing) = existing {
            debug!("Token already known, reassigning record {}", existing.id);

            let query = r#"
                UPDATE device_tokens
                SET user_id = $1, platform = $2, device_id = $3, device_info = $4,
                    is_active = 1, last_used = $5, updated_at = $5
                WHERE token = $6
            "#;

            sqlx::query(query)
                .bind(&registration.user_id)
                .bind(registration.platform.as_str())
                .bind(&registration.device_id)
                .bind(&device_info)
                .bind(now_ms)
                .bind(&registration.token)
                .execute(self.db_client.pool())
                .await
                .map_err(|e| {
                    error!("Failed to update device token: {}", e);
                    DbError::QueryError(e.to_string())
                })?;

            DeviceToken {
                id: existing.id,
                user_id: registration.user_id,
                token: registration.token,
                platform: registration.platform,
                device_id: registration.device_id,
                device_info: registration.device_info,
                is_active: true,
                last_used: now,
                created_at: existing.created_at,
                updated_at: now,
            }
        } else {
            let id = Uuid::new_v4().to_string();

            let query = r#"
                INSERT INTO device_tokens
                    (id, user_id, token, platform, device_id, device_info, is_active, last_used, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, 1, $7, $7, $7)
            "#;

            sqlx::query(query)
                .bind(&id)
                .bind(&registration.user_id)
                .bind(&registration.token)
                .bind(registration.platform.as_str())
                .bind(&registration.device_id)
                .bind(&device_info)
                .bind(now_ms)
                .execute(self.db_client.pool())
                .await
                .map_err(|e| {
                    error!("Failed to insert device token: {}", e);
                    DbError::QueryError(e.to_string())
                })?;

            DeviceToken {
                id,
                user_id: registration.user_id,
                token: registration.token,
                platform: registration.platform,
                device_id: registration.device_id,
                device_info: registration.device_info,
                is_active: true,
                last_used: now,
                created_at: now,
                updated_at: now,
            }
        };

        // One active token per (user, device)
        let query = r#"
            UPDATE device_tokens
            SET is_active = 0, updated_at = $1
            WHERE user_id = $2 AND device_id = $3 AND token <> $4 AND is_active = 1
        "#;

        let replaced = sqlx::query(query)
            .bind(now_ms)
            .bind(&stored.user_id)
            .bind(&stored.device_id)
            .bind(&stored.token)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to deactivate replaced device tokens: {}", e);
                DbError::QueryError(e.to_string())
            })?
            .rows_affected();

        if replaced > 0 {
            debug!(
                "Deactivated {} previous token(s) for device {}",
                replaced, stored.device_id
            );
        }

        info!("Device registered for user: {}", stored.user_id);
        Ok(stored)
    }

    async fn unregister_device(&self, user_id: &str, token: &str) -> Result<bool, DbError> {
        debug!("Unregistering device token for user: {}", user_id);

        let query = r#"
            UPDATE device_tokens
            SET is_active = 0, updated_at = $1
            WHERE token = $2 AND user_id = $3
        "#;

        let result = sqlx::query(query)
            .bind(to_millis(Utc::now()))
            .bind(token)
            .bind(user_id)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to unregister device token: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<DeviceToken>, DbError> {
        let query = format!("SELECT {} FROM device_tokens WHERE token = $1", COLUMNS);

        let row = sqlx::query(&query)
            .bind(token)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to find device token: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        row.as_ref().map(device_token_from_row).transpose()
    }

    async fn find_active_by_user(&self, user_id: &str) -> Result<Vec<DeviceToken>, DbError> {
        debug!("Finding active device tokens for user: {}", user_id);

        let query = format!(
            "SELECT {} FROM device_tokens WHERE user_id = $1 AND is_active = 1 ORDER BY created_at",
            COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to find device tokens: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        rows.iter().map(device_token_from_row).collect()
    }

    async fn find_active_by_users(
        &self,
        user_ids: &[String],
        platforms: &[Platform],
    ) -> Result<Vec<DeviceToken>, DbError> {
        debug!(
            "Finding active device tokens for {} user(s), platforms: {:?}",
            user_ids.len(),
            platforms
        );

        let mut tokens = Vec::new();
        for chunk in user_ids.chunks(IN_CHUNK) {
            let mut query = format!(
                "SELECT {} FROM device_tokens WHERE is_active = 1 AND user_id IN ({})",
                COLUMNS,
                placeholders(1, chunk.len())
            );
            if !platforms.is_empty() {
                query.push_str(&format!(
                    " AND platform IN ({})",
                    placeholders(chunk.len() + 1, platforms.len())
                ));
            }
            query.push_str(" ORDER BY user_id, created_at");

            let mut statement = sqlx::query(&query);
            for user_id in chunk {
                statement = statement.bind(user_id);
            }
            for platform in platforms {
                statement = statement.bind(platform.as_str());
            }

            let rows = statement
                .fetch_all(self.db_client.pool())
                .await
                .map_err(|e| {
                    error!("Failed to find device tokens for users: {}", e);
                    DbError::QueryError(e.to_string())
                })?;

            for row in &rows {
                tokens.push(device_token_from_row(row)?);
            }
        }

        Ok(tokens)
    }

    async fn deactivate_tokens(&self, tokens: &[String]) -> Result<u64, DbError> {
        let now_ms = to_millis(Utc::now());
        let mut deactivated = 0;

        for chunk in tokens.chunks(IN_CHUNK) {
            let query = format!(
                "UPDATE device_tokens SET is_active = $1, updated_at = $2 WHERE is_active = 1 AND token IN ({})",
                placeholders(3, chunk.len())
            );

            let mut statement = sqlx::query(&query).bind(flag(false)).bind(now_ms);
            for token in chunk {
                statement = statement.bind(token);
            }

            deactivated += statement
                .execute(self.db_client.pool())
                .await
                .map_err(|e| {
                    error!("Failed to deactivate device tokens: {}", e);
                    DbError::QueryError(e.to_string())
                })?
                .rows_affected();
        }

        if deactivated > 0 {
            info!("Deactivated {} invalid device token(s)", deactivated);
        }
        Ok(deactivated)
    }

    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let query = r#"
            DELETE FROM device_tokens
            WHERE is_active = 0 OR last_used < $1
        "#;

        let result = sqlx::query(query)
            .bind(to_millis(cutoff))
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to delete stale device tokens: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        Ok(result.rows_affected())
    }
}
