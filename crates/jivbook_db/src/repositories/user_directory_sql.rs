//! SQL implementation of the user directory

use chrono::Utc;
use jivbook_common::models::NotificationSettings;
use sqlx::Row;
use tracing::{debug, error, info};

use crate::convert::{flag, from_json_text, placeholders, to_json_text, to_millis};
use crate::error::DbError;
use crate::repositories::user_directory::{UserDirectory, UserFilter, UserProfile, UserRole};
use crate::DbClient;

#[derive(Debug, Clone)]
pub struct SqlUserDirectory {
    /// The database client
    db_client: DbClient,
}

impl SqlUserDirectory {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }
}

impl UserDirectory for SqlUserDirectory {
    async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing user directory schema");

        let users = r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                is_admin BIGINT NOT NULL DEFAULT 0,
                is_premium BIGINT NOT NULL DEFAULT 0
            )
        "#;
        self.db_client.execute(users).await?;

        let categories = r#"
            CREATE TABLE IF NOT EXISTS user_pet_categories (
                user_id TEXT NOT NULL,
                category_id TEXT NOT NULL,
                PRIMARY KEY (user_id, category_id)
            )
        "#;
        self.db_client.execute(categories).await?;

        let settings = r#"
            CREATE TABLE IF NOT EXISTS notification_settings (
                user_id TEXT PRIMARY KEY,
                settings TEXT NOT NULL,
                updated_at BIGINT NOT NULL
            )
        "#;
        self.db_client.execute(settings).await?;

        info!("User directory schema initialized successfully");
        Ok(())
    }

    async fn upsert_user(&self, profile: UserProfile) -> Result<(), DbError> {
        debug!("Upserting user profile: {}", profile.id);

        let query = r#"
            INSERT INTO users (id, is_admin, is_premium)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET is_admin = $2, is_premium = $3
        "#;

        sqlx::query(query)
            .bind(&profile.id)
            .bind(flag(profile.is_admin))
            .bind(flag(profile.is_premium))
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to upsert user {}: {}", profile.id, e);
                DbError::QueryError(e.to_string())
            })?;

        sqlx::query("DELETE FROM user_pet_categories WHERE user_id = $1")
            .bind(&profile.id)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to clear pet categories of {}: {}", profile.id, e);
                DbError::QueryError(e.to_string())
            })?;

        for category in &profile.preferred_pet_categories {
            sqlx::query("INSERT INTO user_pet_categories (user_id, category_id) VALUES ($1, $2)")
                .bind(&profile.id)
                .bind(category)
                .execute(self.db_client.pool())
                .await
                .map_err(|e| {
                    error!("Failed to store pet category of {}: {}", profile.id, e);
                    DbError::QueryError(e.to_string())
                })?;
        }

        Ok(())
    }

    async fn find_user_ids(&self, filter: &UserFilter) -> Result<Vec<String>, DbError> {
        debug!("Resolving users for filter: {:?}", filter);

        let mut query = "SELECT u.id AS id FROM users u WHERE 1 = 1".to_string();
        match filter.role {
            Some(UserRole::Admin) => query.push_str(" AND u.is_admin = 1"),
            Some(UserRole::Premium) => query.push_str(" AND u.is_premium = 1"),
            None => {}
        }
        if !filter.pet_categories.is_empty() {
            query.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM user_pet_categories c \
                 WHERE c.user_id = u.id AND c.category_id IN ({}))",
                placeholders(1, filter.pet_categories.len())
            ));
        }
        query.push_str(" ORDER BY u.id");

        let mut statement = sqlx::query(&query);
        for category in &filter.pet_categories {
            statement = statement.bind(category);
        }

        let rows = statement
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to resolve broadcast users: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("id").map_err(DbError::from))
            .collect()
    }

    async fn find_notification_settings(
        &self,
        user_id: &str,
    ) -> Result<Option<NotificationSettings>, DbError> {
        debug!("Fetching notification settings of user: {}", user_id);

        let row = sqlx::query("SELECT settings FROM notification_settings WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to fetch notification settings of {}: {}", user_id, e);
                DbError::QueryError(e.to_string())
            })?;

        match row {
            Some(row) => {
                let settings: String = row.try_get("settings")?;
                Ok(Some(from_json_text(&settings)?))
            }
            None => Ok(None),
        }
    }

    async fn save_notification_settings(
        &self,
        user_id: &str,
        settings: &NotificationSettings,
    ) -> Result<(), DbError> {
        debug!("Saving notification settings of user: {}", user_id);

        let query = r#"
            INSERT INTO notification_settings (user_id, settings, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET settings = $2, updated_at = $3
        "#;

        sqlx::query(query)
            .bind(user_id)
            .bind(to_json_text(settings)?)
            .bind(to_millis(Utc::now()))
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to save notification settings of {}: {}", user_id, e);
                DbError::QueryError(e.to_string())
            })?;

        Ok(())
    }
}
