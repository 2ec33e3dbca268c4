//! Read model of the users table used to resolve broadcast audiences, plus the
//! notification preferences each user keeps with this service.
//!
//! The users table belongs to the account service. This repository only reads
//! the admin/premium flags and the preferred pet categories, and can upsert that
//! slice for seeding.

use std::future::Future;

use jivbook_common::models::{NotificationSettings, TargetFilters};

use crate::error::DbError;

/// The part of a user profile that broadcast targeting looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub is_admin: bool,
    pub is_premium: bool,
    pub preferred_pet_categories: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Admin,
    Premium,
}

/// Which users a broadcast goes to. The default matches everyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    /// Users with at least one of these preferred categories.
    pub pet_categories: Vec<String>,
}

impl UserFilter {
    /// Derives the user query from broadcast target filters.
    ///
    /// `admin` in the user types wins over `premium`; other user types, locations
    /// and the age range do not narrow the audience.
    pub fn from_target_filters(filters: &TargetFilters) -> Self {
        let has_type = |wanted: &str| filters.user_types.iter().any(|t| t == wanted);
        let role = if has_type("admin") {
            Some(UserRole::Admin)
        } else if has_type("premium") {
            Some(UserRole::Premium)
        } else {
            None
        };

        Self {
            role,
            pet_categories: filters.pet_categories.clone(),
        }
    }
}

/// Repository for user targeting data
pub trait UserDirectory {
    /// Create the `users`, `user_pet_categories` and `notification_settings`
    /// tables if they don't already exist
    fn init_schema(&self) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Insert or replace the targeting slice of one profile
    fn upsert_user(
        &self,
        profile: UserProfile,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Ids of every user matching `filter`, in id order
    fn find_user_ids(
        &self,
        filter: &UserFilter,
    ) -> impl Future<Output = Result<Vec<String>, DbError>> + Send;

    /// Stored preferences of a user, `None` if they never saved any
    fn find_notification_settings(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<NotificationSettings>, DbError>> + Send;

    /// Replace the stored preferences of a user
    fn save_notification_settings(
        &self,
        user_id: &str,
        settings: &NotificationSettings,
    ) -> impl Future<Output = Result<(), DbError>> + Send;
}
