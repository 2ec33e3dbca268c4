//! Device registry
//!
//! Stores one push token per app installation. The registry guarantees at most one
//! *active* token per `(user, device)` pair; dead tokens are deactivated rather than
//! deleted and only purged by the periodic cleaner.

use chrono::{DateTime, Utc};
use std::future::Future;

use crate::error::DbError;

pub use jivbook_common::models::{DeviceInfo, DeviceRegistration, DeviceToken, Platform};

/// Repository for device tokens
pub trait DeviceTokenRepository {
    /// Create the `device_tokens` table and its indexes if they don't already exist
    fn init_schema(&self) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Register a device
    ///
    /// Upserts by token value: an existing record is handed to the new owner/device,
    /// its metadata replaced and reactivated; otherwise a new active record is created.
    /// Afterwards every *other* token of the same `(user, device)` is deactivated.
    /// The two writes are not wrapped in a transaction.
    ///
    /// # Returns
    ///
    /// The stored, active device token
    fn register_device(
        &self,
        registration: DeviceRegistration,
    ) -> impl Future<Output = Result<DeviceToken, DbError>> + Send;

    /// Deactivate `token` if it belongs to `user_id`
    ///
    /// # Returns
    ///
    /// `true` if a record was changed. Unknown tokens are not an error.
    fn unregister_device(
        &self,
        user_id: &str,
        token: &str,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    fn find_by_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<DeviceToken>, DbError>> + Send;

    /// All active tokens of one user
    fn find_active_by_user(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<DeviceToken>, DbError>> + Send;

    /// All active tokens of a set of users, optionally restricted to `platforms`
    ///
    /// An empty `platforms` slice means every platform.
    fn find_active_by_users(
        &self,
        user_ids: &[String],
        platforms: &[Platform],
    ) -> impl Future<Output = Result<Vec<DeviceToken>, DbError>> + Send;

    /// Mark the given tokens inactive, returning how many records changed
    fn deactivate_tokens(
        &self,
        tokens: &[String],
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Hard-delete tokens that are inactive or were last used before `cutoff`
    fn delete_stale(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;
}
