//! Persistence for the Jivbook notification subsystem
//!
//! - [`SqlDeviceTokenRepository`]: the device registry (one active push token per device)
//! - [`SqlNotificationRepository`]: the notification record store
//! - [`SqlUserDirectory`]: read access to the user fields broadcasts are targeted by
//!
//! All repositories share one [`DbClient`] around an `sqlx::Any` pool. SQLite is the
//! default backend; PostgreSQL and MySQL are selected with the `postgres` and
//! `mysql` features.
//!
//! # Example
//!
//! ```rust,no_run
//! use jivbook_db::{DbClient, DeviceTokenRepository, RepositoryFactory, SqlDeviceTokenRepository, SqlRepositoryFactory};
//!
//! async fn setup() -> Result<SqlDeviceTokenRepository, jivbook_db::DbError> {
//!     let client = DbClient::from_url("sqlite:data/jivbook.db").await?;
//!     let devices: SqlDeviceTokenRepository = SqlRepositoryFactory.create_repository(client);
//!     devices.init_schema().await?;
//!     Ok(devices)
//! }
//! ```

pub mod client;
mod convert;
pub mod error;
pub mod repositories;
pub mod repository;

pub use client::DbClient;
pub use error::DbError;
pub use repository::RepositoryFactory;

pub use repositories::{
    DeviceTokenRepository, NotificationFilter, NotificationRepository, Page,
    SqlDeviceTokenRepository, SqlNotificationRepository, SqlRepositoryFactory, SqlUserDirectory,
    UserDirectory, UserFilter, UserProfile, UserRole,
};
