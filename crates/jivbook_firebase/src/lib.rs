//! Firebase Cloud Messaging push delivery for Jivbook
//!
//! - [`FirebaseClient`]: FCM HTTP v1 sends and Instance ID topic management
//! - [`FirebasePushAdapter`]: the [`PushDelivery`](jivbook_common::services::PushDelivery)
//!   implementation the notification service talks to. It builds the
//!   platform-specific payload, fans a multicast out per token and deactivates
//!   tokens FCM reports as unregistered or invalid.
//!
//! # Example
//!
//! ```rust,no_run
//! use jivbook_config::FirebaseConfig;
//! use jivbook_db::{DbClient, SqlDeviceTokenRepository, SqlNotificationRepository};
//! use jivbook_firebase::{FirebaseClient, FirebasePushAdapter};
//! use std::sync::Arc;
//!
//! async fn build(config: &FirebaseConfig, db: DbClient) -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(FirebaseClient::new(config)?);
//!     let _adapter = FirebasePushAdapter::new(
//!         client,
//!         SqlDeviceTokenRepository::new(db.clone()),
//!         SqlNotificationRepository::new(db),
//!         config,
//!     );
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod auth;
pub mod client;
pub mod message;
pub mod models;


pub use adapter::{FirebasePushAdapter, MAX_MULTICAST_TOKENS};
pub use auth::AccessTokenProvider;
pub use client::{FirebaseClient, FirebaseError};
