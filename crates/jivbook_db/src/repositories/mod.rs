//! Repositories for the notification subsystem

pub mod device_token;
pub mod device_token_sql;
pub mod factory;
pub mod notification;
pub mod notification_sql;
pub mod user_directory;
pub mod user_directory_sql;

#[cfg(test)]
mod device_token_test;
#[cfg(test)]
mod user_directory_test;

pub use device_token::DeviceTokenRepository;
pub use device_token_sql::SqlDeviceTokenRepository;
pub use factory::SqlRepositoryFactory;
pub use notification::{NotificationFilter, NotificationRepository, Page};
pub use notification_sql::SqlNotificationRepository;
pub use user_directory::{UserDirectory, UserFilter, UserProfile, UserRole};
pub use user_directory_sql::SqlUserDirectory;
