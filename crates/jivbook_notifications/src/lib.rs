// Push notifications for Jivbook: sending, scheduling, inbox and background jobs
pub mod auth;
pub mod doc;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod schedule;
#[cfg(test)]
mod schedule_proptest;
pub mod scheduler;
pub mod service;
#[cfg(test)]
mod service_test;

pub use error::NotificationError;
pub use events::NotificationEvent;
pub use handlers::NotificationState;
pub use models::{
    Audience, NotificationAnalytics, NotificationListing, ProcessReport, SendReport,
    ServiceSettings, UserNotifications,
};
pub use routes::routes;
pub use schedule::JobSchedule;
pub use scheduler::{Job, JobStatus, NotificationScheduler};
pub use service::NotificationService;
