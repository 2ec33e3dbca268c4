//! Service factory
//!
//! Builds the database handle, the push delivery capability and the
//! notification service once at start-up. Everything else receives them as
//! `Arc` handles.

use std::sync::Arc;

use jivbook_common::services::{BoxedPushDelivery, DisabledPushDelivery, DynPushDelivery};
use jivbook_common::JivbookError;
use jivbook_config::AppConfig;
use jivbook_db::{
    DbClient, DeviceTokenRepository, NotificationRepository, RepositoryFactory,
    SqlDeviceTokenRepository, SqlNotificationRepository, SqlRepositoryFactory, SqlUserDirectory,
    UserDirectory,
};
use jivbook_firebase::{FirebaseClient, FirebasePushAdapter};
use jivbook_notifications::{NotificationScheduler, NotificationService, ServiceSettings};
use tracing::{error, info, warn};

const IN_MEMORY_DATABASE: &str = "sqlite::memory:";

pub struct JivbookServiceFactory {
    config: Arc<AppConfig>,
    db_client: DbClient,
    push: DynPushDelivery,
}

impl JivbookServiceFactory {
    /// Connects the database, creates the schema and picks the push provider.
    pub async fn new(config: Arc<AppConfig>) -> Result<Self, JivbookError> {
        let db_client = match config.database.as_ref() {
            Some(database) => DbClient::from_config(database).await?,
            None => {
                warn!("No database configured, using an in-memory SQLite database");
                DbClient::from_url(IN_MEMORY_DATABASE).await?
            }
        };

        let factory = SqlRepositoryFactory;
        let devices: SqlDeviceTokenRepository = factory.create_repository(db_client.clone());
        let notifications: SqlNotificationRepository =
            factory.create_repository(db_client.clone());
        let users: SqlUserDirectory = factory.create_repository(db_client.clone());
        devices.init_schema().await?;
        notifications.init_schema().await?;
        users.init_schema().await?;

        let push = Self::push_delivery(&config, devices, notifications);

        Ok(Self {
            config,
            db_client,
            push,
        })
    }

    fn push_delivery(
        config: &AppConfig,
        devices: SqlDeviceTokenRepository,
        notifications: SqlNotificationRepository,
    ) -> DynPushDelivery {
        let firebase = match config.firebase.as_ref() {
            Some(firebase) if config.use_firebase => firebase,
            _ => {
                info!("Firebase disabled, push notifications will not be delivered");
                return Arc::new(DisabledPushDelivery);
            }
        };

        match FirebaseClient::new(firebase) {
            Ok(client) => {
                info!("Firebase push delivery enabled for project {}", client.project_id());
                let adapter =
                    FirebasePushAdapter::new(Arc::new(client), devices, notifications, firebase);
                Arc::new(BoxedPushDelivery(adapter))
            }
            Err(err) => {
                error!("Failed to initialize Firebase, push delivery disabled: {}", err);
                Arc::new(DisabledPushDelivery)
            }
        }
    }

    pub fn db_client(&self) -> &DbClient {
        &self.db_client
    }

    pub fn push_delivery_handle(&self) -> DynPushDelivery {
        Arc::clone(&self.push)
    }

    pub fn notification_service(&self) -> Arc<NotificationService> {
        let factory = SqlRepositoryFactory;
        Arc::new(NotificationService::new(
            factory.create_repository(self.db_client.clone()),
            factory.create_repository(self.db_client.clone()),
            factory.create_repository(self.db_client.clone()),
            self.push_delivery_handle(),
            ServiceSettings::from(&self.config.notifications),
        ))
    }

    /// `None` when the background jobs are switched off.
    pub fn scheduler(
        &self,
        service: Arc<NotificationService>,
    ) -> Option<Arc<NotificationScheduler>> {
        if !self.config.notifications.scheduler_enabled {
            info!("Notification scheduler disabled by configuration");
            return None;
        }
        Some(Arc::new(NotificationScheduler::from_config(
            service,
            &self.config.notifications,
        )))
    }
}
