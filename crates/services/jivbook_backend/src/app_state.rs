use std::sync::Arc;

use jivbook_common::JivbookError;
use jivbook_config::AppConfig;
use jivbook_notifications::{NotificationScheduler, NotificationState};

use crate::service_factory::JivbookServiceFactory;

/// State shared by the whole application.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub service_factory: Arc<JivbookServiceFactory>,
    pub notifications: NotificationState,
}

impl AppState {
    /// Wires the services together. Background jobs are created but not started.
    pub async fn new(config: Arc<AppConfig>) -> Result<Self, JivbookError> {
        let service_factory = Arc::new(JivbookServiceFactory::new(config.clone()).await?);
        let service = service_factory.notification_service();
        let scheduler = service_factory.scheduler(Arc::clone(&service));

        Ok(Self {
            config,
            service_factory,
            notifications: NotificationState { service, scheduler },
        })
    }

    pub fn scheduler(&self) -> Option<&Arc<NotificationScheduler>> {
        self.notifications.scheduler.as_ref()
    }
}
