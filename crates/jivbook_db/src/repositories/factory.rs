use crate::repository::RepositoryFactory;
use crate::DbClient;

use super::{SqlDeviceTokenRepository, SqlNotificationRepository, SqlUserDirectory};

/// Builds the SQL repositories from a shared [`DbClient`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlRepositoryFactory;

impl RepositoryFactory<SqlDeviceTokenRepository, DbClient> for SqlRepositoryFactory {
    fn create_repository(&self, client: DbClient) -> SqlDeviceTokenRepository {
        SqlDeviceTokenRepository::new(client)
    }
}

impl RepositoryFactory<SqlNotificationRepository, DbClient> for SqlRepositoryFactory {
    fn create_repository(&self, client: DbClient) -> SqlNotificationRepository {
        SqlNotificationRepository::new(client)
    }
}

impl RepositoryFactory<SqlUserDirectory, DbClient> for SqlRepositoryFactory {
    fn create_repository(&self, client: DbClient) -> SqlUserDirectory {
        SqlUserDirectory::new(client)
    }
}
