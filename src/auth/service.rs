//! Auth service.

use async_trait::async_trait;
use mockall::automock;
use tracing::{info, warn};

use crate::{
    auth::{
        errors::AuthServiceError,
        models::{AdminContext, AdminKey, AdminKeyUuid, RawAdminKey},
        repository::PgAuthRepository,
    },
    database::Db,
};

#[derive(Debug, Clone)]
pub struct PgAuthService {
    db: Db,
    repository: PgAuthRepository,
}

impl PgAuthService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgAuthRepository::new(),
        }
    }
}

#[async_trait]
impl AuthService for PgAuthService {
    async fn authorize_admin(&self, key: &RawAdminKey) -> Result<AdminContext, AuthServiceError> {
        let mut tx = self.db.begin().await?;

        let stored = self.repository.get_key_by_hash(&mut tx, &key.hash()).await?;

        tx.commit().await?;

        match stored {
            Some(stored) if !stored.is_revoked() => Ok(AdminContext::issue()),
            Some(stored) => {
                warn!(key_uuid = %stored.uuid, "rejected revoked admin key");
                Err(AuthServiceError::Unauthorized)
            }
            None => Err(AuthServiceError::Unauthorized),
        }
    }

    async fn create_key(
        &self,
        label: &str,
        key: &RawAdminKey,
    ) -> Result<AdminKey, AuthServiceError> {
        let mut tx = self.db.begin().await?;

        let created = self
            .repository
            .create_key(&mut tx, AdminKeyUuid::new(), &key.hash(), label)
            .await?;

        tx.commit().await?;

        info!(key_uuid = %created.uuid, label, "provisioned admin key");

        Ok(created)
    }
}

#[automock]
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Verify the presented key material against stored admin keys.
    ///
    /// The check runs fresh on every call; nothing client-side is cached
    /// or trusted.
    async fn authorize_admin(&self, key: &RawAdminKey) -> Result<AdminContext, AuthServiceError>;

    /// Provision a new admin key under the given label.
    async fn create_key(
        &self,
        label: &str,
        key: &RawAdminKey,
    ) -> Result<AdminKey, AuthServiceError>;
}
