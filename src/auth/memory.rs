//! In-memory auth service.

use async_trait::async_trait;
use jiff::Timestamp;

use crate::{
    auth::{
        errors::AuthServiceError,
        models::{AdminContext, AdminKey, AdminKeyUuid, RawAdminKey},
        service::AuthService,
    },
    memory::MemoryDb,
};

/// Auth service over the in-memory backend.
#[derive(Debug, Clone)]
pub struct MemoryAuthService {
    db: MemoryDb,
}

impl MemoryAuthService {
    #[must_use]
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }

    /// Mark a key as revoked so later authorizations fail.
    pub fn revoke(&self, key: &RawAdminKey) {
        let mut state = self.db.write();

        if let Some(stored) = state.admin_keys.get_mut(&key.hash()) {
            stored.revoked_at = Some(Timestamp::now());
        }
    }
}

#[async_trait]
impl AuthService for MemoryAuthService {
    async fn authorize_admin(&self, key: &RawAdminKey) -> Result<AdminContext, AuthServiceError> {
        let state = self.db.read();

        match state.admin_keys.get(&key.hash()) {
            Some(stored) if !stored.is_revoked() => Ok(AdminContext::issue()),
            _ => Err(AuthServiceError::Unauthorized),
        }
    }

    async fn create_key(
        &self,
        label: &str,
        key: &RawAdminKey,
    ) -> Result<AdminKey, AuthServiceError> {
        let mut state = self.db.write();

        let key_hash = key.hash();

        if state.admin_keys.contains_key(&key_hash) {
            return Err(AuthServiceError::AlreadyExists);
        }

        let created = AdminKey {
            uuid: AdminKeyUuid::new(),
            key_hash: key_hash.clone(),
            label: label.to_string(),
            created_at: Timestamp::now(),
            revoked_at: None,
        };

        state.admin_keys.insert(key_hash, created.clone());

        Ok(created)
    }
}
