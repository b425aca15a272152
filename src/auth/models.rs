//! Auth Models

use std::fmt::{Debug, Formatter, Result as FmtResult};

use jiff::Timestamp;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::uuids::TypedUuid;

/// Admin key UUID
pub type AdminKeyUuid = TypedUuid<AdminKey>;

/// A provisioned admin key. Only the hash is ever stored.
#[derive(Debug, Clone)]
pub struct AdminKey {
    pub uuid: AdminKeyUuid,
    pub key_hash: String,
    pub label: String,
    pub created_at: Timestamp,
    pub revoked_at: Option<Timestamp>,
}

impl AdminKey {
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

/// Raw admin key material presented by a caller. Zeroed on drop.
pub struct RawAdminKey(Zeroizing<String>);

impl RawAdminKey {
    #[must_use]
    pub fn new(key: String) -> Self {
        Self(Zeroizing::new(key))
    }

    /// Hash of the raw material, as stored in `admin_keys.key_hash`.
    #[must_use]
    pub fn hash(&self) -> String {
        hash_key(&self.0)
    }
}

impl Debug for RawAdminKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("RawAdminKey(..)")
    }
}

/// Hash raw key material for storage and comparison.
#[must_use]
pub fn hash_key(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.as_bytes()))
}

/// Proof that the caller presented a valid, unrevoked admin key.
///
/// Only the auth services construct one, so holding it is what gates
/// catalog writes and order administration.
#[derive(Debug, Clone, Copy)]
pub struct AdminContext {
    _private: (),
}

impl AdminContext {
    pub(crate) const fn issue() -> Self {
        Self { _private: () }
    }
}
