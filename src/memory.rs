//! In-memory storage backend.
//!
//! Mirrors the Postgres schema for tests and local development. Every
//! mutation runs inside a single lock, which linearizes commits exactly
//! the way row-level locks do in the Postgres backend.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rustc_hash::FxHashMap;

use crate::{
    auth::models::AdminKey,
    domain::{
        catalog::models::{Item, ItemUuid},
        orders::models::Order,
    },
};

#[derive(Debug, Default)]
pub(crate) struct MemoryState {
    pub(crate) items: FxHashMap<ItemUuid, Item>,
    pub(crate) orders: Vec<Order>,
    /// Admin keys indexed by key hash.
    pub(crate) admin_keys: FxHashMap<String, AdminKey>,
}

/// Shared handle to the in-memory backend.
///
/// Cloning is cheap; clones see the same state. The counterpart of
/// [`crate::database::Db`] for the memory-backed service implementations.
#[derive(Debug, Clone, Default)]
pub struct MemoryDb {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryDb {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
