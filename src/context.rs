//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    auth::{AuthService, MemoryAuthService, PgAuthService},
    database::{self, Db},
    domain::{
        catalog::{CatalogService, MemoryCatalogService, PgCatalogService},
        orders::{MemoryOrdersService, OrdersService, PgOrdersService},
    },
    memory::MemoryDb,
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),
}

#[derive(Clone)]
pub struct AppContext {
    pub auth: Arc<dyn AuthService>,
    pub catalog: Arc<dyn CatalogService>,
    pub orders: Arc<dyn OrdersService>,
}

impl AppContext {
    /// Build application context from a database URL.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection fails.
    pub async fn from_database_url(url: &str) -> Result<Self, AppInitError> {
        let pool = database::connect(url).await.map_err(AppInitError::Database)?;

        let db = Db::new(pool);

        Ok(Self {
            auth: Arc::new(PgAuthService::new(db.clone())),
            catalog: Arc::new(PgCatalogService::new(db.clone())),
            orders: Arc::new(PgOrdersService::new(db)),
        })
    }

    /// Context over the in-memory backend, for tests and local runs.
    #[must_use]
    pub fn in_memory() -> Self {
        let db = MemoryDb::new();

        Self {
            auth: Arc::new(MemoryAuthService::new(db.clone())),
            catalog: Arc::new(MemoryCatalogService::new(db.clone())),
            orders: Arc::new(MemoryOrdersService::new(db)),
        }
    }
}
