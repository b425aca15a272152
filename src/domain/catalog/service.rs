//! Catalog service.

use async_trait::async_trait;
use mockall::automock;
use tracing::info;

use crate::{
    auth::models::AdminContext,
    database::Db,
    domain::catalog::{
        errors::CatalogServiceError,
        models::{Item, ItemUpdate, ItemUuid, NewItem},
        repository::PgCatalogRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgCatalogService {
    db: Db,
    repository: PgCatalogRepository,
}

impl PgCatalogService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgCatalogRepository::new(),
        }
    }
}

#[async_trait]
impl CatalogService for PgCatalogService {
    async fn list_items(&self) -> Result<Vec<Item>, CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let items = self.repository.list_items(&mut tx).await?;

        tx.commit().await?;

        Ok(items)
    }

    async fn get_item(&self, item: ItemUuid) -> Result<Item, CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let item = self.repository.get_item(&mut tx, item).await?;

        tx.commit().await?;

        Ok(item)
    }

    #[tracing::instrument(
        name = "catalog.service.create_item",
        skip(self, _admin, item),
        fields(item_uuid = %item.uuid),
        err
    )]
    async fn create_item(
        &self,
        _admin: &AdminContext,
        item: NewItem,
    ) -> Result<Item, CatalogServiceError> {
        validate_price(item.price)?;

        let mut item = item;
        item.availability_status = item.availability_status.derive(item.stock_quantity);

        let mut tx = self.db.begin().await?;

        let created = self.repository.create_item(&mut tx, item).await?;

        tx.commit().await?;

        info!(item_uuid = %created.uuid, "created catalog item");

        Ok(created)
    }

    #[tracing::instrument(
        name = "catalog.service.update_item",
        skip(self, _admin, update),
        fields(item_uuid = %item),
        err
    )]
    async fn update_item(
        &self,
        _admin: &AdminContext,
        item: ItemUuid,
        update: ItemUpdate,
    ) -> Result<Item, CatalogServiceError> {
        validate_price(update.price)?;

        let mut update = update;
        update.availability_status = update.availability_status.derive(update.stock_quantity);

        let mut tx = self.db.begin().await?;

        let updated = self.repository.update_item(&mut tx, item, update).await?;

        tx.commit().await?;

        Ok(updated)
    }

    #[tracing::instrument(
        name = "catalog.service.delete_item",
        skip(self, _admin),
        fields(item_uuid = %item),
        err
    )]
    async fn delete_item(
        &self,
        _admin: &AdminContext,
        item: ItemUuid,
    ) -> Result<(), CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self.repository.delete_item(&mut tx, item).await?;

        if rows_affected == 0 {
            return Err(CatalogServiceError::NotFound);
        }

        tx.commit().await?;

        info!(item_uuid = %item, "deleted catalog item");

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Retrieves all items, newest first.
    async fn list_items(&self) -> Result<Vec<Item>, CatalogServiceError>;

    /// Retrieve a single item.
    async fn get_item(&self, item: ItemUuid) -> Result<Item, CatalogServiceError>;

    /// Creates a new item. The stored status is derived from the stock on
    /// hand before the write.
    async fn create_item(
        &self,
        admin: &AdminContext,
        item: NewItem,
    ) -> Result<Item, CatalogServiceError>;

    /// Replaces an item's fields. Stock written here goes through the same
    /// status derivation as checkout decrements.
    async fn update_item(
        &self,
        admin: &AdminContext,
        item: ItemUuid,
        update: ItemUpdate,
    ) -> Result<Item, CatalogServiceError>;

    /// Hard-deletes an item. Orders that reference it keep their own
    /// history and fall back to a placeholder for display.
    async fn delete_item(
        &self,
        admin: &AdminContext,
        item: ItemUuid,
    ) -> Result<(), CatalogServiceError>;
}

pub(crate) fn validate_price(price: u64) -> Result<(), CatalogServiceError> {
    if price == 0 {
        return Err(CatalogServiceError::InvalidData);
    }

    Ok(())
}
