//! In-memory catalog service.

use async_trait::async_trait;
use jiff::Timestamp;

use crate::{
    auth::models::AdminContext,
    domain::catalog::{
        errors::CatalogServiceError,
        models::{Item, ItemUpdate, ItemUuid, NewItem},
        service::{CatalogService, validate_price},
    },
    memory::MemoryDb,
};

/// Catalog service over the in-memory backend.
#[derive(Debug, Clone)]
pub struct MemoryCatalogService {
    db: MemoryDb,
}

impl MemoryCatalogService {
    #[must_use]
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogService for MemoryCatalogService {
    async fn list_items(&self) -> Result<Vec<Item>, CatalogServiceError> {
        let state = self.db.read();

        let mut items: Vec<Item> = state.items.values().cloned().collect();
        items.sort_by(|a, b| (b.created_at, b.uuid).cmp(&(a.created_at, a.uuid)));

        Ok(items)
    }

    async fn get_item(&self, item: ItemUuid) -> Result<Item, CatalogServiceError> {
        let state = self.db.read();

        state
            .items
            .get(&item)
            .cloned()
            .ok_or(CatalogServiceError::NotFound)
    }

    async fn create_item(
        &self,
        _admin: &AdminContext,
        item: NewItem,
    ) -> Result<Item, CatalogServiceError> {
        validate_price(item.price)?;

        let mut state = self.db.write();

        if state.items.contains_key(&item.uuid) {
            return Err(CatalogServiceError::AlreadyExists);
        }

        let now = Timestamp::now();
        let created = Item {
            uuid: item.uuid,
            tag_number: item.tag_number,
            breed: item.breed,
            age: item.age,
            weight: item.weight,
            price: item.price,
            stock_quantity: item.stock_quantity,
            availability_status: item.availability_status.derive(item.stock_quantity),
            health_notes: item.health_notes,
            images: item.images,
            created_at: now,
            updated_at: now,
        };

        state.items.insert(created.uuid, created.clone());

        Ok(created)
    }

    async fn update_item(
        &self,
        _admin: &AdminContext,
        item: ItemUuid,
        update: ItemUpdate,
    ) -> Result<Item, CatalogServiceError> {
        validate_price(update.price)?;

        let mut state = self.db.write();

        let existing = state
            .items
            .get_mut(&item)
            .ok_or(CatalogServiceError::NotFound)?;

        existing.tag_number = update.tag_number;
        existing.breed = update.breed;
        existing.age = update.age;
        existing.weight = update.weight;
        existing.price = update.price;
        existing.stock_quantity = update.stock_quantity;
        existing.availability_status = update.availability_status.derive(update.stock_quantity);
        existing.health_notes = update.health_notes;
        existing.images = update.images;
        existing.updated_at = Timestamp::now();

        Ok(existing.clone())
    }

    async fn delete_item(
        &self,
        _admin: &AdminContext,
        item: ItemUuid,
    ) -> Result<(), CatalogServiceError> {
        let mut state = self.db.write();

        if state.items.remove(&item).is_none() {
            return Err(CatalogServiceError::NotFound);
        }

        Ok(())
    }
}
