//! Items Repository

use std::str::FromStr;

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::catalog::models::{AvailabilityStatus, Item, ItemUpdate, ItemUuid, NewItem};

const LIST_ITEMS_SQL: &str = include_str!("sql/list_items.sql");
const GET_ITEM_SQL: &str = include_str!("sql/get_item.sql");
const CREATE_ITEM_SQL: &str = include_str!("sql/create_item.sql");
const UPDATE_ITEM_SQL: &str = include_str!("sql/update_item.sql");
const DELETE_ITEM_SQL: &str = include_str!("sql/delete_item.sql");
const DECREMENT_STOCK_SQL: &str = include_str!("sql/decrement_stock.sql");
const ITEM_EXISTS_SQL: &str = include_str!("sql/item_exists.sql");
const SET_AVAILABILITY_SQL: &str = include_str!("sql/set_availability.sql");

/// Result of a successful conditional stock decrement.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StockDecrement {
    /// Quantity remaining after the decrement.
    pub stock_quantity: u32,
    /// Status as it was before any derivation.
    pub availability_status: AvailabilityStatus,
    /// Authoritative price at decrement time.
    pub price: u64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCatalogRepository;

impl PgCatalogRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn list_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<Item>, sqlx::Error> {
        query_as::<Postgres, Item>(LIST_ITEMS_SQL)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn get_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: ItemUuid,
    ) -> Result<Item, sqlx::Error> {
        query_as::<Postgres, Item>(GET_ITEM_SQL)
            .bind(item.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn create_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: NewItem,
    ) -> Result<Item, sqlx::Error> {
        query_as::<Postgres, Item>(CREATE_ITEM_SQL)
            .bind(item.uuid.into_uuid())
            .bind(item.tag_number)
            .bind(item.breed)
            .bind(item.age)
            .bind(item.weight)
            .bind(try_to_i64(item.price, "price")?)
            .bind(i64::from(item.stock_quantity))
            .bind(item.availability_status.as_str())
            .bind(item.health_notes)
            .bind(item.images)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn update_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: ItemUuid,
        update: ItemUpdate,
    ) -> Result<Item, sqlx::Error> {
        query_as::<Postgres, Item>(UPDATE_ITEM_SQL)
            .bind(item.into_uuid())
            .bind(update.tag_number)
            .bind(update.breed)
            .bind(update.age)
            .bind(update.weight)
            .bind(try_to_i64(update.price, "price")?)
            .bind(i64::from(update.stock_quantity))
            .bind(update.availability_status.as_str())
            .bind(update.health_notes)
            .bind(update.images)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn delete_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: ItemUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_ITEM_SQL)
            .bind(item.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Decrement stock by one unit if at least one unit remains.
    ///
    /// `None` means the row either does not exist or is already at zero;
    /// the caller distinguishes the two via [`Self::item_exists`].
    pub(crate) async fn decrement_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: ItemUuid,
    ) -> Result<Option<StockDecrement>, sqlx::Error> {
        let row = query(DECREMENT_STOCK_SQL)
            .bind(item.into_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        row.map(|row| {
            Ok(StockDecrement {
                stock_quantity: try_get_quantity(&row, "stock_quantity")?,
                availability_status: try_get_status(&row, "availability_status")?,
                price: try_get_amount(&row, "price")?,
            })
        })
        .transpose()
    }

    pub(crate) async fn item_exists(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: ItemUuid,
    ) -> Result<bool, sqlx::Error> {
        let row = query(ITEM_EXISTS_SQL)
            .bind(item.into_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        Ok(row.is_some())
    }

    pub(crate) async fn set_availability(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: ItemUuid,
        status: AvailabilityStatus,
    ) -> Result<(), sqlx::Error> {
        query(SET_AVAILABILITY_SQL)
            .bind(item.into_uuid())
            .bind(status.as_str())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}

impl<'r> FromRow<'r, PgRow> for Item {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: ItemUuid::from_uuid(row.try_get("uuid")?),
            tag_number: row.try_get("tag_number")?,
            breed: row.try_get("breed")?,
            age: row.try_get("age")?,
            weight: row.try_get("weight")?,
            price: try_get_amount(row, "price")?,
            stock_quantity: try_get_quantity(row, "stock_quantity")?,
            availability_status: try_get_status(row, "availability_status")?,
            health_notes: row.try_get("health_notes")?,
            images: row.try_get("images")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

pub(crate) fn try_get_amount(row: &PgRow, col: &str) -> Result<u64, sqlx::Error> {
    let amount_i64: i64 = row.try_get(col)?;

    u64::try_from(amount_i64).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn try_get_quantity(row: &PgRow, col: &str) -> Result<u32, sqlx::Error> {
    let quantity_i32: i32 = row.try_get(col)?;

    u32::try_from(quantity_i32).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn try_get_status(row: &PgRow, col: &str) -> Result<AvailabilityStatus, sqlx::Error> {
    let status: String = row.try_get(col)?;

    AvailabilityStatus::from_str(&status).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn try_to_i64(amount: u64, col: &str) -> Result<i64, sqlx::Error> {
    i64::try_from(amount).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}
