//! Orders Repository

use std::str::FromStr;

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::domain::{
    catalog::{
        models::ItemUuid,
        repository::{try_get_amount, try_to_i64},
    },
    orders::models::{
        AdminOrder, BuyerUuid, DeliveryDetails, DeliveryStatus, ItemSummary, Order, OrderUuid,
        PaymentStatus,
    },
};

const GET_ORDERS_BY_REFERENCE_SQL: &str = include_str!("sql/get_orders_by_reference.sql");
const CREATE_ORDER_SQL: &str = include_str!("sql/create_order.sql");
const LIST_ORDERS_FOR_BUYER_SQL: &str = include_str!("sql/list_orders_for_buyer.sql");
const LIST_ALL_ORDERS_SQL: &str = include_str!("sql/list_all_orders.sql");
const UPDATE_DELIVERY_STATUS_SQL: &str = include_str!("sql/update_delivery_status.sql");

/// Column values for one order insert.
#[derive(Debug, Clone)]
pub(crate) struct NewOrderRow<'a> {
    pub uuid: OrderUuid,
    pub buyer_uuid: Option<BuyerUuid>,
    pub contact_email: Option<&'a str>,
    pub item_uuid: ItemUuid,
    pub amount: u64,
    pub payment_reference: &'a str,
    pub payment_status: PaymentStatus,
    pub delivery: &'a DeliveryDetails,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgOrdersRepository;

impl PgOrdersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_orders_by_reference(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        payment_reference: &str,
    ) -> Result<Vec<Order>, sqlx::Error> {
        query_as::<Postgres, Order>(GET_ORDERS_BY_REFERENCE_SQL)
            .bind(payment_reference)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn create_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        row: NewOrderRow<'_>,
    ) -> Result<Order, sqlx::Error> {
        query_as::<Postgres, Order>(CREATE_ORDER_SQL)
            .bind(row.uuid.into_uuid())
            .bind(row.buyer_uuid.map(BuyerUuid::into_uuid))
            .bind(row.contact_email)
            .bind(row.item_uuid.into_uuid())
            .bind(try_to_i64(row.amount, "amount")?)
            .bind(row.payment_reference)
            .bind(row.payment_status.as_str())
            .bind(DeliveryStatus::Processing.as_str())
            .bind(&row.delivery.recipient_name)
            .bind(&row.delivery.phone_number)
            .bind(&row.delivery.delivery_address)
            .bind(row.delivery.region.as_deref())
            .bind(row.delivery.delivery_instructions.as_deref())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list_orders_for_buyer(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        buyer: BuyerUuid,
    ) -> Result<Vec<Order>, sqlx::Error> {
        query_as::<Postgres, Order>(LIST_ORDERS_FOR_BUYER_SQL)
            .bind(buyer.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn list_all_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<AdminOrder>, sqlx::Error> {
        query_as::<Postgres, AdminOrder>(LIST_ALL_ORDERS_SQL)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn update_delivery_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        status: DeliveryStatus,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(UPDATE_DELIVERY_STATUS_SQL)
            .bind(order.into_uuid())
            .bind(status.as_str())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for Order {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: OrderUuid::from_uuid(row.try_get("uuid")?),
            buyer_uuid: row
                .try_get::<Option<Uuid>, _>("buyer_uuid")?
                .map(BuyerUuid::from_uuid),
            contact_email: row.try_get("contact_email")?,
            item_uuid: row
                .try_get::<Option<Uuid>, _>("item_uuid")?
                .map(ItemUuid::from_uuid),
            amount: try_get_amount(row, "amount")?,
            payment_reference: row.try_get("payment_reference")?,
            payment_status: try_get_order_status(row, "payment_status")?,
            delivery_status: try_get_order_status(row, "delivery_status")?,
            delivery: DeliveryDetails {
                recipient_name: row.try_get("recipient_name")?,
                phone_number: row.try_get("phone_number")?,
                delivery_address: row.try_get("delivery_address")?,
                region: row.try_get("region")?,
                delivery_instructions: row.try_get("delivery_instructions")?,
            },
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for AdminOrder {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let order = Order::from_row(row)?;

        let item = row
            .try_get::<Option<String>, _>("item_breed")?
            .map(|breed| -> sqlx::Result<ItemSummary> {
                sqlx::Result::Ok(ItemSummary {
                    breed,
                    tag_number: row.try_get("item_tag_number")?,
                    primary_image: row
                        .try_get::<Option<Vec<String>>, _>("item_images")?
                        .and_then(|images| images.first().cloned()),
                })
            })
            .transpose()?;

        Ok(Self { order, item })
    }
}

fn try_get_order_status<S>(row: &PgRow, col: &str) -> Result<S, sqlx::Error>
where
    S: FromStr,
    S::Err: std::error::Error + Send + Sync + 'static,
{
    let status: String = row.try_get(col)?;

    S::from_str(&status).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}
