//! Orders service.

use async_trait::async_trait;
use mockall::automock;
use tracing::info;

use crate::{
    auth::models::AdminContext,
    database::Db,
    domain::{
        catalog::repository::PgCatalogRepository,
        orders::{
            errors::{OrdersServiceError, is_unique_violation},
            models::{
                AdminOrder, BuyerUuid, CheckoutCommit, CommitReceipt, DeliveryStatus, Order,
                OrderUuid, PaymentStatus, PricePolicy,
            },
            repository::{NewOrderRow, PgOrdersRepository},
        },
    },
};

#[derive(Debug, Clone)]
pub struct PgOrdersService {
    db: Db,
    orders: PgOrdersRepository,
    catalog: PgCatalogRepository,
    price_policy: PricePolicy,
}

impl PgOrdersService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self::with_price_policy(db, PricePolicy::default())
    }

    #[must_use]
    pub fn with_price_policy(db: Db, price_policy: PricePolicy) -> Self {
        Self {
            db,
            orders: PgOrdersRepository::new(),
            catalog: PgCatalogRepository::new(),
            price_policy,
        }
    }

    async fn try_commit(
        &self,
        commit: &CheckoutCommit,
    ) -> Result<CommitReceipt, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let existing = self
            .orders
            .get_orders_by_reference(&mut tx, &commit.payment_reference)
            .await?;

        if !existing.is_empty() {
            tx.commit().await?;

            info!(
                payment_reference = %commit.payment_reference,
                "replaying already-committed payment reference"
            );

            return Ok(CommitReceipt {
                order_uuids: existing.iter().map(|o| o.uuid).collect(),
                replayed: true,
            });
        }

        let mut decremented = Vec::with_capacity(commit.lines.len());
        let mut out_of_stock = Vec::new();
        let mut missing = Vec::new();

        for line in &commit.lines {
            match self.catalog.decrement_stock(&mut tx, line.item_uuid).await? {
                Some(decrement) => decremented.push((line, decrement)),
                None => {
                    if self.catalog.item_exists(&mut tx, line.item_uuid).await? {
                        out_of_stock.push(line.item_uuid);
                    } else {
                        missing.push(line.item_uuid);
                    }
                }
            }
        }

        // Dropping the transaction rolls back every decrement applied so
        // far: the commit is all-or-nothing across its lines.
        if !missing.is_empty() {
            return Err(OrdersServiceError::ItemNotFound { items: missing });
        }

        if !out_of_stock.is_empty() {
            return Err(OrdersServiceError::OutOfStock {
                items: out_of_stock,
            });
        }

        let mut order_uuids = Vec::with_capacity(decremented.len());

        for (line, decrement) in decremented {
            let derived = decrement
                .availability_status
                .derive(decrement.stock_quantity);

            if derived != decrement.availability_status {
                self.catalog
                    .set_availability(&mut tx, line.item_uuid, derived)
                    .await?;
            }

            let amount = match self.price_policy {
                PricePolicy::CatalogPrice => decrement.price,
                PricePolicy::QuotedPrice => line.quoted_price,
            };

            let order = self
                .orders
                .create_order(
                    &mut tx,
                    NewOrderRow {
                        uuid: OrderUuid::new(),
                        buyer_uuid: commit.buyer_uuid,
                        contact_email: commit.contact_email.as_deref(),
                        item_uuid: line.item_uuid,
                        amount,
                        payment_reference: &commit.payment_reference,
                        payment_status: PaymentStatus::Successful,
                        delivery: &commit.delivery,
                    },
                )
                .await?;

            order_uuids.push(order.uuid);
        }

        tx.commit().await?;

        info!(
            payment_reference = %commit.payment_reference,
            orders = order_uuids.len(),
            "committed checkout"
        );

        Ok(CommitReceipt {
            order_uuids,
            replayed: false,
        })
    }

    /// A concurrent commit with the same reference won the race: fetch
    /// and return its result instead.
    async fn replay_existing(
        &self,
        payment_reference: &str,
    ) -> Result<CommitReceipt, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let existing = self
            .orders
            .get_orders_by_reference(&mut tx, payment_reference)
            .await?;

        tx.commit().await?;

        Ok(CommitReceipt {
            order_uuids: existing.iter().map(|o| o.uuid).collect(),
            replayed: true,
        })
    }
}

#[async_trait]
impl OrdersService for PgOrdersService {
    #[tracing::instrument(
        name = "orders.service.commit_checkout",
        skip(self, commit),
        fields(
            payment_reference = %commit.payment_reference,
            line_count = commit.lines.len()
        ),
        err
    )]
    async fn commit_checkout(
        &self,
        commit: CheckoutCommit,
    ) -> Result<CommitReceipt, OrdersServiceError> {
        if commit.lines.is_empty() {
            return Err(OrdersServiceError::EmptyCheckout);
        }

        match self.try_commit(&commit).await {
            Ok(receipt) => Ok(receipt),
            Err(error) if is_unique_violation(&error) => {
                self.replay_existing(&commit.payment_reference).await
            }
            // A concurrent commit with the same reference may consume the
            // stock before this one gets the row lock; the rejection is
            // only real if no orders exist for the reference afterwards.
            Err(
                error @ (OrdersServiceError::OutOfStock { .. }
                | OrdersServiceError::ItemNotFound { .. }),
            ) => {
                let replay = self.replay_existing(&commit.payment_reference).await?;

                if replay.order_uuids.is_empty() {
                    Err(error)
                } else {
                    Ok(replay)
                }
            }
            Err(error) => Err(error),
        }
    }

    async fn list_for_buyer(&self, buyer: BuyerUuid) -> Result<Vec<Order>, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let orders = self.orders.list_orders_for_buyer(&mut tx, buyer).await?;

        tx.commit().await?;

        Ok(orders)
    }

    async fn list_all(&self, _admin: &AdminContext) -> Result<Vec<AdminOrder>, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let orders = self.orders.list_all_orders(&mut tx).await?;

        tx.commit().await?;

        Ok(orders)
    }

    #[tracing::instrument(
        name = "orders.service.update_delivery_status",
        skip(self, _admin),
        fields(order_uuid = %order, status = %status),
        err
    )]
    async fn update_delivery_status(
        &self,
        _admin: &AdminContext,
        order: OrderUuid,
        status: DeliveryStatus,
    ) -> Result<(), OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self
            .orders
            .update_delivery_status(&mut tx, order, status)
            .await?;

        if rows_affected == 0 {
            return Err(OrdersServiceError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait OrdersService: Send + Sync {
    /// Convert one confirmed payment into order rows and conditional
    /// stock decrements, atomically.
    ///
    /// The payment reference is the idempotency key: committing a
    /// reference that already has orders returns the prior receipt
    /// without touching stock. Within one commit, either every line's
    /// decrement and insert applies or none does.
    async fn commit_checkout(
        &self,
        commit: CheckoutCommit,
    ) -> Result<CommitReceipt, OrdersServiceError>;

    /// All orders placed by a buyer, newest first. Guests hold no buyer
    /// id and therefore have no listing; they keep the synchronous
    /// receipt from the commit instead.
    async fn list_for_buyer(&self, buyer: BuyerUuid) -> Result<Vec<Order>, OrdersServiceError>;

    /// Every order joined with its item's display data, newest first.
    /// Hard-deleted items surface as [`AdminOrder::display_breed`]
    /// "Unknown".
    async fn list_all(&self, admin: &AdminContext) -> Result<Vec<AdminOrder>, OrdersServiceError>;

    /// Point the delivery state at a new value. Transitions are not
    /// validated; stock, price, and payment fields are never touched.
    async fn update_delivery_status(
        &self,
        admin: &AdminContext,
        order: OrderUuid,
        status: DeliveryStatus,
    ) -> Result<(), OrdersServiceError>;
}
