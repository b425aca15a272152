//! In-memory orders service.

use async_trait::async_trait;
use jiff::Timestamp;
use rustc_hash::FxHashMap;

use crate::{
    auth::models::AdminContext,
    domain::{
        catalog::models::ItemUuid,
        orders::{
            errors::OrdersServiceError,
            models::{
                AdminOrder, BuyerUuid, CheckoutCommit, CommitReceipt, DeliveryStatus, ItemSummary,
                Order, OrderUuid, PaymentStatus, PricePolicy,
            },
            service::OrdersService,
        },
    },
    memory::MemoryDb,
};

/// Orders service over the in-memory backend.
///
/// The whole commit runs inside one write lock, which gives the same
/// all-or-nothing, no-interleaving guarantees the Postgres transaction
/// provides.
#[derive(Debug, Clone)]
pub struct MemoryOrdersService {
    db: MemoryDb,
    price_policy: PricePolicy,
}

impl MemoryOrdersService {
    #[must_use]
    pub fn new(db: MemoryDb) -> Self {
        Self::with_price_policy(db, PricePolicy::default())
    }

    #[must_use]
    pub fn with_price_policy(db: MemoryDb, price_policy: PricePolicy) -> Self {
        Self { db, price_policy }
    }
}

#[async_trait]
impl OrdersService for MemoryOrdersService {
    async fn commit_checkout(
        &self,
        commit: CheckoutCommit,
    ) -> Result<CommitReceipt, OrdersServiceError> {
        if commit.lines.is_empty() {
            return Err(OrdersServiceError::EmptyCheckout);
        }

        let mut guard = self.db.write();
        let state = &mut *guard;

        let existing: Vec<OrderUuid> = state
            .orders
            .iter()
            .filter(|o| o.payment_reference == commit.payment_reference)
            .map(|o| o.uuid)
            .collect();

        if !existing.is_empty() {
            return Ok(CommitReceipt {
                order_uuids: existing,
                replayed: true,
            });
        }

        // Validate every line before touching anything, so a failing line
        // leaves no partial mutation behind.
        let mut required: FxHashMap<ItemUuid, u32> = FxHashMap::default();
        for line in &commit.lines {
            *required.entry(line.item_uuid).or_insert(0) += 1;
        }

        let mut missing = Vec::new();
        let mut out_of_stock = Vec::new();

        for (&item, &need) in &required {
            match state.items.get(&item) {
                None => missing.push(item),
                Some(stored) if stored.stock_quantity < need => out_of_stock.push(item),
                Some(_) => {}
            }
        }

        missing.sort_unstable();
        out_of_stock.sort_unstable();

        if !missing.is_empty() {
            return Err(OrdersServiceError::ItemNotFound { items: missing });
        }

        if !out_of_stock.is_empty() {
            return Err(OrdersServiceError::OutOfStock {
                items: out_of_stock,
            });
        }

        let now = Timestamp::now();
        let mut created = Vec::with_capacity(commit.lines.len());

        for line in &commit.lines {
            if let Some(item) = state.items.get_mut(&line.item_uuid) {
                item.stock_quantity -= 1;
                item.availability_status = item.availability_status.derive(item.stock_quantity);
                item.updated_at = now;

                let amount = match self.price_policy {
                    PricePolicy::CatalogPrice => item.price,
                    PricePolicy::QuotedPrice => line.quoted_price,
                };

                created.push(Order {
                    uuid: OrderUuid::new(),
                    buyer_uuid: commit.buyer_uuid,
                    contact_email: commit.contact_email.clone(),
                    item_uuid: Some(line.item_uuid),
                    amount,
                    payment_reference: commit.payment_reference.clone(),
                    payment_status: PaymentStatus::Successful,
                    delivery_status: DeliveryStatus::Processing,
                    delivery: commit.delivery.clone(),
                    created_at: now,
                });
            }
        }

        let order_uuids = created.iter().map(|o| o.uuid).collect();
        state.orders.extend(created);

        Ok(CommitReceipt {
            order_uuids,
            replayed: false,
        })
    }

    async fn list_for_buyer(&self, buyer: BuyerUuid) -> Result<Vec<Order>, OrdersServiceError> {
        let state = self.db.read();

        let mut orders: Vec<Order> = state
            .orders
            .iter()
            .filter(|o| o.buyer_uuid == Some(buyer))
            .cloned()
            .collect();
        orders.sort_by(|a, b| (b.created_at, b.uuid).cmp(&(a.created_at, a.uuid)));

        Ok(orders)
    }

    async fn list_all(&self, _admin: &AdminContext) -> Result<Vec<AdminOrder>, OrdersServiceError> {
        let state = self.db.read();

        let mut orders: Vec<Order> = state.orders.clone();
        orders.sort_by(|a, b| (b.created_at, b.uuid).cmp(&(a.created_at, a.uuid)));

        Ok(orders
            .into_iter()
            .map(|order| {
                let item = order
                    .item_uuid
                    .and_then(|uuid| state.items.get(&uuid))
                    .map(|item| ItemSummary {
                        breed: item.breed.clone(),
                        tag_number: item.tag_number.clone(),
                        primary_image: item.primary_image().map(ToString::to_string),
                    });

                AdminOrder { order, item }
            })
            .collect())
    }

    async fn update_delivery_status(
        &self,
        _admin: &AdminContext,
        order: OrderUuid,
        status: DeliveryStatus,
    ) -> Result<(), OrdersServiceError> {
        let mut state = self.db.write();

        let stored = state
            .orders
            .iter_mut()
            .find(|o| o.uuid == order)
            .ok_or(OrdersServiceError::NotFound)?;

        stored.delivery_status = status;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use testresult::TestResult;

    use crate::domain::{
        catalog::{
            CatalogService, MemoryCatalogService,
            models::{AvailabilityStatus, Item, ItemUpdate, NewItem},
        },
        orders::models::{CheckoutLine, DeliveryDetails},
    };

    use super::*;

    struct Ctx {
        db: MemoryDb,
        catalog: MemoryCatalogService,
        orders: MemoryOrdersService,
        admin: AdminContext,
    }

    fn ctx() -> Ctx {
        let db = MemoryDb::new();

        Ctx {
            catalog: MemoryCatalogService::new(db.clone()),
            orders: MemoryOrdersService::new(db.clone()),
            admin: AdminContext::issue(),
            db,
        }
    }

    async fn seed_item(ctx: &Ctx, stock_quantity: u32, price: u64) -> Item {
        seed_item_with_status(ctx, stock_quantity, price, AvailabilityStatus::Available).await
    }

    async fn seed_item_with_status(
        ctx: &Ctx,
        stock_quantity: u32,
        price: u64,
        status: AvailabilityStatus,
    ) -> Item {
        ctx.catalog
            .create_item(
                &ctx.admin,
                NewItem {
                    uuid: ItemUuid::new(),
                    tag_number: "X100".to_string(),
                    breed: "Boer Goat".to_string(),
                    age: "18 months".to_string(),
                    weight: "60 kg".to_string(),
                    price,
                    stock_quantity,
                    availability_status: status,
                    health_notes: None,
                    images: Vec::new(),
                },
            )
            .await
            .expect("seeding item should succeed")
    }

    fn delivery() -> DeliveryDetails {
        DeliveryDetails {
            recipient_name: "Amina Bello".to_string(),
            phone_number: "+2348012345678".to_string(),
            delivery_address: "14 Ring Road, Ibadan".to_string(),
            region: Some("Oyo".to_string()),
            delivery_instructions: None,
        }
    }

    fn commit_for(reference: &str, buyer: Option<BuyerUuid>, lines: &[(ItemUuid, u64)]) -> CheckoutCommit {
        CheckoutCommit {
            payment_reference: reference.to_string(),
            buyer_uuid: buyer,
            contact_email: buyer.is_none().then(|| "guest@example.com".to_string()),
            lines: lines
                .iter()
                .map(|&(item_uuid, quoted_price)| CheckoutLine {
                    item_uuid,
                    quoted_price,
                })
                .collect(),
            delivery: delivery(),
        }
    }

    async fn stock_of(ctx: &Ctx, item: ItemUuid) -> (u32, AvailabilityStatus) {
        let item = ctx
            .catalog
            .get_item(item)
            .await
            .expect("seeded item should exist");

        (item.stock_quantity, item.availability_status)
    }

    #[tokio::test]
    async fn three_buyers_drain_two_units() -> TestResult {
        let ctx = ctx();
        let item = seed_item(&ctx, 2, 150_000).await;
        let buyer = BuyerUuid::new();

        let first = ctx
            .orders
            .commit_checkout(commit_for("R1", Some(buyer), &[(item.uuid, 150_000)]))
            .await?;
        assert!(!first.replayed);
        assert_eq!(stock_of(&ctx, item.uuid).await, (1, AvailabilityStatus::Available));

        let second = ctx
            .orders
            .commit_checkout(commit_for("R2", Some(buyer), &[(item.uuid, 150_000)]))
            .await?;
        assert!(!second.replayed);
        assert_eq!(stock_of(&ctx, item.uuid).await, (0, AvailabilityStatus::Sold));

        let third = ctx
            .orders
            .commit_checkout(commit_for("R3", Some(buyer), &[(item.uuid, 150_000)]))
            .await;

        assert!(
            matches!(third, Err(OrdersServiceError::OutOfStock { ref items }) if items == &[item.uuid]),
            "expected OutOfStock for the third buyer, got {third:?}"
        );
        assert_eq!(stock_of(&ctx, item.uuid).await, (0, AvailabilityStatus::Sold));

        let amounts: Vec<u64> = ctx
            .orders
            .list_for_buyer(buyer)
            .await?
            .iter()
            .map(|o| o.amount)
            .collect();
        assert_eq!(amounts, [150_000, 150_000]);

        Ok(())
    }

    #[tokio::test]
    async fn replaying_a_reference_returns_the_same_orders_once() -> TestResult {
        let ctx = ctx();
        let item = seed_item(&ctx, 2, 150_000).await;
        let buyer = BuyerUuid::new();

        let first = ctx
            .orders
            .commit_checkout(commit_for("R1", Some(buyer), &[(item.uuid, 150_000)]))
            .await?;

        let replay = ctx
            .orders
            .commit_checkout(commit_for("R1", Some(buyer), &[(item.uuid, 150_000)]))
            .await?;

        assert_eq!(replay.order_uuids, first.order_uuids);
        assert!(replay.replayed);

        // The 2 -> 1 decrement was not reapplied.
        assert_eq!(stock_of(&ctx, item.uuid).await, (1, AvailabilityStatus::Available));

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_commits_for_the_last_unit_pick_one_winner() -> TestResult {
        let ctx = ctx();
        let item = seed_item(&ctx, 1, 90_000).await;

        let orders = Arc::new(ctx.orders.clone());
        let mut handles = Vec::new();

        for n in 0..8 {
            let orders = Arc::clone(&orders);
            let item_uuid = item.uuid;

            handles.push(tokio::spawn(async move {
                orders
                    .commit_checkout(commit_for(
                        &format!("C{n}"),
                        Some(BuyerUuid::new()),
                        &[(item_uuid, 90_000)],
                    ))
                    .await
            }));
        }

        let mut won = 0;
        let mut lost = 0;

        for handle in handles {
            match handle.await? {
                Ok(receipt) => {
                    assert!(!receipt.replayed);
                    won += 1;
                }
                Err(OrdersServiceError::OutOfStock { items }) => {
                    assert_eq!(items, [item.uuid]);
                    lost += 1;
                }
                Err(other) => return Err(other.into()),
            }
        }

        assert_eq!((won, lost), (1, 7));
        assert_eq!(stock_of(&ctx, item.uuid).await, (0, AvailabilityStatus::Sold));

        Ok(())
    }

    #[tokio::test]
    async fn unknown_item_rejects_the_whole_commit() -> TestResult {
        let ctx = ctx();
        let item = seed_item(&ctx, 3, 70_000).await;
        let ghost = ItemUuid::new();

        let result = ctx
            .orders
            .commit_checkout(commit_for(
                "R9",
                Some(BuyerUuid::new()),
                &[(item.uuid, 70_000), (ghost, 10_000)],
            ))
            .await;

        assert!(
            matches!(result, Err(OrdersServiceError::ItemNotFound { ref items }) if items == &[ghost]),
            "expected ItemNotFound, got {result:?}"
        );

        // The valid line was rolled back with the rest.
        assert_eq!(stock_of(&ctx, item.uuid).await, (3, AvailabilityStatus::Available));

        Ok(())
    }

    #[tokio::test]
    async fn out_of_stock_line_rolls_back_the_other_lines() -> TestResult {
        let ctx = ctx();
        let stocked = seed_item(&ctx, 5, 40_000).await;
        let drained = seed_item(&ctx, 0, 25_000).await;

        let result = ctx
            .orders
            .commit_checkout(commit_for(
                "R4",
                Some(BuyerUuid::new()),
                &[(stocked.uuid, 40_000), (drained.uuid, 25_000)],
            ))
            .await;

        assert!(
            matches!(result, Err(OrdersServiceError::OutOfStock { ref items }) if items == &[drained.uuid]),
            "expected OutOfStock naming the drained item, got {result:?}"
        );
        assert_eq!(stock_of(&ctx, stocked.uuid).await, (5, AvailabilityStatus::Available));

        Ok(())
    }

    #[tokio::test]
    async fn amount_follows_catalog_price_at_commit_time() -> TestResult {
        let ctx = ctx();
        let item = seed_item(&ctx, 1, 100_000).await;
        let buyer = BuyerUuid::new();

        // Admin re-prices after the buyer was quoted 100,000.
        ctx.catalog
            .update_item(
                &ctx.admin,
                item.uuid,
                ItemUpdate {
                    tag_number: item.tag_number.clone(),
                    breed: item.breed.clone(),
                    age: item.age.clone(),
                    weight: item.weight.clone(),
                    price: 120_000,
                    stock_quantity: item.stock_quantity,
                    availability_status: item.availability_status,
                    health_notes: item.health_notes.clone(),
                    images: item.images.clone(),
                },
            )
            .await?;

        ctx.orders
            .commit_checkout(commit_for("R5", Some(buyer), &[(item.uuid, 100_000)]))
            .await?;

        let orders = ctx.orders.list_for_buyer(buyer).await?;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].amount, 120_000);

        Ok(())
    }

    #[tokio::test]
    async fn quoted_price_policy_pins_the_quote() -> TestResult {
        let ctx = ctx();
        let item = seed_item(&ctx, 1, 100_000).await;
        let buyer = BuyerUuid::new();

        let pinned = MemoryOrdersService::with_price_policy(ctx.db.clone(), PricePolicy::QuotedPrice);

        ctx.catalog
            .update_item(
                &ctx.admin,
                item.uuid,
                ItemUpdate {
                    tag_number: item.tag_number.clone(),
                    breed: item.breed.clone(),
                    age: item.age.clone(),
                    weight: item.weight.clone(),
                    price: 120_000,
                    stock_quantity: item.stock_quantity,
                    availability_status: item.availability_status,
                    health_notes: item.health_notes.clone(),
                    images: item.images.clone(),
                },
            )
            .await?;

        pinned
            .commit_checkout(commit_for("R6", Some(buyer), &[(item.uuid, 100_000)]))
            .await?;

        let orders = pinned.list_for_buyer(buyer).await?;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].amount, 100_000);

        Ok(())
    }

    #[tokio::test]
    async fn decrement_keeps_a_manual_reserved_hold() -> TestResult {
        let ctx = ctx();
        let item = seed_item_with_status(&ctx, 2, 55_000, AvailabilityStatus::Reserved).await;

        ctx.orders
            .commit_checkout(commit_for("R7", Some(BuyerUuid::new()), &[(item.uuid, 55_000)]))
            .await?;

        // One unit remains; the manual hold is not resurrected to Available.
        assert_eq!(stock_of(&ctx, item.uuid).await, (1, AvailabilityStatus::Reserved));

        Ok(())
    }

    #[tokio::test]
    async fn empty_checkout_is_rejected() {
        let ctx = ctx();

        let result = ctx
            .orders
            .commit_checkout(commit_for("R8", Some(BuyerUuid::new()), &[]))
            .await;

        assert!(
            matches!(result, Err(OrdersServiceError::EmptyCheckout)),
            "expected EmptyCheckout, got {result:?}"
        );
    }

    #[tokio::test]
    async fn guest_commit_records_contact_email() -> TestResult {
        let ctx = ctx();
        let item = seed_item(&ctx, 1, 65_000).await;

        let receipt = ctx
            .orders
            .commit_checkout(commit_for("G1", None, &[(item.uuid, 65_000)]))
            .await?;

        let all = ctx.orders.list_all(&ctx.admin).await?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].order.uuid, receipt.order_uuids[0]);
        assert_eq!(all[0].order.buyer_uuid, None);
        assert_eq!(all[0].order.contact_email.as_deref(), Some("guest@example.com"));

        Ok(())
    }

    #[tokio::test]
    async fn buyer_listing_is_newest_first_and_scoped() -> TestResult {
        let ctx = ctx();
        let first_item = seed_item(&ctx, 1, 10_000).await;
        let second_item = seed_item(&ctx, 1, 20_000).await;
        let other_item = seed_item(&ctx, 1, 30_000).await;

        let buyer = BuyerUuid::new();
        let other = BuyerUuid::new();

        ctx.orders
            .commit_checkout(commit_for("B1", Some(buyer), &[(first_item.uuid, 10_000)]))
            .await?;
        ctx.orders
            .commit_checkout(commit_for("B2", Some(buyer), &[(second_item.uuid, 20_000)]))
            .await?;
        ctx.orders
            .commit_checkout(commit_for("B3", Some(other), &[(other_item.uuid, 30_000)]))
            .await?;

        let orders = ctx.orders.list_for_buyer(buyer).await?;

        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|o| o.buyer_uuid == Some(buyer)));
        assert!(
            orders[0].created_at >= orders[1].created_at,
            "listing should be newest first"
        );

        Ok(())
    }

    #[tokio::test]
    async fn delivery_status_update_touches_nothing_else() -> TestResult {
        let ctx = ctx();
        let item = seed_item(&ctx, 1, 45_000).await;
        let buyer = BuyerUuid::new();

        let receipt = ctx
            .orders
            .commit_checkout(commit_for("D1", Some(buyer), &[(item.uuid, 45_000)]))
            .await?;
        let order_uuid = receipt.order_uuids[0];

        ctx.orders
            .update_delivery_status(&ctx.admin, order_uuid, DeliveryStatus::Shipped)
            .await?;

        // Transitions are unvalidated: walking backwards is allowed.
        ctx.orders
            .update_delivery_status(&ctx.admin, order_uuid, DeliveryStatus::Delivered)
            .await?;
        ctx.orders
            .update_delivery_status(&ctx.admin, order_uuid, DeliveryStatus::Processing)
            .await?;

        let orders = ctx.orders.list_for_buyer(buyer).await?;
        assert_eq!(orders[0].delivery_status, DeliveryStatus::Processing);
        assert_eq!(orders[0].amount, 45_000);
        assert_eq!(orders[0].payment_status, PaymentStatus::Successful);
        assert_eq!(stock_of(&ctx, item.uuid).await, (0, AvailabilityStatus::Sold));

        Ok(())
    }

    #[tokio::test]
    async fn delivery_status_update_unknown_order_is_not_found() {
        let ctx = ctx();

        let result = ctx
            .orders
            .update_delivery_status(&ctx.admin, OrderUuid::new(), DeliveryStatus::Shipped)
            .await;

        assert!(
            matches!(result, Err(OrdersServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn admin_listing_survives_item_hard_delete() -> TestResult {
        let ctx = ctx();
        let item = seed_item(&ctx, 1, 85_000).await;

        ctx.orders
            .commit_checkout(commit_for("H1", Some(BuyerUuid::new()), &[(item.uuid, 85_000)]))
            .await?;

        ctx.catalog.delete_item(&ctx.admin, item.uuid).await?;

        let all = ctx.orders.list_all(&ctx.admin).await?;

        assert_eq!(all.len(), 1);
        assert!(all[0].item.is_none());
        assert_eq!(all[0].display_breed(), "Unknown");
        assert_eq!(all[0].order.amount, 85_000);

        Ok(())
    }
}
