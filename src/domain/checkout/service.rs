//! Checkout service.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::{
    carts::models::CartLine,
    checkout::{
        errors::CheckoutError,
        payment::{InitiatePayment, PaymentGateway},
    },
    orders::{
        OrdersService,
        models::{BuyerUuid, CheckoutCommit, CheckoutLine, CommitReceipt, DeliveryDetails},
    },
};

/// Currency every checkout is collected in.
const CURRENCY: &str = "NGN";

/// How many times a transiently failing commit is attempted before the
/// confirmed payment is escalated for manual reconciliation.
const COMMIT_ATTEMPTS: u32 = 3;

/// A checkout whose payment has been initiated but not yet resolved.
///
/// Dropping one before [`CheckoutService::resolve`] abandons the attempt
/// with zero residual state: the cart is retained and no order or stock
/// mutation exists.
#[derive(Debug, Clone)]
pub struct PendingCheckout {
    reference: String,
    lines: Vec<CheckoutLine>,
    buyer_uuid: Option<BuyerUuid>,
    contact_email: Option<String>,
    delivery: DeliveryDetails,
}

impl PendingCheckout {
    /// The payment reference this checkout will commit under.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }
}

/// Orchestrates one checkout: validation, the external payment step, and
/// the commit of the confirmed payment.
#[derive(Clone)]
pub struct CheckoutService {
    gateway: Arc<dyn PaymentGateway>,
    orders: Arc<dyn OrdersService>,
}

impl CheckoutService {
    #[must_use]
    pub fn new(gateway: Arc<dyn PaymentGateway>, orders: Arc<dyn OrdersService>) -> Self {
        Self { gateway, orders }
    }

    /// Validate the cart snapshot and start collecting payment.
    ///
    /// Fails with [`CheckoutError::Validation`] before any gateway call
    /// when the cart is empty or a guest checkout lacks a contact email.
    ///
    /// # Errors
    ///
    /// See [`CheckoutError`].
    #[tracing::instrument(
        name = "checkout.service.begin",
        skip(self, cart, delivery, contact_email),
        fields(line_count = cart.len(), guest = buyer.is_none()),
        err
    )]
    pub async fn begin(
        &self,
        cart: &[CartLine],
        delivery: DeliveryDetails,
        buyer: Option<BuyerUuid>,
        contact_email: Option<String>,
    ) -> Result<PendingCheckout, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::Validation("cart is empty"));
        }

        if buyer.is_none() && contact_email.as_deref().is_none_or(str::is_empty) {
            return Err(CheckoutError::Validation(
                "guest checkout requires a contact email",
            ));
        }

        let total = cart.iter().map(|line| line.price).sum();

        let intent = self
            .gateway
            .initiate(InitiatePayment {
                amount: total,
                currency: CURRENCY.to_string(),
                customer_email: contact_email.clone(),
                customer_name: delivery.recipient_name.clone(),
                phone_number: delivery.phone_number.clone(),
            })
            .await?;

        info!(reference = %intent.reference, amount = total, "initiated payment");

        Ok(PendingCheckout {
            reference: intent.reference,
            lines: cart
                .iter()
                .map(|line| CheckoutLine {
                    item_uuid: line.item_uuid,
                    quoted_price: line.price,
                })
                .collect(),
            buyer_uuid: buyer,
            contact_email,
            delivery,
        })
    }

    /// Resolve a pending checkout against the provider's verdict.
    ///
    /// A non-success verdict fails with [`CheckoutError::PaymentFailed`]
    /// and mutates nothing. On success the commit runs exactly once per
    /// confirmed reference, with bounded retries on transient storage
    /// failures; the idempotency key makes the retries safe.
    ///
    /// # Errors
    ///
    /// See [`CheckoutError`].
    #[tracing::instrument(
        name = "checkout.service.resolve",
        skip(self, pending),
        fields(reference = %pending.reference),
        err
    )]
    pub async fn resolve(&self, pending: PendingCheckout) -> Result<CommitReceipt, CheckoutError> {
        let event = self.gateway.verify(&pending.reference).await?;

        if !event.is_success() {
            info!(status = %event.status, "payment not successful; nothing committed");
            return Err(CheckoutError::PaymentFailed {
                status: event.status,
            });
        }

        let reference = pending.reference.clone();
        let commit = CheckoutCommit {
            payment_reference: pending.reference,
            buyer_uuid: pending.buyer_uuid,
            contact_email: pending.contact_email,
            lines: pending.lines,
            delivery: pending.delivery,
        };

        for attempt in 1..=COMMIT_ATTEMPTS {
            match self.orders.commit_checkout(commit.clone()).await {
                Ok(receipt) => {
                    info!(
                        orders = receipt.order_uuids.len(),
                        replayed = receipt.replayed,
                        "checkout committed"
                    );
                    return Ok(receipt);
                }
                Err(error) if error.is_retryable() && attempt < COMMIT_ATTEMPTS => {
                    warn!(%error, attempt, "transient commit failure; retrying");
                }
                Err(error) if error.is_retryable() => {
                    error!(
                        reference = %reference,
                        %error,
                        "payment recorded but order commit failed; escalate for manual reconciliation"
                    );
                    return Err(CheckoutError::PaymentRecordedButOrderFailed { reference });
                }
                Err(error) => {
                    error!(
                        reference = %reference,
                        %error,
                        "commit rejected after successful payment; reference kept for reconciliation"
                    );
                    return Err(CheckoutError::Commit(error));
                }
            }
        }

        Err(CheckoutError::PaymentRecordedButOrderFailed { reference })
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        auth::models::AdminContext,
        domain::{
            catalog::{
                CatalogService, MemoryCatalogService,
                models::{AvailabilityStatus, Item, ItemUuid, NewItem},
            },
            checkout::payment::InMemoryPaymentGateway,
            orders::{
                MemoryOrdersService, MockOrdersService, OrdersServiceError,
                models::DeliveryStatus,
            },
        },
        memory::MemoryDb,
    };

    use super::*;

    struct Ctx {
        db: MemoryDb,
        catalog: MemoryCatalogService,
        gateway: Arc<InMemoryPaymentGateway>,
        checkout: CheckoutService,
        admin: AdminContext,
    }

    fn ctx() -> Ctx {
        let db = MemoryDb::new();
        let gateway = Arc::new(InMemoryPaymentGateway::new());
        let orders = Arc::new(MemoryOrdersService::new(db.clone()));

        Ctx {
            catalog: MemoryCatalogService::new(db.clone()),
            checkout: CheckoutService::new(gateway.clone(), orders),
            gateway,
            admin: AdminContext::issue(),
            db,
        }
    }

    async fn seed_item(ctx: &Ctx, stock_quantity: u32, price: u64) -> Item {
        ctx.catalog
            .create_item(
                &ctx.admin,
                NewItem {
                    uuid: ItemUuid::new(),
                    tag_number: "R220".to_string(),
                    breed: "Yankasa Ram".to_string(),
                    age: "14 months".to_string(),
                    weight: "45 kg".to_string(),
                    price,
                    stock_quantity,
                    availability_status: AvailabilityStatus::Available,
                    health_notes: None,
                    images: Vec::new(),
                },
            )
            .await
            .expect("seeding item should succeed")
    }

    fn delivery() -> DeliveryDetails {
        DeliveryDetails {
            recipient_name: "Chidi Okafor".to_string(),
            phone_number: "+2347098765432".to_string(),
            delivery_address: "3 Aba Road, Port Harcourt".to_string(),
            region: Some("Rivers".to_string()),
            delivery_instructions: Some("Call at the gate".to_string()),
        }
    }

    fn cart_line(item: &Item) -> CartLine {
        CartLine {
            item_uuid: item.uuid,
            price: item.price,
            breed: item.breed.clone(),
            tag_number: item.tag_number.clone(),
            primary_image: None,
        }
    }

    #[tokio::test]
    async fn empty_cart_fails_before_the_gateway_is_contacted() {
        let ctx = ctx();

        let result = ctx
            .checkout
            .begin(&[], delivery(), Some(BuyerUuid::new()), None)
            .await;

        assert!(
            matches!(result, Err(CheckoutError::Validation(_))),
            "expected Validation, got {result:?}"
        );
        assert_eq!(ctx.gateway.initiated_count(), 0);
    }

    #[tokio::test]
    async fn guest_without_contact_email_fails_validation() {
        let ctx = ctx();

        let line = CartLine {
            item_uuid: ItemUuid::new(),
            price: 10_000,
            breed: "Kano Brown".to_string(),
            tag_number: "K1".to_string(),
            primary_image: None,
        };

        for contact_email in [None, Some(String::new())] {
            let result = ctx
                .checkout
                .begin(&[line.clone()], delivery(), None, contact_email)
                .await;

            assert!(
                matches!(result, Err(CheckoutError::Validation(_))),
                "expected Validation, got {result:?}"
            );
        }

        assert_eq!(ctx.gateway.initiated_count(), 0);
    }

    #[tokio::test]
    async fn rejected_initiation_surfaces_a_gateway_error() -> TestResult {
        let ctx = ctx();
        let item = seed_item(&ctx, 1, 20_000).await;

        ctx.gateway.set_fail_on_initiate(true);

        let result = ctx
            .checkout
            .begin(&[cart_line(&item)], delivery(), Some(BuyerUuid::new()), None)
            .await;

        assert!(
            matches!(result, Err(CheckoutError::Gateway(_))),
            "expected Gateway, got {result:?}"
        );

        let stored = ctx.catalog.get_item(item.uuid).await?;
        assert_eq!(stored.stock_quantity, 1);

        Ok(())
    }

    #[tokio::test]
    async fn confirmed_payment_commits_orders_and_stock() -> TestResult {
        let ctx = ctx();
        let item = seed_item(&ctx, 2, 150_000).await;
        let buyer = BuyerUuid::new();

        let pending = ctx
            .checkout
            .begin(&[cart_line(&item)], delivery(), Some(buyer), None)
            .await?;

        ctx.gateway.resolve(pending.reference(), "successful");

        let receipt = ctx.checkout.resolve(pending).await?;

        assert_eq!(receipt.order_uuids.len(), 1);
        assert!(!receipt.replayed);

        let stored = ctx.catalog.get_item(item.uuid).await?;
        assert_eq!(stored.stock_quantity, 1);
        assert_eq!(stored.availability_status, AvailabilityStatus::Available);

        Ok(())
    }

    #[tokio::test]
    async fn failed_payment_commits_nothing() -> TestResult {
        let ctx = ctx();
        let item = seed_item(&ctx, 2, 150_000).await;

        let pending = ctx
            .checkout
            .begin(&[cart_line(&item)], delivery(), Some(BuyerUuid::new()), None)
            .await?;

        ctx.gateway.resolve(pending.reference(), "failed");

        let result = ctx.checkout.resolve(pending).await;

        assert!(
            matches!(result, Err(CheckoutError::PaymentFailed { ref status }) if status == "failed"),
            "expected PaymentFailed, got {result:?}"
        );

        let stored = ctx.catalog.get_item(item.uuid).await?;
        assert_eq!(stored.stock_quantity, 2);

        Ok(())
    }

    #[tokio::test]
    async fn uppercase_completed_status_counts_as_success() -> TestResult {
        let ctx = ctx();
        let item = seed_item(&ctx, 1, 80_000).await;

        let pending = ctx
            .checkout
            .begin(&[cart_line(&item)], delivery(), Some(BuyerUuid::new()), None)
            .await?;

        ctx.gateway.resolve(pending.reference(), "COMPLETED");

        let receipt = ctx.checkout.resolve(pending).await?;
        assert_eq!(receipt.order_uuids.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn abandoned_checkout_leaves_no_state() -> TestResult {
        let ctx = ctx();
        let item = seed_item(&ctx, 2, 60_000).await;

        let pending = ctx
            .checkout
            .begin(&[cart_line(&item)], delivery(), Some(BuyerUuid::new()), None)
            .await?;

        // The buyer closes the payment step; the pending checkout is
        // simply dropped.
        drop(pending);

        let stored = ctx.catalog.get_item(item.uuid).await?;
        assert_eq!(stored.stock_quantity, 2);
        assert!(ctx.db.read().orders.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn guest_checkout_with_email_commits() -> TestResult {
        let ctx = ctx();
        let item = seed_item(&ctx, 1, 95_000).await;

        let pending = ctx
            .checkout
            .begin(
                &[cart_line(&item)],
                delivery(),
                None,
                Some("guest@example.com".to_string()),
            )
            .await?;

        ctx.gateway.resolve(pending.reference(), "successful");

        let receipt = ctx.checkout.resolve(pending).await?;
        assert_eq!(receipt.order_uuids.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn out_of_stock_after_payment_surfaces_the_item() -> TestResult {
        let ctx = ctx();
        let item = seed_item(&ctx, 1, 70_000).await;
        let rival = BuyerUuid::new();

        let pending = ctx
            .checkout
            .begin(&[cart_line(&item)], delivery(), Some(BuyerUuid::new()), None)
            .await?;

        // A rival buyer takes the last unit while the payment modal is
        // open.
        let rival_pending = ctx
            .checkout
            .begin(&[cart_line(&item)], delivery(), Some(rival), None)
            .await?;
        ctx.gateway.resolve(rival_pending.reference(), "successful");
        ctx.checkout.resolve(rival_pending).await?;

        ctx.gateway.resolve(pending.reference(), "successful");
        let result = ctx.checkout.resolve(pending).await;

        assert!(
            matches!(
                result,
                Err(CheckoutError::Commit(OrdersServiceError::OutOfStock { ref items }))
                    if items == &[item.uuid]
            ),
            "expected the losing checkout to surface OutOfStock, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn transient_commit_failure_is_retried_until_it_succeeds() -> TestResult {
        let gateway = Arc::new(InMemoryPaymentGateway::new());
        let mut orders = MockOrdersService::new();

        let mut attempts = 0;
        orders.expect_commit_checkout().times(2).returning(move |_| {
            attempts += 1;
            if attempts == 1 {
                Err(OrdersServiceError::Storage(sqlx::Error::PoolClosed))
            } else {
                Ok(CommitReceipt {
                    order_uuids: vec![crate::domain::orders::models::OrderUuid::new()],
                    replayed: false,
                })
            }
        });

        let checkout = CheckoutService::new(gateway.clone(), Arc::new(orders));

        let line = CartLine {
            item_uuid: ItemUuid::new(),
            price: 30_000,
            breed: "Ouda".to_string(),
            tag_number: "O2".to_string(),
            primary_image: None,
        };

        let pending = checkout
            .begin(&[line], delivery(), Some(BuyerUuid::new()), None)
            .await?;
        gateway.resolve(pending.reference(), "successful");

        let receipt = checkout.resolve(pending).await?;
        assert_eq!(receipt.order_uuids.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn persistent_commit_failure_escalates_with_the_reference() -> TestResult {
        let gateway = Arc::new(InMemoryPaymentGateway::new());
        let mut orders = MockOrdersService::new();

        orders
            .expect_commit_checkout()
            .times(COMMIT_ATTEMPTS as usize)
            .returning(|_| Err(OrdersServiceError::Storage(sqlx::Error::PoolClosed)));

        let checkout = CheckoutService::new(gateway.clone(), Arc::new(orders));

        let line = CartLine {
            item_uuid: ItemUuid::new(),
            price: 30_000,
            breed: "Ouda".to_string(),
            tag_number: "O3".to_string(),
            primary_image: None,
        };

        let pending = checkout
            .begin(&[line], delivery(), Some(BuyerUuid::new()), None)
            .await?;
        gateway.resolve(pending.reference(), "successful");
        let reference = pending.reference().to_string();

        let result = checkout.resolve(pending).await;

        assert!(
            matches!(
                result,
                Err(CheckoutError::PaymentRecordedButOrderFailed { reference: ref r })
                    if *r == reference
            ),
            "expected PaymentRecordedButOrderFailed, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn delivery_status_remains_admin_controlled_after_checkout() -> TestResult {
        let ctx = ctx();
        let item = seed_item(&ctx, 1, 50_000).await;
        let buyer = BuyerUuid::new();

        let pending = ctx
            .checkout
            .begin(&[cart_line(&item)], delivery(), Some(buyer), None)
            .await?;
        ctx.gateway.resolve(pending.reference(), "successful");
        let receipt = ctx.checkout.resolve(pending).await?;

        let orders_service = MemoryOrdersService::new(ctx.db.clone());
        orders_service
            .update_delivery_status(&ctx.admin, receipt.order_uuids[0], DeliveryStatus::Shipped)
            .await?;

        let orders = orders_service.list_for_buyer(buyer).await?;
        assert_eq!(orders[0].delivery_status, DeliveryStatus::Shipped);

        Ok(())
    }
}
