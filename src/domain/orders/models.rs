//! Order Models

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use thiserror::Error;

use crate::{domain::catalog::models::ItemUuid, uuids::TypedUuid};

/// Order UUID
pub type OrderUuid = TypedUuid<Order>;

/// Marker for buyer identities issued by the external identity provider.
#[derive(Debug)]
pub struct Buyer;

/// Buyer UUID. Opaque; the identity provider owns its meaning.
pub type BuyerUuid = TypedUuid<Buyer>;

/// Payment state recorded on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Successful,
    Pending,
    Failed,
}

impl PaymentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Successful => "Successful",
            Self::Pending => "Pending",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseOrderStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Successful" => Ok(Self::Successful),
            "Pending" => Ok(Self::Pending),
            "Failed" => Ok(Self::Failed),
            other => Err(ParseOrderStatusError(other.to_string())),
        }
    }
}

/// Fulfilment state of an order.
///
/// Admin-controlled and deliberately unvalidated: any state may follow
/// any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Processing,
    Shipped,
    InTransit,
    Delivered,
}

impl DeliveryStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::InTransit => "In Transit",
            Self::Delivered => "Delivered",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = ParseOrderStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "In Transit" | "InTransit" => Ok(Self::InTransit),
            "Delivered" => Ok(Self::Delivered),
            other => Err(ParseOrderStatusError(other.to_string())),
        }
    }
}

/// Error for an unrecognised payment or delivery status string.
#[derive(Debug, Error)]
#[error("unknown order status {0:?}")]
pub struct ParseOrderStatusError(pub String);

/// Where and to whom a purchase ships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryDetails {
    pub recipient_name: String,
    pub phone_number: String,
    pub delivery_address: String,
    pub region: Option<String>,
    pub delivery_instructions: Option<String>,
}

/// Order Model
///
/// One row per purchased unit. Immutable after creation except for
/// `delivery_status`.
#[derive(Debug, Clone)]
pub struct Order {
    pub uuid: OrderUuid,
    pub buyer_uuid: Option<BuyerUuid>,
    pub contact_email: Option<String>,
    /// `None` once the referenced item has been hard-deleted.
    pub item_uuid: Option<ItemUuid>,
    pub amount: u64,
    pub payment_reference: String,
    pub payment_status: PaymentStatus,
    pub delivery_status: DeliveryStatus,
    pub delivery: DeliveryDetails,
    pub created_at: Timestamp,
}

/// One line of a checkout: the item and the price the buyer was quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutLine {
    pub item_uuid: ItemUuid,
    pub quoted_price: u64,
}

/// Everything the commit operation needs for one confirmed payment.
#[derive(Debug, Clone)]
pub struct CheckoutCommit {
    /// External payment reference; the idempotency key for the whole
    /// commit.
    pub payment_reference: String,
    pub buyer_uuid: Option<BuyerUuid>,
    pub contact_email: Option<String>,
    pub lines: Vec<CheckoutLine>,
    pub delivery: DeliveryDetails,
}

/// Outcome of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Created order ids, in line order.
    pub order_uuids: Vec<OrderUuid>,
    /// True when the reference had already been committed and the prior
    /// result was returned unchanged.
    pub replayed: bool,
}

/// Which price the commit records on each order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PricePolicy {
    /// Re-read the catalog price at commit time; server truth wins.
    #[default]
    CatalogPrice,
    /// Honor the price the buyer was quoted at add-to-cart time.
    QuotedPrice,
}

/// Display snapshot of the item referenced by an order.
#[derive(Debug, Clone)]
pub struct ItemSummary {
    pub breed: String,
    pub tag_number: String,
    pub primary_image: Option<String>,
}

/// An order joined with its item's display data for the admin view.
#[derive(Debug, Clone)]
pub struct AdminOrder {
    pub order: Order,
    /// `None` when the item has been hard-deleted since the purchase.
    pub item: Option<ItemSummary>,
}

impl AdminOrder {
    /// Breed to display, tolerating a deleted item.
    #[must_use]
    pub fn display_breed(&self) -> &str {
        self.item.as_ref().map_or("Unknown", |i| i.breed.as_str())
    }
}
