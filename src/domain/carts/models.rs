//! Cart Models

use serde::{Deserialize, Serialize};

use crate::domain::catalog::models::{Item, ItemUuid};

/// One staged item in the local cart.
///
/// The price and display fields are snapshots captured at add time. They
/// are advisory only: the catalog is re-read when the checkout commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_uuid: ItemUuid,
    pub price: u64,
    pub breed: String,
    pub tag_number: String,
    pub primary_image: Option<String>,
}

impl CartLine {
    /// Snapshot a catalog item into a cart line.
    #[must_use]
    pub fn from_item(item: &Item) -> Self {
        Self {
            item_uuid: item.uuid,
            price: item.price,
            breed: item.breed.clone(),
            tag_number: item.tag_number.clone(),
            primary_image: item.primary_image().map(ToString::to_string),
        }
    }
}

/// Result of staging a line in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// The item was already staged; the cart is unchanged.
    AlreadyInCart,
}
