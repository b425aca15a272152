//! Item Models

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use thiserror::Error;

use crate::uuids::TypedUuid;

/// Item UUID
pub type ItemUuid = TypedUuid<Item>;

/// Whether an item can currently be bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityStatus {
    Available,
    Sold,
    Reserved,
    Pending,
}

impl AvailabilityStatus {
    /// Reconcile a status with the stock on hand.
    ///
    /// Zero stock always means [`Self::Sold`]. Positive stock turns
    /// [`Self::Sold`] back into [`Self::Available`], while a manual
    /// [`Self::Reserved`] or [`Self::Pending`] hold is left untouched.
    /// Every writer of `stock_quantity` goes through this function so the
    /// two fields cannot drift.
    #[must_use]
    pub fn derive(self, stock_quantity: u32) -> Self {
        if stock_quantity == 0 {
            Self::Sold
        } else if self == Self::Sold {
            Self::Available
        } else {
            self
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Sold => "Sold",
            Self::Reserved => "Reserved",
            Self::Pending => "Pending",
        }
    }
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AvailabilityStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(Self::Available),
            "Sold" => Ok(Self::Sold),
            "Reserved" => Ok(Self::Reserved),
            "Pending" => Ok(Self::Pending),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Error for an unrecognised availability status string.
#[derive(Debug, Error)]
#[error("unknown availability status {0:?}")]
pub struct ParseStatusError(pub String);

/// Item Model
#[derive(Debug, Clone)]
pub struct Item {
    pub uuid: ItemUuid,
    pub tag_number: String,
    pub breed: String,
    pub age: String,
    pub weight: String,
    pub price: u64,
    pub stock_quantity: u32,
    pub availability_status: AvailabilityStatus,
    pub health_notes: Option<String>,
    pub images: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Item {
    /// URL of the primary image, when any image is attached.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// New Item Model
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub uuid: ItemUuid,
    pub tag_number: String,
    pub breed: String,
    pub age: String,
    pub weight: String,
    pub price: u64,
    pub stock_quantity: u32,
    pub availability_status: AvailabilityStatus,
    pub health_notes: Option<String>,
    pub images: Vec<String>,
}

/// Item Update Model
#[derive(Debug, Clone, PartialEq)]
pub struct ItemUpdate {
    pub tag_number: String,
    pub breed: String,
    pub age: String,
    pub weight: String,
    pub price: u64,
    pub stock_quantity: u32,
    pub availability_status: AvailabilityStatus,
    pub health_notes: Option<String>,
    pub images: Vec<String>,
}
