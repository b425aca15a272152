//! Orders service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error as ThisError;

use crate::domain::catalog::models::ItemUuid;

#[derive(Debug, ThisError)]
pub enum OrdersServiceError {
    /// One or more lines had no stock left at commit time. The whole
    /// commit was rolled back; nothing was decremented or inserted.
    #[error("out of stock: {items:?}")]
    OutOfStock { items: Vec<ItemUuid> },

    /// One or more referenced items no longer exist. The whole commit was
    /// rolled back.
    #[error("item not found: {items:?}")]
    ItemNotFound { items: Vec<ItemUuid> },

    #[error("checkout has no line items")]
    EmptyCheckout,

    #[error("order not found")]
    NotFound,

    #[error("storage error")]
    Storage(#[source] Error),
}

impl OrdersServiceError {
    /// Transient storage failures are safe to retry: the payment
    /// reference makes the commit idempotent.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<Error> for OrdersServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::ForeignKeyViolation) => Self::ItemNotFound { items: Vec::new() },
            Some(ErrorKind::Other | _) | None => Self::Storage(error),
        }
    }
}

/// Whether the error is the composite `(payment_reference, item)` unique
/// index rejecting a concurrent duplicate commit.
pub(crate) fn is_unique_violation(error: &OrdersServiceError) -> bool {
    match error {
        OrdersServiceError::Storage(error) => matches!(
            error.as_database_error().map(DatabaseError::kind),
            Some(ErrorKind::UniqueViolation)
        ),
        _ => false,
    }
}
