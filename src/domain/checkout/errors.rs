//! Checkout errors.

use thiserror::Error;

use crate::domain::{checkout::payment::PaymentGatewayError, orders::errors::OrdersServiceError};

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Rejected before the payment gateway was contacted; the cart is
    /// untouched.
    #[error("invalid checkout: {0}")]
    Validation(&'static str),

    /// The gateway reported a non-success status. Nothing was committed.
    #[error("payment failed with status {status:?}")]
    PaymentFailed { status: String },

    #[error("payment gateway error")]
    Gateway(#[from] PaymentGatewayError),

    /// Money has moved but the order could not be recorded even after
    /// retries. Never dropped silently: the reference is the recovery key
    /// for manual reconciliation.
    #[error("payment {reference:?} succeeded but the order could not be recorded")]
    PaymentRecordedButOrderFailed { reference: String },

    /// The commit definitively rejected the checkout (out of stock, item
    /// gone). The cart is intact; the failing items are in the source
    /// error.
    #[error("commit rejected")]
    Commit(#[source] OrdersServiceError),
}
