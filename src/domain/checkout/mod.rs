//! Checkout orchestration in front of the external payment gateway.

pub mod errors;
pub mod payment;
pub mod service;

pub use errors::CheckoutError;
pub use payment::{HttpPaymentGateway, InMemoryPaymentGateway, PaymentGateway};
pub use service::*;
