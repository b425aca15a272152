//! Orders: the atomic checkout commit and its read side.

pub mod errors;
pub mod memory;
pub mod models;
pub(crate) mod repository;
pub mod service;

pub use errors::OrdersServiceError;
pub use memory::MemoryOrdersService;
pub use service::*;
