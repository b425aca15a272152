//! Admin capability checks.
//!
//! Privileged operations never trust a client-held hint: each call
//! presents raw key material that is verified against stored admin keys,
//! and the resulting [`models::AdminContext`] is the only way to reach a
//! privileged service method.

pub mod errors;
pub mod memory;
pub mod models;
pub(crate) mod repository;
pub mod service;

pub use errors::AuthServiceError;
pub use memory::MemoryAuthService;
pub use service::*;
