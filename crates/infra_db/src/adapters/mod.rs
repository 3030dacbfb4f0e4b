//! Port adapters
//!
//! Implementations of the application store port on top of the repository
//! layer.

pub mod fee_store;

pub use fee_store::{PgUnitOfWork, PostgresFeeStore};
