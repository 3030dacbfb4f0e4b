//! Test Utilities Crate
//!
//! Shared test infrastructure for the fee ledger workspace.
//!
//! # Modules
//!
//! - `fixtures`: Callers, items, headers and payments with known amounts
//! - `builders`: `FeeWorldBuilder` and calculation input builders
//! - `database`: PostgreSQL containers for store tests
//! - `assertions`: Ledger and workflow assertions
//! - `generators`: Proptest strategies

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
