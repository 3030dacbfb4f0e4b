//! Request and response bodies
//!
//! JSON field names are camelCase; money travels as a decimal string.

pub mod common;
pub mod account;
pub mod calculation;
pub mod refund;
pub mod correction;
pub mod public;
