//! Request handlers, one module per resource

pub mod accounts;
pub mod calculations;
pub mod corrections;
pub mod health;
pub mod public;
pub mod refunds;
