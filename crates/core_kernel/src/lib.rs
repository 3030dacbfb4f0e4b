//! Core Kernel - Foundational types for the utilization fee ledger
//!
//! This crate provides the building blocks shared by every other crate:
//! - Money with two-decimal half-up rounding
//! - Inclusive date ranges for history filtering
//! - Strongly-typed identifiers and document number series
//! - Port error and health-check abstractions for adapters

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;
pub mod numbering;

pub use money::{Money, MoneyError, round_half_up};
pub use temporal::{DateRange, TemporalError, numbering_year};
pub use identifiers::{
    CompanyId, AccountId, TransactionId, CalculationId, CalculationItemId,
    PaymentId, RefundId, CorrectionId, ReportId,
};
pub use numbering::DocumentSeries;
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
