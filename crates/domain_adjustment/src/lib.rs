//! Adjustment Domain
//!
//! Two payer-facing documents that adjust what a company owes after a
//! calculation has been charged:
//!
//! - **Refund**: the payer asks for money back against one or more
//!   calculations (export, recycling, overpayment, error)
//! - **Correction**: a charged amount is replaced by a corrected one
//!
//! Both follow `Pending -> {Approved, Rejected}`. Only approval moves money:
//! the approved document yields the ledger postings the caller applies in
//! the same unit of work as the status change.

pub mod review;
pub mod refund;
pub mod correction;
pub mod events;
pub mod error;

pub use review::{Review, ReviewStatus};
pub use refund::{Refund, RefundItem, RefundReason};
pub use correction::Correction;
pub use events::{AdjustmentEvent, AdjustmentEventKind, DocumentKind};
pub use error::AdjustmentError;
