//! Fee Calculation Domain
//!
//! This crate implements the fee document lifecycle, from a payer's draft
//! through review to payment confirmation, and the fee formula every item
//! amount is derived from.
//!
//! # Calculation Lifecycle
//!
//! ```text
//! Draft -> Submitted -> UnderReview -> Approved -> PartiallyPaid -> Paid
//!              |             |
//!              +-> Rejected <+  (resubmit -> Submitted, edit -> Draft)
//! ```
//!
//! Approval is where the ledger charge happens; confirmed payments move an
//! approved calculation to `PartiallyPaid` or `Paid`.

pub mod fee;
pub mod item;
pub mod calculation;
pub mod payment;
pub mod events;
pub mod error;

pub use fee::{item_amount, RateCatalog, RateEntry, FeeEstimate, MAX_RATE, MAX_WEIGHT_KG};
pub use item::{CalculationItem, ItemInput};
pub use calculation::{Calculation, CalculationHeader, CalculationStatus, DocumentType};
pub use payment::{Payment, PaymentMethod, PaymentStatus, PaymentSubmission};
pub use events::{CalculationEvent, CalculationEventKind};
pub use error::CalculationError;
