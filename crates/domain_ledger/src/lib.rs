//! Ledger Domain - Per-payer fee accounts
//!
//! Every payer (company) owns exactly one `Account`. The account's balance
//! moves only through `Transaction`s appended to its log:
//!
//! - **Debits** (charge, refund disbursement, penalty, upward correction)
//!   decrease the balance
//! - **Credits** (payment, offset, refund recognition, downward correction)
//!   increase the balance
//!
//! A negative balance is debt owed by the payer. Each transaction stores the
//! balance immediately after it was applied, so history is rendered without
//! replay, and replaying the log in sequence order must reproduce every
//! snapshot and the account's running totals.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::{Account, Posting};
//!
//! let mut account = Account::open(company_id, "Eco Plast LLC", "01234567890123", now);
//! let charge = account.post(Posting::charge(amount, calculation_id, None), now)?;
//! log.push(charge);
//! ```

pub mod account;
pub mod transaction;
pub mod reconciliation;
pub mod error;

pub use account::Account;
pub use transaction::{
    Transaction, TransactionKind, Entry, Reference, ReferenceKind, Posting, CorrectionLine,
    correction_postings,
};
pub use reconciliation::Reconciliation;
pub use error::LedgerError;
