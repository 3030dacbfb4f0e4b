//! Ledger domain errors

use core_kernel::{Money, MoneyError};
use thiserror::Error;

/// Errors that can occur in the ledger domain
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    /// No account is registered for the company
    #[error("Account not found for company {0}")]
    AccountNotFound(String),

    /// The company already has an account
    #[error("Account already exists for company {0}")]
    AccountAlreadyExists(String),

    /// A refund disbursement exceeds the available balance
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Money,
        available: Money,
    },

    /// Amount is zero, negative, or otherwise unusable
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// A correction whose lines all net to zero
    #[error("Correction has no effect: every corrected amount equals its original")]
    EmptyCorrection,

    /// A stored row that cannot be represented as a transaction
    #[error("Malformed transaction: {0}")]
    MalformedTransaction(String),

    /// Replaying the log disagrees with the stored state
    #[error("Ledger replay mismatch at sequence {sequence}: {message}")]
    ReplayMismatch {
        sequence: u64,
        message: String,
    },

    #[error("Arithmetic overflow")]
    Overflow,
}

impl From<MoneyError> for LedgerError {
    fn from(error: MoneyError) -> Self {
        match error {
            MoneyError::InvalidAmount(message) => LedgerError::InvalidAmount(message),
            MoneyError::Overflow => LedgerError::Overflow,
        }
    }
}
