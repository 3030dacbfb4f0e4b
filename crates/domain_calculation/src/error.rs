//! Calculation domain errors

use core_kernel::MoneyError;
use thiserror::Error;

use crate::calculation::CalculationStatus;

/// Errors that can occur in the calculation domain
#[derive(Debug, Error, PartialEq)]
pub enum CalculationError {
    #[error("Cannot {action} a calculation in status {status}")]
    InvalidStatus {
        action: &'static str,
        status: CalculationStatus,
    },

    #[error("Cannot submit a calculation without items")]
    EmptyCalculation,

    #[error("A rejection reason is required")]
    MissingReason,

    #[error("Invalid item at position {position}: {message}")]
    InvalidItem { position: usize, message: String },

    #[error("A payment for this calculation is already awaiting confirmation")]
    PaymentAlreadyPending,

    #[error("No payment is awaiting confirmation for this calculation")]
    NoPendingPayment,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

impl From<MoneyError> for CalculationError {
    fn from(error: MoneyError) -> Self {
        CalculationError::InvalidAmount(error.to_string())
    }
}
