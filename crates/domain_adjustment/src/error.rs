//! Adjustment domain errors

use domain_ledger::LedgerError;
use thiserror::Error;

use crate::events::DocumentKind;
use crate::review::ReviewStatus;

#[derive(Debug, Error, PartialEq)]
pub enum AdjustmentError {
    #[error("Cannot {action} a {document} in status {status}")]
    InvalidStatus {
        document: DocumentKind,
        action: &'static str,
        status: ReviewStatus,
    },

    #[error("At least one item is required")]
    EmptyItems,

    #[error("Invalid amount at item {position}: {message}")]
    InvalidAmount { position: usize, message: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
