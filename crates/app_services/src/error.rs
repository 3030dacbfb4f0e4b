//! Service error taxonomy
//!
//! Every domain and port failure is folded into one of five categories the
//! API layer maps onto HTTP status codes.

use std::fmt;
use thiserror::Error;

use core_kernel::PortError;
use domain_adjustment::AdjustmentError;
use domain_calculation::CalculationError;
use domain_ledger::LedgerError;

#[derive(Debug, Error, PartialEq)]
pub enum ServiceError {
    /// Malformed input, rejected before anything is written
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Wrong state, missing reason, insufficient balance, empty items
    #[error("{0}")]
    BusinessRule(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>, field: Option<&str>) -> Self {
        ServiceError::Validation {
            message: message.into(),
            field: field.map(str::to_string),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        ServiceError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn business(message: impl Into<String>) -> Self {
        ServiceError::BusinessRule(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::Internal(message.into())
    }
}

impl From<LedgerError> for ServiceError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::AccountNotFound(company) => ServiceError::not_found("Account", company),
            LedgerError::InvalidAmount(message) => ServiceError::validation(message, Some("amount")),
            LedgerError::AccountAlreadyExists(_)
            | LedgerError::InsufficientBalance { .. }
            | LedgerError::EmptyCorrection => ServiceError::business(error.to_string()),
            LedgerError::MalformedTransaction(_)
            | LedgerError::ReplayMismatch { .. }
            | LedgerError::Overflow => ServiceError::internal(error.to_string()),
        }
    }
}

impl From<CalculationError> for ServiceError {
    fn from(error: CalculationError) -> Self {
        match error {
            CalculationError::InvalidItem { position, message } => {
                ServiceError::validation(message, Some(&format!("items[{}]", position)))
            }
            CalculationError::InvalidAmount(message) => ServiceError::validation(message, Some("amount")),
            other => ServiceError::business(other.to_string()),
        }
    }
}

impl From<AdjustmentError> for ServiceError {
    fn from(error: AdjustmentError) -> Self {
        match error {
            AdjustmentError::InvalidAmount { position, message } => {
                ServiceError::validation(message, Some(&format!("items[{}].amount", position)))
            }
            AdjustmentError::Ledger(inner) => inner.into(),
            other => ServiceError::business(other.to_string()),
        }
    }
}

impl From<PortError> for ServiceError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => ServiceError::NotFound { entity: entity_type, id },
            PortError::Validation { message, field } => ServiceError::Validation { message, field },
            PortError::Conflict { message } => ServiceError::BusinessRule(message),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Money;

    #[test]
    fn test_insufficient_balance_is_business_rule() {
        let error: ServiceError = LedgerError::InsufficientBalance {
            requested: Money::from_minor(100_000),
            available: Money::zero(),
        }
        .into();
        assert!(matches!(error, ServiceError::BusinessRule(_)));
    }

    #[test]
    fn test_invalid_item_keeps_field() {
        let error: ServiceError = CalculationError::InvalidItem {
            position: 2,
            message: "weight must be positive".to_string(),
        }
        .into();
        assert_eq!(
            error,
            ServiceError::Validation {
                message: "weight must be positive".to_string(),
                field: Some("items[2]".to_string()),
            }
        );
    }

    #[test]
    fn test_transient_port_errors_are_internal() {
        let error: ServiceError = PortError::connection("refused").into();
        assert!(matches!(error, ServiceError::Internal(_)));
    }
}
