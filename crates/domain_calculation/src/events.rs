//! Status-change events emitted by calculation transitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{CalculationId, CompanyId, Money};
use crate::calculation::{Calculation, CalculationStatus};

/// What happened to the calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationEventKind {
    Submitted,
    Resubmitted,
    TakenIntoReview,
    Approved,
    Rejected,
    ReturnedToDraft,
    PaymentSubmitted,
    PaymentConfirmed,
    PaymentRejected,
    MarkedPaid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationEvent {
    pub kind: CalculationEventKind,
    pub calculation_id: CalculationId,
    pub number: String,
    pub company_id: CompanyId,
    pub from: CalculationStatus,
    pub to: CalculationStatus,
    pub total_amount: Money,
    pub comment: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl CalculationEvent {
    pub(crate) fn new(
        kind: CalculationEventKind,
        calculation: &Calculation,
        from: CalculationStatus,
        comment: Option<String>,
    ) -> Self {
        Self {
            kind,
            calculation_id: calculation.id,
            number: calculation.number.clone(),
            company_id: calculation.company_id,
            from,
            to: calculation.status,
            total_amount: calculation.total_amount,
            comment,
            occurred_at: Utc::now(),
        }
    }
}
