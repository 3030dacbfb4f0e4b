//! Calculation aggregate

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{CalculationId, CompanyId, Money};
use crate::error::CalculationError;
use crate::events::{CalculationEvent, CalculationEventKind};
use crate::item::{CalculationItem, ItemInput};
use crate::payment::{Payment, PaymentStatus, PaymentSubmission};

/// Calculation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationStatus {
    /// Editable by the payer
    Draft,
    /// Waiting for a reviewer
    Submitted,
    /// Taken by a reviewer
    UnderReview,
    /// Charged to the payer's account
    Approved,
    /// Returned to the payer with a reason
    Rejected,
    /// Some payments confirmed, amount still outstanding
    PartiallyPaid,
    /// Settled
    Paid,
}

impl CalculationStatus {
    pub const ALL: [CalculationStatus; 7] = [
        CalculationStatus::Draft,
        CalculationStatus::Submitted,
        CalculationStatus::UnderReview,
        CalculationStatus::Approved,
        CalculationStatus::Rejected,
        CalculationStatus::PartiallyPaid,
        CalculationStatus::Paid,
    ];

    /// Statuses a reviewer still has to act on
    pub const AWAITING_REVIEW: [CalculationStatus; 2] =
        [CalculationStatus::Submitted, CalculationStatus::UnderReview];

    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationStatus::Draft => "draft",
            CalculationStatus::Submitted => "submitted",
            CalculationStatus::UnderReview => "under_review",
            CalculationStatus::Approved => "approved",
            CalculationStatus::Rejected => "rejected",
            CalculationStatus::PartiallyPaid => "partially_paid",
            CalculationStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for CalculationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalculationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        CalculationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == needle)
            .ok_or_else(|| format!("unknown calculation status '{}'", s))
    }
}

/// Type of the customs or trade document a calculation is based on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Customs goods declaration
    Gtd,
    Invoice,
    Contract,
    Act,
    Other,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Gtd => "gtd",
            DocumentType::Invoice => "invoice",
            DocumentType::Contract => "contract",
            DocumentType::Act => "act",
            DocumentType::Other => "other",
        }
    }
}

/// Reporting period and document metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationHeader {
    pub period: String,
    pub quarter: Option<String>,
    pub document_type: Option<DocumentType>,
    pub document_number: Option<String>,
    pub document_date: Option<NaiveDate>,
}

/// A fee calculation document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    pub id: CalculationId,
    /// `CALC-{year}-{seq}`
    pub number: String,
    pub company_id: CompanyId,
    pub period: String,
    pub quarter: Option<String>,
    pub document_type: Option<DocumentType>,
    pub document_number: Option<String>,
    pub document_date: Option<NaiveDate>,
    pub items: Vec<CalculationItem>,
    /// Σ item amounts
    pub total_amount: Money,
    pub status: CalculationStatus,
    pub review_comment: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    /// Every payment attempt, oldest first
    pub payments: Vec<Payment>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Calculation {
    /// Creates a new draft with priced items
    pub fn draft(
        number: String,
        company_id: CompanyId,
        header: CalculationHeader,
        items: Vec<ItemInput>,
        created_by: &str,
    ) -> Result<Self, CalculationError> {
        let items = CalculationItem::price_all(items)?;
        let total_amount = Money::checked_sum(items.iter().map(|i| i.amount))?;
        let now = Utc::now();

        Ok(Self {
            id: CalculationId::new_v7(),
            number,
            company_id,
            period: header.period,
            quarter: header.quarter,
            document_type: header.document_type,
            document_number: header.document_number,
            document_date: header.document_date,
            total_amount,
            items,
            status: CalculationStatus::Draft,
            review_comment: None,
            reviewed_by: None,
            reviewed_at: None,
            submitted_at: None,
            payments: Vec::new(),
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Replaces header and items; a rejected calculation goes back to draft
    pub fn edit(
        &mut self,
        header: CalculationHeader,
        items: Vec<ItemInput>,
    ) -> Result<Option<CalculationEvent>, CalculationError> {
        self.guard("edit", &[CalculationStatus::Draft, CalculationStatus::Rejected])?;
        let items = CalculationItem::price_all(items)?;
        let total_amount = Money::checked_sum(items.iter().map(|i| i.amount))?;

        self.period = header.period;
        self.quarter = header.quarter;
        self.document_type = header.document_type;
        self.document_number = header.document_number;
        self.document_date = header.document_date;
        self.total_amount = total_amount;
        self.items = items;
        self.updated_at = Utc::now();

        if self.status == CalculationStatus::Rejected {
            let from = self.move_to("edit", CalculationStatus::Draft)?;
            self.clear_review();
            return Ok(Some(CalculationEvent::new(CalculationEventKind::ReturnedToDraft, self, from, None)));
        }
        Ok(None)
    }

    pub fn submit(&mut self) -> Result<CalculationEvent, CalculationError> {
        self.guard("submit", &[CalculationStatus::Draft])?;
        if self.items.is_empty() {
            return Err(CalculationError::EmptyCalculation);
        }

        let from = self.move_to("submit", CalculationStatus::Submitted)?;
        self.submitted_at = Some(self.updated_at);
        Ok(CalculationEvent::new(CalculationEventKind::Submitted, self, from, None))
    }

    pub fn resubmit(&mut self) -> Result<CalculationEvent, CalculationError> {
        self.guard("resubmit", &[CalculationStatus::Rejected])?;
        if self.items.is_empty() {
            return Err(CalculationError::EmptyCalculation);
        }

        let from = self.move_to("resubmit", CalculationStatus::Submitted)?;
        self.clear_review();
        self.submitted_at = Some(self.updated_at);
        Ok(CalculationEvent::new(CalculationEventKind::Resubmitted, self, from, None))
    }

    pub fn take_into_review(&mut self, reviewer: &str) -> Result<CalculationEvent, CalculationError> {
        let from = self.move_to("take into review", CalculationStatus::UnderReview)?;
        self.reviewed_by = Some(reviewer.to_string());
        Ok(CalculationEvent::new(CalculationEventKind::TakenIntoReview, self, from, None))
    }

    /// Approves the calculation; the caller posts the charge in the same unit of work
    pub fn approve(&mut self, reviewer: &str, comment: Option<String>) -> Result<CalculationEvent, CalculationError> {
        let comment = comment.filter(|c| !c.trim().is_empty());
        let from = self.move_to("approve", CalculationStatus::Approved)?;
        self.stamp_review(reviewer, comment.clone());
        Ok(CalculationEvent::new(CalculationEventKind::Approved, self, from, comment))
    }

    pub fn reject(&mut self, reviewer: &str, comment: Option<&str>) -> Result<CalculationEvent, CalculationError> {
        if !self.can_transition_to(CalculationStatus::Rejected) {
            return Err(self.invalid("reject"));
        }
        let comment = comment
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(CalculationError::MissingReason)?
            .to_string();

        let from = self.move_to("reject", CalculationStatus::Rejected)?;
        self.stamp_review(reviewer, Some(comment.clone()));
        Ok(CalculationEvent::new(CalculationEventKind::Rejected, self, from, Some(comment)))
    }

    /// Only drafts may be deleted
    pub fn ensure_deletable(&self) -> Result<(), CalculationError> {
        self.guard("delete", &[CalculationStatus::Draft])
    }

    /// A fresh draft with the same period and items
    ///
    /// Document number and date are left empty; status, review and payments start over.
    pub fn copy_as(&self, number: String, created_by: &str) -> Result<Self, CalculationError> {
        let header = CalculationHeader {
            period: self.period.clone(),
            quarter: self.quarter.clone(),
            document_type: self.document_type,
            document_number: None,
            document_date: None,
        };
        let items = self.items.iter().map(CalculationItem::to_input).collect();
        Calculation::draft(number, self.company_id, header, items, created_by)
    }

    /// Records a new pending payment attempt
    pub fn submit_payment(
        &mut self,
        number: String,
        submission: PaymentSubmission,
        submitted_by: &str,
    ) -> Result<CalculationEvent, CalculationError> {
        self.guard("submit a payment for", &[CalculationStatus::Approved, CalculationStatus::PartiallyPaid])?;
        if self.active_payment().is_some() {
            return Err(CalculationError::PaymentAlreadyPending);
        }
        if !submission.amount.is_positive() {
            return Err(CalculationError::InvalidAmount(format!(
                "payment amount must be greater than zero, got {}",
                submission.amount
            )));
        }

        self.payments.push(Payment::new(number, submission, submitted_by));
        self.updated_at = Utc::now();
        Ok(CalculationEvent::new(CalculationEventKind::PaymentSubmitted, self, self.status, None))
    }

    /// Confirms the active attempt and settles the status from all confirmed amounts
    ///
    /// Returns the confirmed payment so the caller can post it to the ledger.
    pub fn approve_payment(&mut self, reviewer: &str) -> Result<(Payment, CalculationEvent), CalculationError> {
        self.guard("confirm a payment for", &[CalculationStatus::Approved, CalculationStatus::PartiallyPaid])?;
        let index = self.active_payment_index().ok_or(CalculationError::NoPendingPayment)?;

        let confirmed = self.confirmed_amount().checked_add(&self.payments[index].amount)?;
        let target = if confirmed >= self.total_amount {
            CalculationStatus::Paid
        } else {
            CalculationStatus::PartiallyPaid
        };

        let from = self.move_to("confirm a payment for", target)?;
        self.payments[index].close(PaymentStatus::Confirmed, reviewer, None);
        let payment = self.payments[index].clone();
        Ok((payment, CalculationEvent::new(CalculationEventKind::PaymentConfirmed, self, from, None)))
    }

    /// Rejects the active attempt; the calculation status does not change
    pub fn reject_payment(&mut self, reviewer: &str, comment: Option<String>) -> Result<CalculationEvent, CalculationError> {
        let index = self.active_payment_index().ok_or(CalculationError::NoPendingPayment)?;
        let comment = comment.filter(|c| !c.trim().is_empty());

        self.payments[index].close(PaymentStatus::Rejected, reviewer, comment.clone());
        self.updated_at = Utc::now();
        Ok(CalculationEvent::new(CalculationEventKind::PaymentRejected, self, self.status, comment))
    }

    /// Administrative settlement without an amount check or ledger posting
    pub fn mark_paid(&mut self, reviewer: &str) -> Result<CalculationEvent, CalculationError> {
        self.guard("mark as paid", &[CalculationStatus::Approved, CalculationStatus::PartiallyPaid])?;
        let from = self.move_to("mark as paid", CalculationStatus::Paid)?;
        self.reviewed_by = Some(reviewer.to_string());
        Ok(CalculationEvent::new(CalculationEventKind::MarkedPaid, self, from, None))
    }

    /// The most recent pending attempt
    pub fn active_payment(&self) -> Option<&Payment> {
        self.active_payment_index().map(|index| &self.payments[index])
    }

    /// Σ confirmed attempts
    pub fn confirmed_amount(&self) -> Money {
        self.payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Confirmed)
            .map(|p| p.amount)
            .sum()
    }

    pub fn awaits_review(&self) -> bool {
        CalculationStatus::AWAITING_REVIEW.contains(&self.status)
    }

    /// Checks if transition is valid
    pub fn can_transition_to(&self, target: CalculationStatus) -> bool {
        use CalculationStatus::*;
        matches!(
            (self.status, target),
            (Draft, Submitted) |
            (Submitted, UnderReview) |
            (Submitted, Approved) |
            (Submitted, Rejected) |
            (UnderReview, Approved) |
            (UnderReview, Rejected) |
            (Rejected, Submitted) |
            (Rejected, Draft) |
            (Approved, PartiallyPaid) |
            (Approved, Paid) |
            (PartiallyPaid, PartiallyPaid) |
            (PartiallyPaid, Paid)
        )
    }

    fn active_payment_index(&self) -> Option<usize> {
        self.payments.iter().rposition(Payment::is_pending)
    }

    fn guard(&self, action: &'static str, allowed: &[CalculationStatus]) -> Result<(), CalculationError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> CalculationError {
        CalculationError::InvalidStatus {
            action,
            status: self.status,
        }
    }

    fn move_to(&mut self, action: &'static str, target: CalculationStatus) -> Result<CalculationStatus, CalculationError> {
        if !self.can_transition_to(target) {
            return Err(self.invalid(action));
        }
        let from = self.status;
        self.status = target;
        self.updated_at = Utc::now();
        Ok(from)
    }

    fn stamp_review(&mut self, reviewer: &str, comment: Option<String>) {
        self.reviewed_by = Some(reviewer.to_string());
        self.reviewed_at = Some(self.updated_at);
        if comment.is_some() {
            self.review_comment = comment;
        }
    }

    fn clear_review(&mut self) {
        self.review_comment = None;
        self.reviewed_by = None;
        self.reviewed_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn plastic() -> ItemInput {
        ItemInput {
            product_group: "Plastic packaging".to_string(),
            quantity: Some(dec!(10)),
            weight: Some(dec!(2000)),
            rate: Some(dec!(500)),
            recycling_norm: Some(dec!(20)),
            ..Default::default()
        }
    }

    fn draft(items: Vec<ItemInput>) -> Calculation {
        let header = CalculationHeader {
            period: "2026-Q1".to_string(),
            document_type: Some(DocumentType::Gtd),
            document_number: Some("GTD-1".to_string()),
            ..Default::default()
        };
        Calculation::draft("CALC-2026-000001".to_string(), CompanyId::new(), header, items, "payer").unwrap()
    }

    #[test]
    fn test_transition_table() {
        let mut calc = draft(vec![plastic()]);
        assert!(calc.can_transition_to(CalculationStatus::Submitted));
        assert!(!calc.can_transition_to(CalculationStatus::Approved));

        calc.status = CalculationStatus::Paid;
        assert!(CalculationStatus::ALL.iter().all(|s| !calc.can_transition_to(*s)));
    }

    #[test]
    fn test_approve_draft_fails() {
        let mut calc = draft(vec![plastic()]);
        let result = calc.approve("reviewer", None);
        assert_eq!(
            result,
            Err(CalculationError::InvalidStatus { action: "approve", status: CalculationStatus::Draft })
        );
    }

    #[test]
    fn test_reject_checks_status_before_reason() {
        let mut calc = draft(vec![plastic()]);
        assert!(matches!(calc.reject("r", None), Err(CalculationError::InvalidStatus { .. })));

        calc.submit().unwrap();
        assert_eq!(calc.reject("r", Some("   ")), Err(CalculationError::MissingReason));
        assert_eq!(calc.status, CalculationStatus::Submitted);
    }

    #[test]
    fn test_active_payment_is_latest_pending() {
        let mut calc = draft(vec![plastic()]);
        calc.submit().unwrap();
        calc.approve("r", None).unwrap();

        let submission = PaymentSubmission {
            amount: Money::new(dec!(100)),
            payment_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            method: Default::default(),
            document_number: None,
            document_url: None,
        };
        calc.submit_payment("PAY-2026-000001".to_string(), submission.clone(), "payer").unwrap();
        calc.reject_payment("r", Some("unreadable".to_string())).unwrap();
        calc.submit_payment("PAY-2026-000002".to_string(), submission, "payer").unwrap();

        assert_eq!(calc.active_payment().map(|p| p.number.as_str()), Some("PAY-2026-000002"));
        assert_eq!(calc.status, CalculationStatus::Approved);
    }
}
