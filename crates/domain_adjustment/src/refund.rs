//! Refund applications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{CalculationId, CompanyId, Money, RefundId};
use domain_ledger::Posting;
use crate::error::AdjustmentError;
use crate::events::{AdjustmentEvent, AdjustmentEventKind, DocumentKind};
use crate::review::{decide, Review, ReviewStatus};

/// Why the payer claims money back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    /// Goods were exported
    Export,
    /// The payer recycled the goods itself
    Recycling,
    Overpayment,
    Error,
}

impl RefundReason {
    /// Parses a reason, falling back to `Error` for unknown text
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "export" => RefundReason::Export,
            "recycling" => RefundReason::Recycling,
            "overpayment" => RefundReason::Overpayment,
            _ => RefundReason::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RefundReason::Export => "export",
            RefundReason::Recycling => "recycling",
            RefundReason::Overpayment => "overpayment",
            RefundReason::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundItem {
    pub calculation_id: CalculationId,
    pub amount: Money,
    pub reason: RefundReason,
}

/// A payer's request for money back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refund {
    pub id: RefundId,
    /// `REF-{year}-{seq}`
    pub number: String,
    pub company_id: CompanyId,
    pub items: Vec<RefundItem>,
    pub total_amount: Money,
    pub status: ReviewStatus,
    pub comment: Option<String>,
    pub review: Review,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Refund {
    /// Creates a pending refund
    ///
    /// Ownership of the referenced calculations is checked by the caller.
    pub fn request(
        number: String,
        company_id: CompanyId,
        items: Vec<RefundItem>,
        comment: Option<String>,
        created_by: &str,
    ) -> Result<Self, AdjustmentError> {
        if items.is_empty() {
            return Err(AdjustmentError::EmptyItems);
        }
        if let Some((position, item)) = items.iter().enumerate().find(|(_, i)| !i.amount.is_positive()) {
            return Err(AdjustmentError::InvalidAmount {
                position,
                message: format!("refund amount must be greater than zero, got {}", item.amount),
            });
        }
        let total_amount =
            Money::checked_sum(items.iter().map(|i| i.amount)).map_err(|_| AdjustmentError::InvalidAmount {
                position: items.len() - 1,
                message: "total refund amount is too large".to_string(),
            })?;

        let now = Utc::now();
        Ok(Self {
            id: RefundId::new_v7(),
            number,
            company_id,
            total_amount,
            items,
            status: ReviewStatus::Pending,
            comment: comment.filter(|c| !c.trim().is_empty()),
            review: Review::default(),
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn approve(&mut self, reviewer: &str) -> Result<AdjustmentEvent, AdjustmentError> {
        self.updated_at = decide(
            DocumentKind::Refund,
            "approve",
            &mut self.status,
            &mut self.review,
            ReviewStatus::Approved,
            reviewer,
            None,
        )?;
        Ok(self.event(AdjustmentEventKind::Approved))
    }

    /// Rejects the refund; the reason, if any, becomes the review comment
    pub fn reject(&mut self, reviewer: &str, reason: Option<String>) -> Result<AdjustmentEvent, AdjustmentError> {
        self.updated_at = decide(
            DocumentKind::Refund,
            "reject",
            &mut self.status,
            &mut self.review,
            ReviewStatus::Rejected,
            reviewer,
            reason,
        )?;
        Ok(self.event(AdjustmentEventKind::Rejected))
    }

    /// Ledger credit recognizing an approved refund
    pub fn ledger_posting(&self) -> Posting {
        Posting::refund_credit(self.total_amount, self.id, &self.number)
    }

    /// Calculations referenced by the items, without duplicates
    pub fn calculation_ids(&self) -> Vec<CalculationId> {
        let mut ids: Vec<CalculationId> = self.items.iter().map(|i| i.calculation_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn requested_event(&self) -> AdjustmentEvent {
        self.event(AdjustmentEventKind::Requested)
    }

    fn event(&self, kind: AdjustmentEventKind) -> AdjustmentEvent {
        AdjustmentEvent {
            document: DocumentKind::Refund,
            kind,
            document_id: *self.id.as_uuid(),
            number: self.number.clone(),
            company_id: self.company_id,
            amount: self.total_amount,
            comment: self.review.comment.clone(),
            occurred_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_ledger::{Entry, Reference, TransactionKind};
    use rust_decimal_macros::dec;

    fn refund() -> Refund {
        Refund::request(
            "REF-2026-000001".to_string(),
            CompanyId::new(),
            vec![
                RefundItem {
                    calculation_id: CalculationId::new(),
                    amount: Money::new(dec!(300)),
                    reason: RefundReason::Export,
                },
                RefundItem {
                    calculation_id: CalculationId::new(),
                    amount: Money::new(dec!(120.5)),
                    reason: RefundReason::parse_lenient("bogus"),
                },
            ],
            Some("exported to KZ".to_string()),
            "payer",
        )
        .unwrap()
    }

    #[test]
    fn test_total_and_lenient_reason() {
        let refund = refund();
        assert_eq!(refund.total_amount.amount(), dec!(420.50));
        assert_eq!(refund.items[1].reason, RefundReason::Error);
        assert_eq!(refund.status, ReviewStatus::Pending);
    }

    #[test]
    fn test_oversized_total_rejected() {
        let item = RefundItem {
            calculation_id: CalculationId::new(),
            amount: Money::new(dec!(50_000_000_000_000_000_000_000_000_000)),
            reason: RefundReason::Overpayment,
        };
        let result = Refund::request(
            "REF-2026-000003".to_string(),
            CompanyId::new(),
            vec![item.clone(), item],
            None,
            "payer",
        );
        assert!(matches!(result, Err(AdjustmentError::InvalidAmount { position: 1, .. })));
    }

    #[test]
    fn test_empty_items_rejected() {
        let result = Refund::request("REF-2026-000002".to_string(), CompanyId::new(), vec![], None, "payer");
        assert_eq!(result, Err(AdjustmentError::EmptyItems));
    }

    #[test]
    fn test_only_pending_can_be_decided() {
        let mut refund = refund();
        refund.reject("reviewer", Some("no export declaration".to_string())).unwrap();
        assert_eq!(refund.review.comment.as_deref(), Some("no export declaration"));

        let again = refund.approve("reviewer");
        assert!(matches!(again, Err(AdjustmentError::InvalidStatus { status: ReviewStatus::Rejected, .. })));
    }

    #[test]
    fn test_posting_is_refund_credit() {
        let refund = refund();
        let posting = refund.ledger_posting();
        assert_eq!(posting.kind, TransactionKind::Refund);
        assert_eq!(posting.entry, Entry::Credit(refund.total_amount));
        assert_eq!(posting.reference, Some(Reference::Refund(refund.id)));
    }
}
