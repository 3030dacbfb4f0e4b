//! Charge corrections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{CompanyId, CorrectionId, Money};
use domain_ledger::{correction_postings, CorrectionLine, LedgerError, Posting, Reference};
use crate::error::AdjustmentError;
use crate::events::{AdjustmentEvent, AdjustmentEventKind, DocumentKind};
use crate::review::{decide, Review, ReviewStatus};

/// A request to replace charged amounts with corrected ones
///
/// Nothing is posted until the correction is approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub id: CorrectionId,
    /// `COR-{year}-{seq}`
    pub number: String,
    pub company_id: CompanyId,
    pub items: Vec<CorrectionLine>,
    pub comment: String,
    pub status: ReviewStatus,
    pub review: Review,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Correction {
    /// Creates a pending correction
    ///
    /// # Errors
    ///
    /// - `EmptyItems` when there are no lines
    /// - `InvalidAmount` when an amount is negative or the net change overflows
    /// - `Ledger(EmptyCorrection)` when every line keeps its original amount
    pub fn request(
        number: String,
        company_id: CompanyId,
        items: Vec<CorrectionLine>,
        comment: Option<String>,
        created_by: &str,
    ) -> Result<Self, AdjustmentError> {
        if items.is_empty() {
            return Err(AdjustmentError::EmptyItems);
        }
        for (position, line) in items.iter().enumerate() {
            if line.original_amount.is_negative() || line.corrected_amount.is_negative() {
                return Err(AdjustmentError::InvalidAmount {
                    position,
                    message: "original and corrected amounts cannot be negative".to_string(),
                });
            }
        }
        if items.iter().all(|line| line.delta().is_zero()) {
            return Err(LedgerError::EmptyCorrection.into());
        }
        Money::checked_sum(items.iter().map(CorrectionLine::delta)).map_err(|_| AdjustmentError::InvalidAmount {
            position: items.len() - 1,
            message: "net change is too large".to_string(),
        })?;

        let now = Utc::now();
        Ok(Self {
            id: CorrectionId::new_v7(),
            number,
            company_id,
            items,
            comment: comment.map(|c| c.trim().to_string()).unwrap_or_default(),
            status: ReviewStatus::Pending,
            review: Review::default(),
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Σ(corrected − original): the change to the company's charged total
    pub fn net_change(&self) -> Money {
        self.items.iter().map(CorrectionLine::delta).sum()
    }

    pub fn approve(&mut self, reviewer: &str) -> Result<AdjustmentEvent, AdjustmentError> {
        self.updated_at = decide(
            DocumentKind::Correction,
            "approve",
            &mut self.status,
            &mut self.review,
            ReviewStatus::Approved,
            reviewer,
            None,
        )?;
        Ok(self.event(AdjustmentEventKind::Approved))
    }

    pub fn reject(&mut self, reviewer: &str, reason: Option<String>) -> Result<AdjustmentEvent, AdjustmentError> {
        self.updated_at = decide(
            DocumentKind::Correction,
            "reject",
            &mut self.status,
            &mut self.review,
            ReviewStatus::Rejected,
            reviewer,
            reason,
        )?;
        Ok(self.event(AdjustmentEventKind::Rejected))
    }

    /// One signed posting per changed line, each referencing this correction
    pub fn ledger_postings(&self) -> Result<Vec<Posting>, AdjustmentError> {
        Ok(correction_postings(&self.items, &self.comment, Some(Reference::Correction(self.id)))?)
    }

    pub fn requested_event(&self) -> AdjustmentEvent {
        self.event(AdjustmentEventKind::Requested)
    }

    fn event(&self, kind: AdjustmentEventKind) -> AdjustmentEvent {
        AdjustmentEvent {
            document: DocumentKind::Correction,
            kind,
            document_id: *self.id.as_uuid(),
            number: self.number.clone(),
            company_id: self.company_id,
            amount: self.net_change(),
            comment: self.review.comment.clone(),
            occurred_at: self.updated_at,
        }
    }
}
