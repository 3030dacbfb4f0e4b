//! Payment attempts against an approved calculation

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{Money, PaymentId};

/// Payment confirmation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Submitted by the payer, awaiting a reviewer
    Pending,
    Confirmed,
    Rejected,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// How the payer paid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    BankTransfer,
    Online,
    Cash,
}

/// Payer-supplied data for a new attempt
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSubmission {
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    pub document_number: Option<String>,
    pub document_url: Option<String>,
}

/// One payment attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub number: String,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub document_number: Option<String>,
    pub document_url: Option<String>,
    pub submitted_by: String,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_comment: Option<String>,
}

impl Payment {
    pub fn new(number: String, submission: PaymentSubmission, submitted_by: &str) -> Self {
        Self {
            id: PaymentId::new_v7(),
            number,
            amount: submission.amount,
            payment_date: submission.payment_date,
            method: submission.method,
            status: PaymentStatus::Pending,
            document_number: submission.document_number,
            document_url: submission.document_url,
            submitted_by: submitted_by.to_string(),
            submitted_at: Utc::now(),
            reviewed_by: None,
            reviewed_at: None,
            review_comment: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    pub(crate) fn close(&mut self, status: PaymentStatus, reviewer: &str, comment: Option<String>) {
        self.status = status;
        self.reviewed_by = Some(reviewer.to_string());
        self.reviewed_at = Some(Utc::now());
        self.review_comment = comment;
    }
}
