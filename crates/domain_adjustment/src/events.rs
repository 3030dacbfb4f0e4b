//! Status-change events for refunds and corrections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use core_kernel::{CompanyId, Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Refund,
    Correction,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Refund => f.write_str("refund"),
            DocumentKind::Correction => f.write_str("correction"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentEventKind {
    Requested,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentEvent {
    pub document: DocumentKind,
    pub kind: AdjustmentEventKind,
    pub document_id: Uuid,
    pub number: String,
    pub company_id: CompanyId,
    /// Refund total, or the net charge change of a correction
    pub amount: Money,
    pub comment: Option<String>,
    pub occurred_at: DateTime<Utc>,
}
