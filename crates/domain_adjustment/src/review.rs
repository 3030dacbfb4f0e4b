//! Review state shared by refunds and corrections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AdjustmentError;
use crate::events::DocumentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            other => Err(format!("unknown review status '{}'", other)),
        }
    }
}

/// Reviewer decision recorded on a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub comment: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Moves a pending document to `target`, recording the reviewer
pub(crate) fn decide(
    document: DocumentKind,
    action: &'static str,
    status: &mut ReviewStatus,
    review: &mut Review,
    target: ReviewStatus,
    reviewer: &str,
    comment: Option<String>,
) -> Result<DateTime<Utc>, AdjustmentError> {
    if *status != ReviewStatus::Pending {
        return Err(AdjustmentError::InvalidStatus {
            document,
            action,
            status: *status,
        });
    }

    let now = Utc::now();
    *status = target;
    review.reviewed_by = Some(reviewer.to_string());
    review.reviewed_at = Some(now);
    review.comment = comment.filter(|c| !c.trim().is_empty());
    Ok(now)
}
