//! Refund DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{CalculationId, Money};
use domain_adjustment::{Refund, RefundItem, RefundReason, ReviewStatus};

use super::common::{non_blank, positive_decimal};
use crate::error::ApiError;

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefundItemRequest {
    pub calculation_id: Uuid,
    #[validate(custom(function = "positive_decimal"))]
    pub amount: Decimal,
    /// One of export, recycling, overpayment or error
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRefundRequest {
    #[validate(length(min = 1, message = "at least one item is required"), nested)]
    pub items: Vec<RefundItemRequest>,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

impl CreateRefundRequest {
    pub fn into_parts(self) -> (Vec<RefundItem>, Option<String>) {
        let items = self
            .items
            .into_iter()
            .map(|item| RefundItem {
                calculation_id: CalculationId::from_uuid(item.calculation_id),
                amount: Money::new(item.amount),
                reason: RefundReason::parse_lenient(&item.reason),
            })
            .collect();
        (items, non_blank(self.comment))
    }
}

/// Rejection body shared by refunds and corrections
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RejectRequest {
    #[serde(alias = "comment")]
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

impl StatusQuery {
    pub fn status(&self) -> Result<Option<ReviewStatus>, ApiError> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<ReviewStatus>().map_err(ApiError::validation))
            .transpose()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundItemResponse {
    pub calculation_id: Uuid,
    pub amount: Money,
    pub reason: RefundReason,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub id: Uuid,
    pub number: String,
    pub company_id: Uuid,
    pub items: Vec<RefundItemResponse>,
    pub total_amount: Money,
    pub status: ReviewStatus,
    pub comment: Option<String>,
    pub review_comment: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Refund> for RefundResponse {
    fn from(r: Refund) -> Self {
        Self {
            id: *r.id.as_uuid(),
            number: r.number,
            company_id: *r.company_id.as_uuid(),
            items: r
                .items
                .into_iter()
                .map(|i| RefundItemResponse {
                    calculation_id: *i.calculation_id.as_uuid(),
                    amount: i.amount,
                    reason: i.reason,
                })
                .collect(),
            total_amount: r.total_amount,
            status: r.status,
            comment: r.comment,
            review_comment: r.review.comment,
            reviewed_by: r.review.reviewed_by,
            reviewed_at: r.review.reviewed_at,
            created_by: r.created_by,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
