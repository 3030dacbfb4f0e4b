//! Correction DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use app_services::ReviewQuery;
use core_kernel::{CalculationId, CompanyId, Money};
use domain_adjustment::{Correction, ReviewStatus};
use domain_ledger::CorrectionLine;

use super::common::{non_blank, non_negative_decimal};
use super::refund::StatusQuery;
use crate::error::ApiError;

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionItemRequest {
    pub calculation_id: Uuid,
    #[validate(custom(function = "non_negative_decimal"))]
    pub original_amount: Decimal,
    #[validate(custom(function = "non_negative_decimal"))]
    pub corrected_amount: Decimal,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCorrectionRequest {
    #[validate(length(min = 1, message = "at least one item is required"), nested)]
    pub items: Vec<CorrectionItemRequest>,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

impl CreateCorrectionRequest {
    pub fn into_parts(self) -> (Vec<CorrectionLine>, Option<String>) {
        let lines = self
            .items
            .into_iter()
            .map(|item| CorrectionLine {
                calculation_id: CalculationId::from_uuid(item.calculation_id),
                original_amount: Money::new(item.original_amount),
                corrected_amount: Money::new(item.corrected_amount),
                reason: item.reason.trim().to_string(),
            })
            .collect();
        (lines, non_blank(self.comment))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionListQuery {
    pub status: Option<String>,
    pub company_id: Option<Uuid>,
}

impl CorrectionListQuery {
    pub fn into_query(self) -> Result<ReviewQuery, ApiError> {
        let status = StatusQuery { status: self.status }.status()?;
        Ok(ReviewQuery {
            company_id: self.company_id.map(CompanyId::from_uuid),
            status,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionItemResponse {
    pub calculation_id: Uuid,
    pub original_amount: Money,
    pub corrected_amount: Money,
    /// corrected − original
    pub delta: Money,
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionResponse {
    pub id: Uuid,
    pub number: String,
    pub company_id: Uuid,
    pub items: Vec<CorrectionItemResponse>,
    pub net_change: Money,
    pub comment: String,
    pub status: ReviewStatus,
    pub review_comment: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Correction> for CorrectionResponse {
    fn from(c: Correction) -> Self {
        let net_change = c.net_change();
        Self {
            id: *c.id.as_uuid(),
            number: c.number,
            company_id: *c.company_id.as_uuid(),
            items: c
                .items
                .into_iter()
                .map(|line| CorrectionItemResponse {
                    calculation_id: *line.calculation_id.as_uuid(),
                    original_amount: line.original_amount,
                    corrected_amount: line.corrected_amount,
                    delta: line.delta(),
                    reason: line.reason,
                })
                .collect(),
            net_change,
            comment: c.comment,
            status: c.status,
            review_comment: c.review.comment,
            reviewed_by: c.review.reviewed_by,
            reviewed_at: c.review.reviewed_at,
            created_by: c.created_by,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}
