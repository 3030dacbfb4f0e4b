//! Calculation DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use app_services::CalculationQuery;
use core_kernel::{CompanyId, Money};
use domain_calculation::{
    Calculation, CalculationHeader, CalculationItem, CalculationStatus, DocumentType, ItemInput, Payment,
    PaymentMethod, PaymentStatus, PaymentSubmission,
};

use super::common::{date_range, non_blank, positive_decimal, rate_per_tonne, weight_kg};
use crate::error::ApiError;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    #[validate(length(min = 1, max = 100))]
    pub product_group: String,
    pub product_subgroup: Option<String>,
    #[validate(length(max = 20))]
    pub tnved_code: Option<String>,
    #[validate(length(max = 20))]
    pub gskp_code: Option<String>,
    pub product_name: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    #[validate(custom(function = "weight_kg"))]
    pub weight: Option<Decimal>,
    #[validate(custom(function = "rate_per_tonne"))]
    pub rate: Option<Decimal>,
    pub recycling_norm: Option<Decimal>,
}

impl From<ItemRequest> for ItemInput {
    fn from(item: ItemRequest) -> Self {
        ItemInput {
            product_group: item.product_group,
            product_subgroup: non_blank(item.product_subgroup),
            tnved_code: non_blank(item.tnved_code),
            gskp_code: non_blank(item.gskp_code),
            product_name: non_blank(item.product_name),
            quantity: item.quantity,
            unit: non_blank(item.unit),
            weight: item.weight,
            rate: item.rate,
            recycling_norm: item.recycling_norm,
        }
    }
}

/// Body of create and full update
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRequest {
    #[validate(length(min = 1, max = 20))]
    pub period: String,
    #[validate(length(max = 10))]
    pub quarter: Option<String>,
    pub document_type: Option<DocumentType>,
    #[validate(length(max = 100))]
    pub document_number: Option<String>,
    pub document_date: Option<NaiveDate>,
    #[validate(nested)]
    #[serde(default)]
    pub items: Vec<ItemRequest>,
}

impl CalculationRequest {
    pub fn into_parts(self) -> (CalculationHeader, Vec<ItemInput>) {
        let header = CalculationHeader {
            period: self.period.trim().to_string(),
            quarter: non_blank(self.quarter),
            document_type: self.document_type,
            document_number: non_blank(self.document_number),
            document_date: self.document_date,
        };
        (header, self.items.into_iter().map(ItemInput::from).collect())
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemsRequest {
    #[validate(nested)]
    pub items: Vec<ItemRequest>,
}

impl UpdateItemsRequest {
    pub fn into_inputs(self) -> Vec<ItemInput> {
        self.items.into_iter().map(ItemInput::from).collect()
    }
}

/// Listing filters; `status` is a comma-separated list
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub period_from: Option<NaiveDate>,
    pub period_to: Option<NaiveDate>,
    pub company_id: Option<Uuid>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl CalculationListQuery {
    pub fn into_query(self) -> Result<CalculationQuery, ApiError> {
        let statuses = match self.status.as_deref() {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<CalculationStatus>().map_err(ApiError::validation))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        let defaults = CalculationQuery::default();
        Ok(CalculationQuery {
            company_id: self.company_id.map(CompanyId::from_uuid),
            statuses,
            search: non_blank(self.search),
            period: date_range(self.period_from, self.period_to)?,
            page: self.page.unwrap_or(defaults.page),
            page_size: self.page_size.unwrap_or(defaults.page_size),
        })
    }
}

/// Optional reviewer comment on approve, reject and payment rejection
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSubmissionRequest {
    #[validate(custom(function = "positive_decimal"))]
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    #[serde(default)]
    pub method: PaymentMethod,
    #[validate(length(max = 100))]
    pub document_number: Option<String>,
    #[validate(url)]
    pub document_url: Option<String>,
}

impl PaymentSubmissionRequest {
    pub fn into_submission(self) -> Result<PaymentSubmission, ApiError> {
        let amount = Money::positive(self.amount).map_err(|e| ApiError::Validation {
            message: "Request validation failed".to_string(),
            details: vec![format!("amount: {}", e)],
        })?;
        Ok(PaymentSubmission {
            amount,
            payment_date: self.payment_date,
            method: self.method,
            document_number: non_blank(self.document_number),
            document_url: non_blank(self.document_url),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub id: Uuid,
    pub product_group: String,
    pub product_subgroup: Option<String>,
    pub tnved_code: Option<String>,
    pub gskp_code: Option<String>,
    pub product_name: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub weight: Option<Decimal>,
    pub rate: Option<Decimal>,
    pub recycling_norm: Option<Decimal>,
    pub amount: Money,
}

impl From<CalculationItem> for ItemResponse {
    fn from(item: CalculationItem) -> Self {
        Self {
            id: *item.id.as_uuid(),
            product_group: item.product_group,
            product_subgroup: item.product_subgroup,
            tnved_code: item.tnved_code,
            gskp_code: item.gskp_code,
            product_name: item.product_name,
            quantity: item.quantity,
            unit: item.unit,
            weight: item.weight,
            rate: item.rate,
            recycling_norm: item.recycling_norm,
            amount: item.amount,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: Uuid,
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

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: *p.id.as_uuid(),
            number: p.number,
            amount: p.amount,
            payment_date: p.payment_date,
            method: p.method,
            status: p.status,
            document_number: p.document_number,
            document_url: p.document_url,
            submitted_by: p.submitted_by,
            submitted_at: p.submitted_at,
            reviewed_by: p.reviewed_by,
            reviewed_at: p.reviewed_at,
            review_comment: p.review_comment,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResponse {
    pub id: Uuid,
    pub number: String,
    pub company_id: Uuid,
    pub period: String,
    pub quarter: Option<String>,
    pub document_type: Option<DocumentType>,
    pub document_number: Option<String>,
    pub document_date: Option<NaiveDate>,
    pub items: Vec<ItemResponse>,
    pub total_amount: Money,
    pub status: CalculationStatus,
    pub review_comment: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub payments: Vec<PaymentResponse>,
    /// Sum of confirmed payments
    pub paid_amount: Money,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Calculation> for CalculationResponse {
    fn from(c: Calculation) -> Self {
        let paid_amount = c.confirmed_amount();
        Self {
            id: *c.id.as_uuid(),
            number: c.number,
            company_id: *c.company_id.as_uuid(),
            period: c.period,
            quarter: c.quarter,
            document_type: c.document_type,
            document_number: c.document_number,
            document_date: c.document_date,
            items: c.items.into_iter().map(ItemResponse::from).collect(),
            total_amount: c.total_amount,
            status: c.status,
            review_comment: c.review_comment,
            reviewed_by: c.reviewed_by,
            reviewed_at: c.reviewed_at,
            submitted_at: c.submitted_at,
            payments: c.payments.into_iter().map(PaymentResponse::from).collect(),
            paid_amount,
            created_by: c.created_by,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_list_query_parses_status_list() {
        let query = CalculationListQuery {
            status: Some("under_review, approved".to_string()),
            page_size: Some(5),
            ..Default::default()
        }
        .into_query()
        .unwrap();

        assert_eq!(query.statuses, vec![CalculationStatus::UnderReview, CalculationStatus::Approved]);
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 5);
        assert!(query.period.is_unbounded());
    }

    #[test]
    fn test_list_query_rejects_unknown_status() {
        let query = CalculationListQuery {
            status: Some("archived".to_string()),
            ..Default::default()
        };
        assert!(matches!(query.into_query(), Err(ApiError::Validation { .. })));
    }

    #[test]
    fn test_request_converts_to_header_and_items() {
        let request: CalculationRequest = serde_json::from_value(serde_json::json!({
            "period": " 2026-Q1 ",
            "documentType": "gtd",
            "documentNumber": "  ",
            "items": [{"productGroup": "plastic", "weight": "1000", "rate": "500"}]
        }))
        .unwrap();
        assert!(request.validate().is_ok());

        let (header, items) = request.into_parts();
        assert_eq!(header.period, "2026-Q1");
        assert_eq!(header.document_type, Some(DocumentType::Gtd));
        assert_eq!(header.document_number, None);
        assert_eq!(items[0].weight, Some(dec!(1000)));
    }

    #[test]
    fn test_request_rejects_oversized_weight() {
        let request: CalculationRequest = serde_json::from_value(serde_json::json!({
            "period": "2026-Q1",
            "items": [{"productGroup": "plastic", "weight": "70000000000000000000000000000", "rate": "500"}]
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_nested_item_errors_fail_validation() {
        let request: CalculationRequest = serde_json::from_value(serde_json::json!({
            "period": "2026-Q1",
            "items": [{"productGroup": ""}]
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_payment_method_defaults_to_bank_transfer() {
        let request: PaymentSubmissionRequest = serde_json::from_value(serde_json::json!({
            "amount": "150.50",
            "paymentDate": "2026-04-10",
        }))
        .unwrap();
        let submission = request.into_submission().unwrap();
        assert_eq!(submission.method, PaymentMethod::BankTransfer);
        assert_eq!(submission.amount, Money::new(dec!(150.50)));
    }
}
