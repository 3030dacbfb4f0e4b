//! Unauthenticated estimator DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::Money;
use domain_calculation::{FeeEstimate, RateCatalog, RateEntry};

use super::common::weight_kg;
use crate::error::ApiError;

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EstimateItemRequest {
    #[validate(length(min = 1, max = 100))]
    pub product_group: String,
    /// Kilograms
    #[validate(custom(function = "weight_kg"))]
    pub weight: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EstimateRequest {
    #[validate(length(min = 1, message = "at least one item is required"), nested)]
    pub items: Vec<EstimateItemRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    pub items: Vec<FeeEstimate>,
    pub total_amount: Money,
}

impl EstimateResponse {
    pub fn estimate(catalog: &RateCatalog, request: &EstimateRequest) -> Result<Self, ApiError> {
        let too_large = |_| ApiError::validation("estimated amount is too large");
        let items: Vec<FeeEstimate> = request
            .items
            .iter()
            .map(|item| catalog.estimate(&item.product_group, item.weight))
            .collect::<Result<_, _>>()
            .map_err(too_large)?;
        let total_amount = Money::checked_sum(items.iter().map(|e| e.amount)).map_err(too_large)?;
        Ok(Self { items, total_amount })
    }
}

#[derive(Debug, Serialize)]
pub struct RatesResponse {
    pub rates: Vec<RateEntry>,
}

impl From<&RateCatalog> for RatesResponse {
    fn from(catalog: &RateCatalog) -> Self {
        Self {
            rates: catalog.entries().into_iter().cloned().collect(),
        }
    }
}
