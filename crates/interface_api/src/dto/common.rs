//! Shared DTOs and validators

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::ValidationError;

use app_services::Page;
use core_kernel::DateRange;
use domain_calculation::{MAX_RATE, MAX_WEIGHT_KG};

use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl<T> PageResponse<T> {
    pub fn from_page<S>(page: Page<S>, map: impl FnMut(S) -> T) -> Self {
        let total_pages = page.total_pages();
        Self {
            items: page.items.into_iter().map(map).collect(),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            total_pages,
        }
    }
}

/// Inclusive date window given as `periodFrom`/`periodTo` query parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub period_from: Option<NaiveDate>,
    pub period_to: Option<NaiveDate>,
}

impl DateRangeQuery {
    pub fn range(&self) -> Result<DateRange, ApiError> {
        date_range(self.period_from, self.period_to)
    }
}

pub fn date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<DateRange, ApiError> {
    DateRange::new(from, to).map_err(|e| ApiError::validation(e.to_string()))
}

/// Largest amount accepted in a request body
const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

fn at_most(value: &Decimal, max: Decimal) -> Result<(), ValidationError> {
    if *value > max {
        Err(ValidationError::new("range").with_message(format!("cannot exceed {}", max).into()))
    } else {
        Ok(())
    }
}

pub fn positive_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_positive() && !value.is_zero() {
        at_most(value, Decimal::from(MAX_AMOUNT))
    } else {
        Err(ValidationError::new("positive").with_message("must be greater than zero".into()))
    }
}

pub fn non_negative_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        Err(ValidationError::new("non_negative").with_message("cannot be negative".into()))
    } else {
        at_most(value, Decimal::from(MAX_AMOUNT))
    }
}

/// Item weight in kilograms
pub fn weight_kg(value: &Decimal) -> Result<(), ValidationError> {
    non_negative_decimal(value)?;
    at_most(value, MAX_WEIGHT_KG)
}

/// Fee per tonne
pub fn rate_per_tonne(value: &Decimal) -> Result<(), ValidationError> {
    non_negative_decimal(value)?;
    at_most(value, MAX_RATE)
}

/// Blank strings become `None`
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_validators() {
        assert!(positive_decimal(&dec!(0.01)).is_ok());
        assert!(positive_decimal(&Decimal::ZERO).is_err());
        assert!(positive_decimal(&dec!(-5)).is_err());

        assert!(non_negative_decimal(&Decimal::ZERO).is_ok());
        assert!(non_negative_decimal(&dec!(-0.01)).is_err());

        assert!(positive_decimal(&dec!(1_000_000_000_000_000)).is_ok());
        assert!(positive_decimal(&dec!(1_000_000_000_000_000.01)).is_err());
    }

    #[test]
    fn test_weight_and_rate_are_bounded() {
        assert!(weight_kg(&dec!(2000)).is_ok());
        assert!(weight_kg(&MAX_WEIGHT_KG).is_ok());
        assert!(weight_kg(&dec!(70_000_000_000_000_000_000_000_000_000)).is_err());
        assert!(weight_kg(&dec!(-1)).is_err());

        assert!(rate_per_tonne(&dec!(500)).is_ok());
        assert!(rate_per_tonne(&(MAX_RATE + Decimal::ONE)).is_err());
    }

    #[test]
    fn test_page_response_counts_pages() {
        let page = Page {
            items: vec![1, 2, 3],
            total: 45,
            page: 2,
            page_size: 20,
        };
        let response = PageResponse::from_page(page, |n| n * 10);
        assert_eq!(response.items, vec![10, 20, 30]);
        assert_eq!(response.total_pages, 3);
    }

    #[test]
    fn test_inverted_date_range_is_rejected() {
        let query = DateRangeQuery {
            period_from: NaiveDate::from_ymd_opt(2026, 3, 1),
            period_to: NaiveDate::from_ymd_opt(2026, 1, 1),
        };
        assert!(matches!(query.range(), Err(ApiError::Validation { .. })));
    }

    #[test]
    fn test_date_range_reads_period_keys() {
        let query: DateRangeQuery =
            serde_json::from_value(serde_json::json!({"periodFrom": "2026-02-01", "periodTo": "2026-12-31"})).unwrap();
        let range = query.range().unwrap();
        assert!(!range.contains(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()));
        assert!(range.contains(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(Some(" x ".to_string())), Some("x".to_string()));
    }
}
