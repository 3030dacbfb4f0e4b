//! Utilization fee formula
//!
//! ```text
//! amount = rate × (weightKg / 1000) × (1 − normPercent / 100)
//! ```
//!
//! `rate` is per tonne. Tons and the norm factor are rounded to six decimals
//! half-up before multiplying and the result to two. Every item amount in the
//! system, authenticated or estimated, comes from `item_amount`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use core_kernel::{round_half_up, Money, MoneyError};

const INTERMEDIATE_SCALE: u32 = 6;

/// Largest accepted rate per tonne
pub const MAX_RATE: Decimal = dec!(1_000_000_000);
/// Largest accepted item weight in kilograms
pub const MAX_WEIGHT_KG: Decimal = dec!(1_000_000_000_000);

/// Computes the fee for one item
///
/// Returns zero when the rate or the weight is absent. A missing or
/// non-positive norm applies no discount.
///
/// # Errors
///
/// `MoneyError::Overflow` when the product does not fit a decimal
pub fn item_amount(
    rate: Option<Decimal>,
    weight_kg: Option<Decimal>,
    recycling_norm: Option<Decimal>,
) -> Result<Money, MoneyError> {
    let (Some(rate), Some(weight_kg)) = (rate, weight_kg) else {
        return Ok(Money::zero());
    };

    let tons = round_half_up(weight_kg / dec!(1000), INTERMEDIATE_SCALE);
    let factor = match recycling_norm {
        Some(norm) if norm > Decimal::ZERO => {
            Decimal::ONE - round_half_up(norm / dec!(100), INTERMEDIATE_SCALE)
        }
        _ => Decimal::ONE,
    };

    rate.checked_mul(tons)
        .and_then(|amount| amount.checked_mul(factor))
        .map(Money::new)
        .ok_or(MoneyError::Overflow)
}

/// Rate and recycling norm for one product group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateEntry {
    pub product_group: String,
    /// Fee per tonne
    pub rate: Decimal,
    /// Recycling norm in percent
    #[serde(default)]
    pub recycling_norm: Decimal,
}

/// Estimated fee for a product group and weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    pub product_group: String,
    pub weight: Decimal,
    pub rate: Decimal,
    pub recycling_norm: Decimal,
    pub amount: Money,
}

/// Lookup of rate and norm by product group
///
/// Unknown groups resolve to a zero rate and a zero norm.
#[derive(Debug, Clone, Default)]
pub struct RateCatalog {
    entries: HashMap<String, RateEntry>,
}

impl RateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog; a later entry for the same group replaces an earlier one
    pub fn from_entries(entries: impl IntoIterator<Item = RateEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| (entry.product_group.trim().to_string(), entry))
            .collect();
        Self { entries }
    }

    pub fn get(&self, product_group: &str) -> Option<&RateEntry> {
        self.entries.get(product_group.trim())
    }

    /// Returns (rate, norm) for a group, zeros when unknown
    pub fn lookup(&self, product_group: &str) -> (Decimal, Decimal) {
        self.get(product_group)
            .map(|entry| (entry.rate, entry.recycling_norm))
            .unwrap_or((Decimal::ZERO, Decimal::ZERO))
    }

    pub fn estimate(&self, product_group: &str, weight_kg: Decimal) -> Result<FeeEstimate, MoneyError> {
        let (rate, recycling_norm) = self.lookup(product_group);
        Ok(FeeEstimate {
            product_group: product_group.to_string(),
            weight: weight_kg,
            rate,
            recycling_norm,
            amount: item_amount(Some(rate), Some(weight_kg), Some(recycling_norm))?,
        })
    }

    /// Entries sorted by product group
    pub fn entries(&self) -> Vec<&RateEntry> {
        let mut entries: Vec<&RateEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.product_group.cmp(&b.product_group));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(rate: Option<Decimal>, weight_kg: Option<Decimal>, norm: Option<Decimal>) -> Money {
        item_amount(rate, weight_kg, norm).unwrap()
    }

    #[test]
    fn test_reference_item() {
        let amount = amount(Some(dec!(500)), Some(dec!(2000)), Some(dec!(20)));
        assert_eq!(amount.amount(), dec!(800.00));
    }

    #[test]
    fn test_missing_inputs_yield_zero() {
        assert!(amount(None, Some(dec!(2000)), None).is_zero());
        assert!(amount(Some(dec!(500)), None, Some(dec!(10))).is_zero());
    }

    #[test]
    fn test_non_positive_norm_gives_no_discount() {
        assert_eq!(amount(Some(dec!(500)), Some(dec!(1000)), Some(dec!(-5))).amount(), dec!(500.00));
        assert_eq!(amount(Some(dec!(500)), Some(dec!(1000)), None).amount(), dec!(500.00));
    }

    #[test]
    fn test_tons_are_rounded_before_multiplying() {
        // 0.0005 kg rounds to 0.000001 t
        assert_eq!(amount(Some(dec!(1000000)), Some(dec!(0.0005)), None).amount(), dec!(1.00));
    }

    #[test]
    fn test_oversized_product_reports_overflow() {
        let result = item_amount(
            Some(dec!(50_000_000_000_000_000_000_000_000_000)),
            Some(dec!(10_000)),
            None,
        );
        assert_eq!(result, Err(MoneyError::Overflow));
    }

    #[test]
    fn test_largest_accepted_inputs_fit() {
        let top = amount(Some(MAX_RATE), Some(MAX_WEIGHT_KG), None);
        assert_eq!(top.amount(), dec!(1_000_000_000_000_000_000));
        assert!(Money::checked_sum([top; 1000]).is_ok());
    }

    #[test]
    fn test_unknown_group_estimates_zero() {
        let catalog = RateCatalog::from_entries(vec![RateEntry {
            product_group: "Plastic packaging".to_string(),
            rate: dec!(500),
            recycling_norm: dec!(20),
        }]);

        assert_eq!(catalog.estimate("Plastic packaging", dec!(2000)).unwrap().amount.amount(), dec!(800.00));
        let unknown = catalog.estimate("Glass", dec!(2000)).unwrap();
        assert!(unknown.amount.is_zero());
        assert_eq!(unknown.rate, Decimal::ZERO);
    }

    #[test]
    fn test_estimate_with_huge_weight_fails() {
        let catalog = RateCatalog::from_entries(vec![RateEntry {
            product_group: "Plastic packaging".to_string(),
            rate: dec!(5000),
            recycling_norm: dec!(0),
        }]);

        let result = catalog.estimate("Plastic packaging", dec!(70_000_000_000_000_000_000_000_000_000));
        assert_eq!(result, Err(MoneyError::Overflow));
    }
}
