//! Calculation line items

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{CalculationItemId, Money};
use crate::error::CalculationError;
use crate::fee::{item_amount, MAX_RATE, MAX_WEIGHT_KG};

/// Item data as entered by the payer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemInput {
    pub product_group: String,
    pub product_subgroup: Option<String>,
    pub tnved_code: Option<String>,
    pub gskp_code: Option<String>,
    pub product_name: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    /// Net weight in kilograms
    pub weight: Option<Decimal>,
    /// Fee per tonne
    pub rate: Option<Decimal>,
    /// Recycling norm in percent
    pub recycling_norm: Option<Decimal>,
}

/// A priced line of a calculation
///
/// `amount` is always derived from rate, weight and norm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationItem {
    pub id: CalculationItemId,
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

impl CalculationItem {
    /// Validates an input and prices it
    ///
    /// `position` is the zero-based index reported in errors.
    pub fn price(input: ItemInput, position: usize) -> Result<Self, CalculationError> {
        let invalid = |message: &str| CalculationError::InvalidItem {
            position,
            message: message.to_string(),
        };

        if input.product_group.trim().is_empty() {
            return Err(invalid("product group is required"));
        }
        if input.quantity.is_some_and(|q| q <= Decimal::ZERO) {
            return Err(invalid("quantity must be positive"));
        }
        if input.weight.is_some_and(|w| w <= Decimal::ZERO) {
            return Err(invalid("weight must be positive"));
        }
        if input.weight.is_some_and(|w| w > MAX_WEIGHT_KG) {
            return Err(invalid("weight is too large"));
        }
        if input.rate.is_some_and(|r| r <= Decimal::ZERO) {
            return Err(invalid("rate must be positive"));
        }
        if input.rate.is_some_and(|r| r > MAX_RATE) {
            return Err(invalid("rate is too large"));
        }
        if input.recycling_norm.is_some_and(|n| n > Decimal::ONE_HUNDRED) {
            return Err(invalid("recycling norm cannot exceed 100 percent"));
        }

        let amount = item_amount(input.rate, input.weight, input.recycling_norm)
            .map_err(|_| invalid("amount is too large"))?;

        Ok(Self {
            id: CalculationItemId::new_v7(),
            amount,
            product_group: input.product_group.trim().to_string(),
            product_subgroup: input.product_subgroup,
            tnved_code: input.tnved_code,
            gskp_code: input.gskp_code,
            product_name: input.product_name,
            quantity: input.quantity,
            unit: input.unit,
            weight: input.weight,
            rate: input.rate,
            recycling_norm: input.recycling_norm,
        })
    }

    /// Prices a list of inputs in order
    pub fn price_all(inputs: Vec<ItemInput>) -> Result<Vec<Self>, CalculationError> {
        inputs
            .into_iter()
            .enumerate()
            .map(|(position, input)| Self::price(input, position))
            .collect()
    }

    /// The inputs this item was priced from
    pub fn to_input(&self) -> ItemInput {
        ItemInput {
            product_group: self.product_group.clone(),
            product_subgroup: self.product_subgroup.clone(),
            tnved_code: self.tnved_code.clone(),
            gskp_code: self.gskp_code.clone(),
            product_name: self.product_name.clone(),
            quantity: self.quantity,
            unit: self.unit.clone(),
            weight: self.weight,
            rate: self.rate,
            recycling_norm: self.recycling_norm,
        }
    }
}
