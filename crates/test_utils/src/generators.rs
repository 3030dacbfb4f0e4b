//! Property-Based Test Generators
//!
//! Proptest strategies that produce values satisfying the domain's
//! preconditions: positive two-decimal amounts, priced items and postings.

use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{CalculationId, Money, ReportId};
use domain_calculation::{CalculationStatus, ItemInput};
use domain_ledger::{CorrectionLine, Posting};

/// Positive amounts in minor units, up to ten million
pub fn positive_amount_minor_strategy() -> impl Strategy<Value = i64> {
    1i64..1_000_000_000i64
}

pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    positive_amount_minor_strategy().prop_map(Money::from_minor)
}

/// Zero or positive money
pub fn non_negative_money_strategy() -> impl Strategy<Value = Money> {
    (0i64..1_000_000_000i64).prop_map(Money::from_minor)
}

/// Weights in kilograms with up to three decimals
pub fn weight_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|grams| Decimal::new(grams, 3))
}

/// Positive rates per tonne with two decimals
pub fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|minor| Decimal::new(minor, 2))
}

/// Recycling norms from 0 % to 100 %
pub fn norm_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000i64).prop_map(|basis_points| Decimal::new(basis_points, 2))
}

pub fn product_group_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Plastic packaging".to_string()),
        Just("Glass containers".to_string()),
        Just("Paper and cardboard".to_string()),
        Just("Batteries".to_string()),
        Just("Tyres".to_string()),
    ]
}

/// Items that always price successfully
pub fn item_input_strategy() -> impl Strategy<Value = ItemInput> {
    (
        product_group_strategy(),
        weight_strategy(),
        rate_strategy(),
        proptest::option::of(norm_strategy()),
    )
        .prop_map(|(product_group, weight, rate, recycling_norm)| ItemInput {
            product_group,
            weight: Some(weight),
            rate: Some(rate),
            recycling_norm,
            ..Default::default()
        })
}

pub fn calculation_status_strategy() -> impl Strategy<Value = CalculationStatus> {
    proptest::sample::select(CalculationStatus::ALL.to_vec())
}

/// A correction line with a non-zero delta
pub fn correction_line_strategy() -> impl Strategy<Value = CorrectionLine> {
    (non_negative_money_strategy(), non_negative_money_strategy())
        .prop_filter("delta must be non-zero", |(original, corrected)| original != corrected)
        .prop_map(|(original_amount, corrected_amount)| CorrectionLine {
            calculation_id: CalculationId::new(),
            original_amount,
            corrected_amount,
            reason: "recount".to_string(),
        })
}

/// Postings that never need a balance check
///
/// Refund disbursements are left out because they may legitimately fail.
pub fn posting_strategy() -> impl Strategy<Value = Posting> {
    prop_oneof![
        positive_money_strategy().prop_map(|amount| Posting::charge(amount, CalculationId::new(), None)),
        positive_money_strategy().prop_map(|amount| Posting::payment(amount, None, None, None)),
        positive_money_strategy().prop_map(|amount| Posting::offset(amount, ReportId::new())),
        positive_money_strategy().prop_map(|amount| Posting::penalty(amount, "late filing")),
        correction_line_strategy().prop_filter_map("zero delta", |line| Posting::correction(&line, "audit", None)),
    ]
}
