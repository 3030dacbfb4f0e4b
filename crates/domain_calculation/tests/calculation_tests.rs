//! Integration tests for domain_calculation

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{CompanyId, Money};
use domain_calculation::{
    item_amount, Calculation, CalculationError, CalculationEventKind, CalculationHeader,
    CalculationStatus, DocumentType, ItemInput, PaymentMethod, PaymentStatus, PaymentSubmission,
};

fn item(weight: Decimal, rate: Decimal, norm: Option<Decimal>) -> ItemInput {
    ItemInput {
        product_group: "Plastic packaging".to_string(),
        quantity: Some(dec!(1)),
        weight: Some(weight),
        rate: Some(rate),
        recycling_norm: norm,
        ..Default::default()
    }
}

fn header() -> CalculationHeader {
    CalculationHeader {
        period: "2026-01".to_string(),
        quarter: Some("Q1".to_string()),
        document_type: Some(DocumentType::Gtd),
        document_number: Some("GTD-0042".to_string()),
        document_date: NaiveDate::from_ymd_opt(2026, 1, 20),
    }
}

fn approved_calculation() -> Calculation {
    let mut calc = Calculation::draft(
        "CALC-2026-000001".to_string(),
        CompanyId::new_v7(),
        header(),
        vec![item(dec!(2000), dec!(500), Some(dec!(20)))],
        "payer@example.kg",
    )
    .unwrap();
    calc.submit().unwrap();
    calc.approve("reviewer@example.kg", None).unwrap();
    calc
}

fn submission(amount: Decimal) -> PaymentSubmission {
    PaymentSubmission {
        amount: Money::new(amount),
        payment_date: NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
        method: PaymentMethod::BankTransfer,
        document_number: Some("PP-881".to_string()),
        document_url: None,
    }
}

// ============================================================================
// Workflow Tests
// ============================================================================

mod workflow_tests {
    use super::*;

    #[test]
    fn test_draft_totals_items() {
        let calc = Calculation::draft(
            "CALC-2026-000002".to_string(),
            CompanyId::new_v7(),
            header(),
            vec![
                item(dec!(2000), dec!(500), Some(dec!(20))),
                item(dec!(500), dec!(1200), None),
            ],
            "payer",
        )
        .unwrap();

        assert_eq!(calc.status, CalculationStatus::Draft);
        assert_eq!(calc.items[0].amount.amount(), dec!(800.00));
        assert_eq!(calc.items[1].amount.amount(), dec!(600.00));
        assert_eq!(calc.total_amount.amount(), dec!(1400.00));
    }

    #[test]
    fn test_oversized_items_fail_instead_of_overflowing() {
        let huge_rate = dec!(50_000_000_000_000_000_000_000_000_000);
        let result = Calculation::draft(
            "CALC-2026-000009".to_string(),
            CompanyId::new_v7(),
            header(),
            vec![item(dec!(1000), huge_rate, None), item(dec!(1000), huge_rate, None)],
            "payer",
        );
        assert!(matches!(result, Err(CalculationError::InvalidItem { position: 0, .. })));

        let mut calc = approved_calculation();
        calc.status = CalculationStatus::Draft;
        let edited = calc.edit(header(), vec![item(dec!(70_000_000_000_000_000_000_000_000_000), dec!(500), None)]);
        assert!(matches!(edited, Err(CalculationError::InvalidItem { position: 0, .. })));
        assert_eq!(calc.total_amount.amount(), dec!(800.00));
    }

    #[test]
    fn test_submit_empty_fails() {
        let mut calc =
            Calculation::draft("CALC-2026-000003".to_string(), CompanyId::new_v7(), header(), vec![], "payer")
                .unwrap();

        assert_eq!(calc.submit(), Err(CalculationError::EmptyCalculation));
        assert_eq!(calc.status, CalculationStatus::Draft);
        assert!(calc.submitted_at.is_none());
    }

    #[test]
    fn test_review_then_approve() {
        let mut calc = Calculation::draft(
            "CALC-2026-000004".to_string(),
            CompanyId::new_v7(),
            header(),
            vec![item(dec!(1000), dec!(100), None)],
            "payer",
        )
        .unwrap();
        calc.submit().unwrap();

        let event = calc.take_into_review("inspector").unwrap();
        assert_eq!(event.kind, CalculationEventKind::TakenIntoReview);
        assert_eq!(calc.status, CalculationStatus::UnderReview);

        let event = calc.approve("inspector", Some("ok".to_string())).unwrap();
        assert_eq!(event.from, CalculationStatus::UnderReview);
        assert_eq!(event.to, CalculationStatus::Approved);
        assert_eq!(calc.review_comment.as_deref(), Some("ok"));
        assert!(calc.reviewed_at.is_some());
    }

    #[test]
    fn test_edit_rejected_returns_to_draft() {
        let mut calc = Calculation::draft(
            "CALC-2026-000005".to_string(),
            CompanyId::new_v7(),
            header(),
            vec![item(dec!(1000), dec!(100), None)],
            "payer",
        )
        .unwrap();
        calc.submit().unwrap();
        calc.reject("inspector", Some("wrong rate")).unwrap();
        assert_eq!(calc.review_comment.as_deref(), Some("wrong rate"));

        let event = calc
            .edit(header(), vec![item(dec!(1000), dec!(150), None)])
            .unwrap()
            .expect("returning to draft emits an event");

        assert_eq!(event.kind, CalculationEventKind::ReturnedToDraft);
        assert_eq!(calc.status, CalculationStatus::Draft);
        assert!(calc.review_comment.is_none());
        assert!(calc.reviewed_by.is_none());
        assert_eq!(calc.total_amount.amount(), dec!(150.00));
    }

    #[test]
    fn test_resubmit_clears_review() {
        let mut calc = Calculation::draft(
            "CALC-2026-000006".to_string(),
            CompanyId::new_v7(),
            header(),
            vec![item(dec!(1000), dec!(100), None)],
            "payer",
        )
        .unwrap();
        calc.submit().unwrap();
        calc.reject("inspector", Some("missing GTD scan")).unwrap();

        calc.resubmit().unwrap();

        assert_eq!(calc.status, CalculationStatus::Submitted);
        assert!(calc.review_comment.is_none());
    }

    #[test]
    fn test_delete_only_drafts() {
        let calc = approved_calculation();
        assert!(matches!(calc.ensure_deletable(), Err(CalculationError::InvalidStatus { .. })));
    }

    #[test]
    fn test_copy_resets_document_and_status() {
        let calc = approved_calculation();
        let copy = calc.copy_as("CALC-2026-000099".to_string(), "payer").unwrap();

        assert_ne!(copy.id, calc.id);
        assert_eq!(copy.status, CalculationStatus::Draft);
        assert_eq!(copy.total_amount, calc.total_amount);
        assert!(copy.document_number.is_none());
        assert!(copy.document_date.is_none());
        assert!(copy.reviewed_by.is_none());
        assert!(copy.payments.is_empty());
    }
}

// ============================================================================
// Payment Tests
// ============================================================================

mod payment_tests {
    use super::*;

    #[test]
    fn test_payment_requires_approval() {
        let mut calc =
            Calculation::draft("CALC-2026-000010".to_string(), CompanyId::new_v7(), header(), vec![], "payer")
                .unwrap();
        let result = calc.submit_payment("PAY-2026-000001".to_string(), submission(dec!(10)), "payer");
        assert!(matches!(result, Err(CalculationError::InvalidStatus { .. })));
    }

    #[test]
    fn test_full_payment_settles() {
        let mut calc = approved_calculation();
        calc.submit_payment("PAY-2026-000001".to_string(), submission(dec!(800)), "payer").unwrap();

        let (payment, event) = calc.approve_payment("accountant").unwrap();

        assert_eq!(payment.status, PaymentStatus::Confirmed);
        assert_eq!(event.to, CalculationStatus::Paid);
        assert_eq!(calc.status, CalculationStatus::Paid);
    }

    #[test]
    fn test_partial_payments_accumulate() {
        let mut calc = approved_calculation();
        calc.submit_payment("PAY-2026-000001".to_string(), submission(dec!(500)), "payer").unwrap();
        calc.approve_payment("accountant").unwrap();
        assert_eq!(calc.status, CalculationStatus::PartiallyPaid);

        calc.submit_payment("PAY-2026-000002".to_string(), submission(dec!(300)), "payer").unwrap();
        calc.approve_payment("accountant").unwrap();

        assert_eq!(calc.confirmed_amount().amount(), dec!(800.00));
        assert_eq!(calc.status, CalculationStatus::Paid);
    }

    #[test]
    fn test_second_pending_attempt_rejected() {
        let mut calc = approved_calculation();
        calc.submit_payment("PAY-2026-000001".to_string(), submission(dec!(100)), "payer").unwrap();
        let result = calc.submit_payment("PAY-2026-000002".to_string(), submission(dec!(100)), "payer");
        assert_eq!(result, Err(CalculationError::PaymentAlreadyPending));
    }

    #[test]
    fn test_approve_without_pending_attempt() {
        let mut calc = approved_calculation();
        assert!(matches!(calc.approve_payment("a"), Err(CalculationError::NoPendingPayment)));
        assert!(matches!(calc.reject_payment("a", None), Err(CalculationError::NoPendingPayment)));
    }

    #[test]
    fn test_mark_paid_skips_amount_check() {
        let mut calc = approved_calculation();
        let event = calc.mark_paid("admin").unwrap();
        assert_eq!(event.kind, CalculationEventKind::MarkedPaid);
        assert_eq!(calc.status, CalculationStatus::Paid);
        assert!(calc.confirmed_amount().is_zero());
    }
}

// ============================================================================
// Fee Property Tests
// ============================================================================

proptest! {
    #[test]
    fn total_is_sum_of_item_amounts(
        raw in prop::collection::vec((1u32..10_000_000u32, 1u32..100_000u32, 0u32..100u32), 1..10)
    ) {
        let inputs: Vec<ItemInput> = raw
            .iter()
            .map(|(w, r, n)| item(Decimal::new(*w as i64, 3), Decimal::new(*r as i64, 2), Some(Decimal::from(*n))))
            .collect();
        let calc = Calculation::draft("CALC-2026-000100".to_string(), CompanyId::new_v7(), header(), inputs.clone(), "p")
            .unwrap();

        for (priced, input) in calc.items.iter().zip(&inputs) {
            prop_assert_eq!(priced.amount, item_amount(input.rate, input.weight, input.recycling_norm).unwrap());
        }
        let sum: Money = calc.items.iter().map(|i| i.amount).sum();
        prop_assert_eq!(calc.total_amount, sum);
    }

    #[test]
    fn higher_norm_never_increases_amount(
        weight in 1u32..10_000_000u32,
        rate in 1u32..100_000u32,
        low in 0u32..100u32,
        bump in 0u32..50u32
    ) {
        let weight = Decimal::from(weight);
        let rate = Decimal::from(rate);
        let high = (low + bump).min(100);
        let a = item_amount(Some(rate), Some(weight), Some(Decimal::from(low))).unwrap();
        let b = item_amount(Some(rate), Some(weight), Some(Decimal::from(high))).unwrap();
        prop_assert!(b <= a);
        prop_assert!(!b.is_negative());
    }
}
