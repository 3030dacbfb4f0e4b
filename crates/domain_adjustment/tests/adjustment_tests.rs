//! Integration tests for domain_adjustment

use chrono::Utc;
use rust_decimal_macros::dec;

use core_kernel::{CalculationId, CompanyId, Money};
use domain_adjustment::{
    AdjustmentError, AdjustmentEventKind, Correction, DocumentKind, Refund, RefundItem, RefundReason,
    ReviewStatus,
};
use domain_ledger::{Account, CorrectionLine, Posting, TransactionKind};

fn charged_account(company: CompanyId, calc: CalculationId) -> Account {
    let mut account = Account::open(company, "Eco Plast LLC", "01234567890123", Utc::now());
    account
        .post(Posting::charge(Money::new(dec!(800)), calc, None), Utc::now())
        .unwrap();
    account
}

// ============================================================================
// Refund Tests
// ============================================================================

mod refund_tests {
    use super::*;

    #[test]
    fn test_approved_refund_credits_the_account() {
        let company = CompanyId::new_v7();
        let calc = CalculationId::new_v7();
        let mut account = charged_account(company, calc);

        let mut refund = Refund::request(
            "REF-2026-000001".to_string(),
            company,
            vec![RefundItem {
                calculation_id: calc,
                amount: Money::new(dec!(200)),
                reason: RefundReason::Export,
            }],
            None,
            "payer",
        )
        .unwrap();

        let event = refund.approve("reviewer").unwrap();
        let txn = account.post(refund.ledger_posting(), Utc::now()).unwrap();

        assert_eq!(event.kind, AdjustmentEventKind::Approved);
        assert_eq!(event.document, DocumentKind::Refund);
        assert_eq!(txn.kind, TransactionKind::Refund);
        assert_eq!(account.balance.amount(), dec!(-600.00));
        // refunds do not touch the running totals
        assert_eq!(account.total_charged.amount(), dec!(800.00));
    }

    #[test]
    fn test_zero_item_amount_rejected() {
        let result = Refund::request(
            "REF-2026-000002".to_string(),
            CompanyId::new_v7(),
            vec![RefundItem {
                calculation_id: CalculationId::new_v7(),
                amount: Money::zero(),
                reason: RefundReason::Overpayment,
            }],
            None,
            "payer",
        );
        assert!(matches!(result, Err(AdjustmentError::InvalidAmount { position: 0, .. })));
    }

    #[test]
    fn test_reason_parsing_is_case_insensitive() {
        assert_eq!(RefundReason::parse_lenient(" Recycling "), RefundReason::Recycling);
        assert_eq!(RefundReason::parse_lenient("EXPORT"), RefundReason::Export);
        assert_eq!(RefundReason::parse_lenient(""), RefundReason::Error);
    }
}

// ============================================================================
// Correction Tests
// ============================================================================

mod correction_tests {
    use super::*;

    #[test]
    fn test_approved_correction_adjusts_total_charged() {
        let company = CompanyId::new_v7();
        let calc = CalculationId::new_v7();
        let mut account = charged_account(company, calc);

        let mut correction = Correction::request(
            "COR-2026-000001".to_string(),
            company,
            vec![CorrectionLine {
                calculation_id: calc,
                original_amount: Money::new(dec!(800)),
                corrected_amount: Money::new(dec!(640)),
                reason: "recycling norm missed".to_string(),
            }],
            Some("Desk audit".to_string()),
            "payer",
        )
        .unwrap();

        correction.approve("reviewer").unwrap();
        let posted = account.post_all(correction.ledger_postings().unwrap(), Utc::now()).unwrap();

        assert_eq!(posted.len(), 1);
        assert!(posted[0].description.starts_with("Desk audit. Correction of calculation"));
        assert_eq!(account.total_charged.amount(), dec!(640.00));
        assert_eq!(account.balance.amount(), dec!(-640.00));
        assert_eq!(account.posted_count, 2);
    }

    #[test]
    fn test_rejected_correction_cannot_be_approved() {
        let mut correction = Correction::request(
            "COR-2026-000002".to_string(),
            CompanyId::new_v7(),
            vec![CorrectionLine {
                calculation_id: CalculationId::new_v7(),
                original_amount: Money::new(dec!(1)),
                corrected_amount: Money::new(dec!(2)),
                reason: "typo".to_string(),
            }],
            None,
            "payer",
        )
        .unwrap();

        correction.reject("reviewer", None).unwrap();
        assert_eq!(correction.status, ReviewStatus::Rejected);
        assert!(correction.approve("reviewer").is_err());
    }
}
