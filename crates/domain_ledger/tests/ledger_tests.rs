//! Integration tests for domain_ledger

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal_macros::dec;

use core_kernel::{CalculationId, CompanyId, DateRange, Money, ReportId};
use domain_ledger::{
    correction_postings, Account, CorrectionLine, Entry, LedgerError, Posting, Reconciliation, Reference,
    Transaction, TransactionKind,
};

/// An account together with its appended log
struct Book {
    account: Account,
    log: Vec<Transaction>,
}

impl Book {
    fn open() -> Self {
        Self {
            account: Account::open(CompanyId::new_v7(), "Eco Plast LLC", "01234567890123", Utc::now()),
            log: Vec::new(),
        }
    }

    fn post(&mut self, posting: Posting) -> Result<Transaction, LedgerError> {
        let txn = self.account.post(posting, Utc::now())?;
        self.log.push(txn.clone());
        Ok(txn)
    }

    fn post_all(&mut self, postings: Vec<Posting>) -> Result<Vec<Transaction>, LedgerError> {
        let posted = self.account.post_all(postings, Utc::now())?;
        self.log.extend(posted.iter().cloned());
        Ok(posted)
    }

    fn history(&self, range: DateRange) -> Vec<&Transaction> {
        self.log.iter().filter(|t| range.contains(t.date)).collect()
    }
}

// ============================================================================
// Posting Tests
// ============================================================================

mod posting_tests {
    use super::*;

    #[test]
    fn test_charge_then_full_payment_settles() {
        let mut book = Book::open();
        let calc = CalculationId::new_v7();

        let charge = book.post(Posting::charge(Money::new(dec!(800)), calc, None)).unwrap();
        assert_eq!(charge.kind, TransactionKind::Charge);
        assert_eq!(charge.entry, Entry::Debit(Money::new(dec!(800))));
        assert_eq!(charge.balance_after.amount(), dec!(-800.00));

        let payment = book
            .post(Posting::payment(Money::new(dec!(800)), None, Some("PP-17"), Some(Reference::Calculation(calc))))
            .unwrap();
        assert_eq!(payment.sequence, 2);
        assert_eq!(payment.balance_after.amount(), dec!(0.00));
        assert!(payment.description.contains("PP-17"));

        assert_eq!(book.account.total_charged.amount(), dec!(800.00));
        assert_eq!(book.account.total_paid.amount(), dec!(800.00));
    }

    #[test]
    fn test_refund_request_over_balance_leaves_ledger_unchanged() {
        let mut book = Book::open();

        let result = book.post(Posting::refund_request(Money::new(dec!(1000)), "overpayment"));

        assert_eq!(
            result,
            Err(LedgerError::InsufficientBalance {
                requested: Money::new(dec!(1000)),
                available: Money::zero(),
            })
        );
        assert_eq!(book.account.balance, Money::zero());
        assert!(book.history(DateRange::unbounded()).is_empty());
    }

    #[test]
    fn test_refund_request_within_balance() {
        let mut book = Book::open();
        book.post(Posting::offset(Money::new(dec!(300)), ReportId::new_v7())).unwrap();

        let refund = book.post(Posting::refund_request(Money::new(dec!(300)), "export")).unwrap();

        assert!(refund.entry.is_debit());
        assert_eq!(book.account.balance, Money::zero());
        assert_eq!(book.account.total_offset, Money::new(dec!(300)));
    }

    #[test]
    fn test_penalty_changes_no_totals() {
        let mut book = Book::open();
        book.post(Posting::penalty(Money::new(dec!(75.5)), "late filing")).unwrap();

        let account = &book.account;
        assert_eq!(account.balance.amount(), dec!(-75.50));
        assert!(account.total_charged.is_zero());
        assert!(account.total_paid.is_zero());
        assert!(account.total_offset.is_zero());
    }

    #[test]
    fn test_correction_references_correction_document() {
        let mut book = Book::open();
        let calc = CalculationId::new_v7();
        let correction_id = core_kernel::CorrectionId::new_v7();
        let line = CorrectionLine {
            calculation_id: calc,
            original_amount: Money::new(dec!(800)),
            corrected_amount: Money::new(dec!(760)),
            reason: "norm recomputed".to_string(),
        };

        let postings = correction_postings(&[line], "Audit", Some(Reference::Correction(correction_id))).unwrap();
        let posted = book.post_all(postings).unwrap();

        assert_eq!(posted[0].reference, Some(Reference::Correction(correction_id)));
        assert_eq!(posted[0].entry, Entry::Credit(Money::new(dec!(40))));
        assert_eq!(book.account.total_charged.amount(), dec!(-40.00));
    }

    #[test]
    fn test_correction_is_all_or_nothing() {
        let mut book = Book::open();
        let calc = CalculationId::new_v7();
        book.post(Posting::charge(Money::new(dec!(800)), calc, None)).unwrap();

        let line = |original, corrected| CorrectionLine {
            calculation_id: CalculationId::new_v7(),
            original_amount: Money::new(original),
            corrected_amount: Money::new(corrected),
            reason: "audit".to_string(),
        };
        let lines = vec![
            CorrectionLine { calculation_id: calc, ..line(dec!(800), dec!(900)) },
            line(dec!(100), dec!(100)),
            line(dec!(300), dec!(250)),
        ];
        let posted = book.post_all(correction_postings(&lines, "Q1 audit", None).unwrap()).unwrap();

        assert_eq!(posted.len(), 2);
        assert_eq!(book.account.balance, Money::new(dec!(-850)));
        assert_eq!(book.account.total_charged, Money::new(dec!(850)));
        assert!(book.account.verify(&book.log).is_ok());
    }
}

// ============================================================================
// Reconciliation Tests
// ============================================================================

mod reconciliation_tests {
    use super::*;

    #[test]
    fn test_partial_payment_reconciliation() {
        let mut book = Book::open();
        let calc = CalculationId::new_v7();
        book.post(Posting::charge(Money::new(dec!(800)), calc, None)).unwrap();
        book.post(Posting::payment(Money::new(dec!(500)), None, None, Some(Reference::Calculation(calc))))
            .unwrap();

        let rec = Reconciliation::from_log(calc, &book.log);

        assert_eq!(rec.charged.amount(), dec!(800.00));
        assert_eq!(rec.paid.amount(), dec!(500.00));
        assert_eq!(rec.offset.amount(), dec!(0.00));
        assert_eq!(rec.balance.amount(), dec!(300.00));
        assert_eq!(book.account.balance.amount(), dec!(-300.00));
    }

    #[test]
    fn test_unreferenced_calculation_reconciles_to_zero() {
        let book = Book::open();
        let rec = Reconciliation::from_log(CalculationId::new_v7(), &book.log);
        assert!(rec.charged.is_zero());
        assert!(rec.balance.is_zero());
    }
}

// ============================================================================
// History Tests
// ============================================================================

mod history_tests {
    use super::*;

    #[test]
    fn test_history_snapshots_follow_sequence() {
        let mut book = Book::open();
        let day = NaiveDate::from_ymd_opt(2026, 4, 10).unwrap();
        book.post(Posting::charge(Money::new(dec!(100)), CalculationId::new_v7(), None).dated(day))
            .unwrap();
        book.post(Posting::payment(Money::new(dec!(40)), Some(day), None, None)).unwrap();
        book.post(Posting::penalty(Money::new(dec!(5)), "late").dated(day.succ_opt().unwrap()))
            .unwrap();

        let history = book.history(DateRange::new(Some(day), Some(day)).unwrap());
        let balances: Vec<_> = history.iter().map(|t| t.balance_after.amount()).collect();

        assert_eq!(balances, vec![dec!(-100.00), dec!(-60.00)]);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Charge(i64),
    Pay(i64),
    Offset(i64),
    Refund(i64),
    Penalty(i64),
    Correct(i64, i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let minor = 1i64..5_000_000i64;
    prop_oneof![
        minor.clone().prop_map(Op::Charge),
        minor.clone().prop_map(Op::Pay),
        minor.clone().prop_map(Op::Offset),
        minor.clone().prop_map(Op::Refund),
        minor.clone().prop_map(Op::Penalty),
        (minor.clone(), minor).prop_map(|(a, b)| Op::Correct(a, b)),
    ]
}

fn apply(book: &mut Book, op: &Op) {
    let calc = CalculationId::new_v7();
    // Refunds above the balance and no-op corrections are expected to fail
    let _ = match op {
        Op::Charge(m) => book.post(Posting::charge(Money::from_minor(*m), calc, None)).map(|_| ()),
        Op::Pay(m) => book.post(Posting::payment(Money::from_minor(*m), None, None, None)).map(|_| ()),
        Op::Offset(m) => book.post(Posting::offset(Money::from_minor(*m), ReportId::new_v7())).map(|_| ()),
        Op::Refund(m) => book.post(Posting::refund_request(Money::from_minor(*m), "prop")).map(|_| ()),
        Op::Penalty(m) => book.post(Posting::penalty(Money::from_minor(*m), "prop")).map(|_| ()),
        Op::Correct(a, b) => {
            let line = CorrectionLine {
                calculation_id: calc,
                original_amount: Money::from_minor(*a),
                corrected_amount: Money::from_minor(*b),
                reason: "prop".to_string(),
            };
            correction_postings(&[line], "", None)
                .and_then(|postings| book.post_all(postings))
                .map(|_| ())
        }
    };
}

proptest! {
    #[test]
    fn balance_equals_credits_minus_debits(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut book = Book::open();
        for op in &ops {
            apply(&mut book, op);
        }

        let history = book.history(DateRange::unbounded());
        let credits: Money = history.iter().map(|t| t.credit()).sum();
        let debits: Money = history.iter().map(|t| t.debit()).sum();

        prop_assert_eq!(book.account.balance, credits - debits);
    }

    #[test]
    fn running_totals_match_transaction_kinds(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut book = Book::open();
        for op in &ops {
            apply(&mut book, op);
        }

        let history = book.history(DateRange::unbounded());
        let charged: Money = history
            .iter()
            .filter(|t| matches!(t.kind, TransactionKind::Charge | TransactionKind::Correction))
            .map(|t| t.debit() - t.credit())
            .sum();
        let paid: Money = history.iter().filter(|t| t.kind == TransactionKind::Payment).map(|t| t.credit()).sum();
        let offset: Money = history.iter().filter(|t| t.kind == TransactionKind::Offset).map(|t| t.credit()).sum();

        let account = &book.account;
        prop_assert_eq!(account.total_charged, charged);
        prop_assert_eq!(account.total_paid, paid);
        prop_assert_eq!(account.total_offset, offset);
    }

    #[test]
    fn replay_reproduces_every_snapshot(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut book = Book::open();
        for op in &ops {
            apply(&mut book, op);
        }
        prop_assert!(book.account.verify(&book.log).is_ok());
    }

    #[test]
    fn failed_refund_never_moves_balance(balance_minor in 0i64..1_000_000, extra in 1i64..1_000_000) {
        let mut book = Book::open();
        if balance_minor > 0 {
            book.post(Posting::offset(Money::from_minor(balance_minor), ReportId::new_v7())).unwrap();
        }
        let before = book.account.balance;

        let result = book.post(Posting::refund_request(Money::from_minor(balance_minor + extra), "too much"));

        let is_insufficient = matches!(result, Err(LedgerError::InsufficientBalance { .. }));
        prop_assert!(is_insufficient);
        prop_assert_eq!(book.account.balance, before);
    }
}
