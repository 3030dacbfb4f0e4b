//! Custom Test Assertions
//!
//! Assertion helpers for ledger and workflow types that report the values
//! involved instead of a bare `assertion failed`.

use rust_decimal::Decimal;

use app_services::ServiceError;
use core_kernel::Money;
use domain_calculation::{Calculation, CalculationStatus};
use domain_ledger::{Account, Transaction};

/// Asserts a money value equals a decimal, ignoring scale
pub fn assert_money_eq(actual: Money, expected: Decimal) {
    assert_eq!(
        actual.amount(),
        expected,
        "Money mismatch: actual={}, expected={}",
        actual,
        expected
    );
}

pub fn assert_balance(account: &Account, expected: Decimal) {
    assert_eq!(
        account.balance.amount(),
        expected,
        "Balance of {} is {}, expected {}",
        account.company_name,
        account.balance,
        expected
    );
}

pub fn assert_status(calculation: &Calculation, expected: CalculationStatus) {
    assert_eq!(
        calculation.status, expected,
        "Calculation {} is {}, expected {}",
        calculation.number, calculation.status, expected
    );
}

/// Asserts the log is gapless from 1 and each snapshot follows from the previous one
pub fn assert_snapshot_chain(log: &[Transaction]) {
    let mut balance = Money::zero();
    for (index, transaction) in log.iter().enumerate() {
        assert_eq!(
            transaction.sequence,
            index as u64 + 1,
            "Sequence gap at position {}",
            index
        );
        balance += transaction.entry.signed();
        assert_eq!(
            transaction.balance_after, balance,
            "Snapshot mismatch at sequence {}: stored {}, replayed {}",
            transaction.sequence, transaction.balance_after, balance
        );
    }
}

/// Asserts the account's aggregates equal a replay of its log
pub fn assert_ledger_consistent(account: &Account, log: &[Transaction]) {
    assert_snapshot_chain(log);
    if let Err(error) = account.verify(log) {
        panic!("Ledger of {} does not replay: {}", account.company_name, error);
    }
}

pub fn assert_business_rule<T: std::fmt::Debug>(result: Result<T, ServiceError>) {
    match result {
        Err(ServiceError::BusinessRule(_)) => {}
        other => panic!("Expected a business rule violation, got {:?}", other),
    }
}

pub fn assert_not_found<T: std::fmt::Debug>(result: Result<T, ServiceError>, entity: &str) {
    match result {
        Err(ServiceError::NotFound { entity: actual, .. }) if actual == entity => {}
        other => panic!("Expected {} not found, got {:?}", entity, other),
    }
}

pub fn assert_forbidden<T: std::fmt::Debug>(result: Result<T, ServiceError>) {
    match result {
        Err(ServiceError::Forbidden(_)) => {}
        other => panic!("Expected forbidden, got {:?}", other),
    }
}

pub fn assert_validation<T: std::fmt::Debug>(result: Result<T, ServiceError>) {
    match result {
        Err(ServiceError::Validation { .. }) => {}
        other => panic!("Expected a validation error, got {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_kernel::{CalculationId, CompanyId};
    use domain_ledger::Posting;
    use rust_decimal_macros::dec;

    #[test]
    fn test_consistent_ledger_passes() {
        let mut account = Account::open(CompanyId::new(), "Acme", "1", Utc::now());
        let log = vec![
            account
                .post(Posting::charge(Money::new(dec!(100)), CalculationId::new(), None), Utc::now())
                .unwrap(),
            account
                .post(Posting::payment(Money::new(dec!(40)), None, None, None), Utc::now())
                .unwrap(),
        ];
        assert_ledger_consistent(&account, &log);
        assert_balance(&account, dec!(-60));
    }

    #[test]
    #[should_panic(expected = "Sequence gap")]
    fn test_gap_is_reported() {
        let mut account = Account::open(CompanyId::new(), "Acme", "1", Utc::now());
        let first = account
            .post(Posting::penalty(Money::new(dec!(5)), "late"), Utc::now())
            .unwrap();
        let second = account
            .post(Posting::penalty(Money::new(dec!(5)), "late"), Utc::now())
            .unwrap();
        assert_snapshot_chain(&[second, first]);
    }

    #[test]
    fn test_error_kind_helpers() {
        assert_business_rule::<()>(Err(ServiceError::business("no")));
        assert_not_found::<()>(Err(ServiceError::not_found("Refund", "x")), "Refund");
        assert_forbidden::<()>(Err(ServiceError::forbidden("no")));
        assert_validation::<()>(Err(ServiceError::validation("bad", None)));
    }
}
