//! Unit tests for the Money module
//!
//! Tests cover rounding, predicates, checked arithmetic, and serialization.

use core_kernel::{round_half_up, Money, MoneyError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_from_minor_converts_tyiyn() {
        assert_eq!(Money::from_minor(80000).amount(), dec!(800.00));
    }

    #[test]
    fn test_zero_is_zero() {
        assert!(Money::zero().is_zero());
        assert!(!Money::zero().is_positive());
        assert!(!Money::zero().is_negative());
    }

    #[test]
    fn test_positive_error_message_mentions_input() {
        let err = Money::positive(dec!(-3.50)).unwrap_err();
        assert!(matches!(err, MoneyError::InvalidAmount(ref m) if m.contains("-3.50")));
    }
}

mod rounding {
    use super::*;

    #[test]
    fn test_round_half_up_on_midpoints() {
        assert_eq!(round_half_up(dec!(2.5), 0), dec!(3));
        assert_eq!(round_half_up(dec!(0.1234565), 6), dec!(0.123457));
        assert_eq!(round_half_up(dec!(-2.5), 0), dec!(-3));
    }

    #[test]
    fn test_multiplication_rounds_result() {
        let m = Money::new(dec!(100.00)) * dec!(0.3333);
        assert_eq!(m.amount(), dec!(33.33));
    }
}

mod checked_arithmetic {
    use super::*;

    #[test]
    fn test_checked_add_and_sub() {
        let a = Money::new(dec!(10.10));
        let b = Money::new(dec!(0.95));
        assert_eq!(a.checked_add(&b).unwrap().amount(), dec!(11.05));
        assert_eq!(a.checked_sub(&b).unwrap().amount(), dec!(9.15));
    }

    #[test]
    fn test_checked_add_reports_overflow() {
        let huge = Money::new(Decimal::MAX - dec!(1));
        assert_eq!(huge.checked_add(&huge), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_abs_and_ordering() {
        let debt = Money::new(dec!(-300.00));
        assert_eq!(debt.abs().amount(), dec!(300.00));
        assert!(debt < Money::zero());
    }
}
