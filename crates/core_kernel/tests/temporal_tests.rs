//! Tests for date ranges used by history and list filters

use chrono::NaiveDate;
use core_kernel::{numbering_year, DateRange};
use proptest::prelude::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_single_day_range() {
    let day = date(2026, 10, 19);
    let range = DateRange::new(Some(day), Some(day)).unwrap();
    assert!(range.contains(day));
    assert!(!range.contains(date(2026, 10, 20)));
}

#[test]
fn test_numbering_year() {
    assert_eq!(numbering_year(date(2026, 12, 31)), 2026);
    assert_eq!(numbering_year(date(2027, 1, 1)), 2027);
}

proptest! {
    #[test]
    fn contains_matches_bounds(offset_from in 0i64..400, span in 0i64..400, probe in 0i64..1200) {
        let base = date(2025, 1, 1);
        let from = base + chrono::Duration::days(offset_from);
        let to = from + chrono::Duration::days(span);
        let probe_date = base + chrono::Duration::days(probe);

        let range = DateRange::new(Some(from), Some(to)).unwrap();
        prop_assert_eq!(range.contains(probe_date), probe_date >= from && probe_date <= to);
    }
}
