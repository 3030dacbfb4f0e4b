//! Date handling for ledger history and document filters
//!
//! History queries and list filters take an optional lower and upper bound,
//! both inclusive, expressed as calendar dates.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid range: start {from} is after end {to}")]
    InvalidRange {
        from: NaiveDate,
        to: NaiveDate,
    },
}

/// An inclusive, optionally open-ended range of calendar dates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First date included, None means unbounded
    pub from: Option<NaiveDate>,
    /// Last date included, None means unbounded
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Creates a range, rejecting a start that falls after the end
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, TemporalError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(TemporalError::InvalidRange { from, to });
            }
        }
        Ok(Self { from, to })
    }

    /// A range with no bounds, matching every date
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Returns true if `date` lies within the range
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Calendar year used to partition document number series
pub fn numbering_year(date: NaiveDate) -> i32 {
    date.year()
}
