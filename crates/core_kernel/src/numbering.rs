//! Document number series
//!
//! Every workflow document gets a human-readable number of the form
//! `{PREFIX}-{year}-{seq:06}`. The sequence restarts each calendar year and
//! is allocated by the store inside the unit of work that creates the document.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A numbering series, one counter per (series, year)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSeries {
    Calculation,
    Payment,
    Refund,
    Correction,
}

impl DocumentSeries {
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentSeries::Calculation => "CALC",
            DocumentSeries::Payment => "PAY",
            DocumentSeries::Refund => "REF",
            DocumentSeries::Correction => "COR",
        }
    }

    /// Key stored in the sequence table
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentSeries::Calculation => "calculation",
            DocumentSeries::Payment => "payment",
            DocumentSeries::Refund => "refund",
            DocumentSeries::Correction => "correction",
        }
    }

    /// Formats the `sequence`-th number of `year`
    pub fn format(&self, year: i32, sequence: u64) -> String {
        format!("{}-{}-{:06}", self.prefix(), year, sequence)
    }
}

impl fmt::Display for DocumentSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
