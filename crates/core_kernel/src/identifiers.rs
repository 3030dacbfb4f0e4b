//! Strongly-typed identifiers for ledger and workflow entities
//!
//! Each identifier is a UUID newtype. Serialized form is the bare UUID;
//! `Display` adds a short prefix so log lines say what kind of id they carry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Payer identity, owned by the external company directory
define_id!(CompanyId, "CMP");

// Ledger identifiers
define_id!(AccountId, "ACC");
define_id!(TransactionId, "TXN");

// Calculation workflow identifiers
define_id!(CalculationId, "CALC");
define_id!(CalculationItemId, "ITEM");
define_id!(PaymentId, "PAY");

// Adjustment identifiers
define_id!(RefundId, "RFD");
define_id!(CorrectionId, "COR");

// Recycling report that backs an offset, owned by the reporting registry
define_id!(ReportId, "RPT");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculation_id_display() {
        let id = CalculationId::new();
        let display = id.to_string();
        assert!(display.starts_with("CALC-"));
    }

    #[test]
    fn test_id_parsing_accepts_prefixed_and_bare() {
        let original = CompanyId::new();
        let prefixed: CompanyId = original.to_string().parse().unwrap();
        let bare: CompanyId = original.as_uuid().to_string().parse().unwrap();
        assert_eq!(original, prefixed);
        assert_eq!(original, bare);
    }

    #[test]
    fn test_uuid_conversion() {
        let uuid = Uuid::new_v4();
        let refund_id = RefundId::from(uuid);
        let back: Uuid = refund_id.into();
        assert_eq!(uuid, back);
    }
}
