//! Repository implementations for the fee ledger tables
//!
//! Repositories are stateless: every function takes the connection it runs
//! on, so the same code serves pool reads and the open transaction of a unit
//! of work. Row types carry the raw column values and convert into domain
//! types with `into_domain`, which fails with `CorruptRow` on values the
//! domain would never produce.
//!
//! All queries are runtime-checked (`sqlx::query_as` with `FromRow`), so
//! the crate builds without a live database.

/// Declares a PostgreSQL enum mirror of a domain enum with conversions both ways
///
/// Variant names must match the domain enum; the PG labels are their
/// snake_case forms.
macro_rules! db_enum {
    ($(#[$meta:meta])* $name:ident, $type_name:literal, $domain:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
        #[sqlx(type_name = $type_name, rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl From<$domain> for $name {
            fn from(value: $domain) -> Self {
                match value {
                    $($domain::$variant => $name::$variant),+
                }
            }
        }

        impl From<$name> for $domain {
            fn from(value: $name) -> Self {
                match value {
                    $($name::$variant => $domain::$variant),+
                }
            }
        }
    };
}

pub mod ledger;
pub mod calculation;
pub mod adjustment;
pub mod sequence;

pub use ledger::LedgerRepository;
pub use calculation::CalculationRepository;
pub use adjustment::AdjustmentRepository;
pub use sequence::SequenceRepository;

use crate::error::DatabaseError;

/// Converts a stored BIGINT counter back to `u64`
pub(crate) fn to_u64(value: i64, column: &str) -> Result<u64, DatabaseError> {
    u64::try_from(value).map_err(|_| DatabaseError::corrupt(format!("{} is negative: {}", column, value)))
}

/// Converts a counter to BIGINT for binding
pub(crate) fn to_i64(value: u64, column: &str) -> Result<i64, DatabaseError> {
    i64::try_from(value).map_err(|_| DatabaseError::QueryFailed(format!("{} out of range: {}", column, value)))
}

/// Index of an element as an INTEGER position column
pub(crate) fn position(index: usize) -> Result<i32, DatabaseError> {
    i32::try_from(index).map_err(|_| DatabaseError::QueryFailed(format!("position out of range: {}", index)))
}
