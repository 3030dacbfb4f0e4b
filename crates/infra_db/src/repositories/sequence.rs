//! Per-year document number counters

use sqlx::PgConnection;

use core_kernel::DocumentSeries;

use crate::error::DatabaseError;

#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceRepository;

impl SequenceRepository {
    /// Increments and returns the (series, year) counter
    ///
    /// The upsert holds the counter row lock until the surrounding
    /// transaction ends, so numbers are gapless and never repeat.
    /// Creates in the same series and year queue on that lock, whichever
    /// company they belong to.
    pub async fn next(conn: &mut PgConnection, series: DocumentSeries, year: i32) -> Result<u64, DatabaseError> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO document_sequences (series, year, last_value)
            VALUES ($1, $2, 1)
            ON CONFLICT (series, year)
            DO UPDATE SET last_value = document_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(series.as_str())
        .bind(year)
        .fetch_one(&mut *conn)
        .await?;

        super::to_u64(value, "last_value")
    }
}
