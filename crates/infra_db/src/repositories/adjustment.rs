//! Refund applications and balance corrections

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use core_kernel::{CalculationId, CompanyId, CorrectionId, Money, RefundId};
use domain_adjustment::{Correction, Refund, RefundItem, RefundReason, Review, ReviewStatus};
use domain_ledger::CorrectionLine;
use app_services::ReviewQuery;

use crate::error::DatabaseError;
use super::position;

db_enum!(
    /// `review_status`
    DbReviewStatus, "review_status", ReviewStatus {
        Pending, Approved, Rejected,
    }
);

db_enum!(
    /// `refund_reason`
    DbRefundReason, "refund_reason", RefundReason {
        Export, Recycling, Overpayment, Error,
    }
);

const REFUND_COLUMNS: &str = "refund_id, number, company_id, total_amount, status, comment, review_comment, \
     reviewed_by, reviewed_at, created_by, created_at, updated_at";

const CORRECTION_COLUMNS: &str = "correction_id, number, company_id, comment, status, review_comment, \
     reviewed_by, reviewed_at, created_by, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct RefundRow {
    pub refund_id: Uuid,
    pub number: String,
    pub company_id: Uuid,
    pub total_amount: Decimal,
    pub status: DbReviewStatus,
    pub comment: Option<String>,
    pub review_comment: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefundRow {
    pub fn into_domain(self, items: Vec<RefundItem>) -> Refund {
        Refund {
            id: RefundId::from_uuid(self.refund_id),
            number: self.number,
            company_id: CompanyId::from_uuid(self.company_id),
            items,
            total_amount: Money::new(self.total_amount),
            status: self.status.into(),
            comment: self.comment,
            review: Review {
                comment: self.review_comment,
                reviewed_by: self.reviewed_by,
                reviewed_at: self.reviewed_at,
            },
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RefundItemRow {
    pub refund_id: Uuid,
    pub calculation_id: Uuid,
    pub amount: Decimal,
    pub reason: DbRefundReason,
}

impl From<RefundItemRow> for RefundItem {
    fn from(row: RefundItemRow) -> Self {
        RefundItem {
            calculation_id: CalculationId::from_uuid(row.calculation_id),
            amount: Money::new(row.amount),
            reason: row.reason.into(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CorrectionRow {
    pub correction_id: Uuid,
    pub number: String,
    pub company_id: Uuid,
    pub comment: String,
    pub status: DbReviewStatus,
    pub review_comment: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CorrectionRow {
    pub fn into_domain(self, items: Vec<CorrectionLine>) -> Correction {
        Correction {
            id: CorrectionId::from_uuid(self.correction_id),
            number: self.number,
            company_id: CompanyId::from_uuid(self.company_id),
            items,
            comment: self.comment,
            status: self.status.into(),
            review: Review {
                comment: self.review_comment,
                reviewed_by: self.reviewed_by,
                reviewed_at: self.reviewed_at,
            },
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CorrectionItemRow {
    pub correction_id: Uuid,
    pub calculation_id: Uuid,
    pub original_amount: Decimal,
    pub corrected_amount: Decimal,
    pub reason: String,
}

impl From<CorrectionItemRow> for CorrectionLine {
    fn from(row: CorrectionItemRow) -> Self {
        CorrectionLine {
            calculation_id: CalculationId::from_uuid(row.calculation_id),
            original_amount: Money::new(row.original_amount),
            corrected_amount: Money::new(row.corrected_amount),
            reason: row.reason,
        }
    }
}

/// Repository for refunds and corrections
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjustmentRepository;

impl AdjustmentRepository {
    pub async fn find_refund(
        conn: &mut PgConnection,
        id: RefundId,
        for_update: bool,
    ) -> Result<Option<Refund>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM refunds WHERE refund_id = $1{}",
            REFUND_COLUMNS,
            if for_update { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query_as::<_, RefundRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?;
        match row {
            Some(row) => Ok(Self::hydrate_refunds(conn, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Refunds matching the query, newest first
    pub async fn list_refunds(conn: &mut PgConnection, query: &ReviewQuery) -> Result<Vec<Refund>, DatabaseError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM refunds WHERE TRUE", REFUND_COLUMNS));
        push_review_filters(&mut builder, query);
        builder.push(" ORDER BY created_at DESC, number DESC");

        let rows = builder.build_query_as::<RefundRow>().fetch_all(&mut *conn).await?;
        Self::hydrate_refunds(conn, rows).await
    }

    /// Upserts the header; items are written once, on insert
    pub async fn save_refund(conn: &mut PgConnection, refund: &Refund) -> Result<(), DatabaseError> {
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO refunds (
                refund_id, number, company_id, total_amount, status, comment, review_comment,
                reviewed_by, reviewed_at, created_by, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (refund_id) DO UPDATE SET
                status = EXCLUDED.status,
                review_comment = EXCLUDED.review_comment,
                reviewed_by = EXCLUDED.reviewed_by,
                reviewed_at = EXCLUDED.reviewed_at,
                updated_at = EXCLUDED.updated_at
            RETURNING (xmax = 0)
            "#,
        )
        .bind(*refund.id.as_uuid())
        .bind(&refund.number)
        .bind(*refund.company_id.as_uuid())
        .bind(refund.total_amount.amount())
        .bind(DbReviewStatus::from(refund.status))
        .bind(&refund.comment)
        .bind(&refund.review.comment)
        .bind(&refund.review.reviewed_by)
        .bind(refund.review.reviewed_at)
        .bind(&refund.created_by)
        .bind(refund.created_at)
        .bind(refund.updated_at)
        .fetch_one(&mut *conn)
        .await?;

        if inserted {
            for (index, item) in refund.items.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO refund_items (refund_id, position, calculation_id, amount, reason) \
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(*refund.id.as_uuid())
                .bind(position(index)?)
                .bind(*item.calculation_id.as_uuid())
                .bind(item.amount.amount())
                .bind(DbRefundReason::from(item.reason))
                .execute(&mut *conn)
                .await?;
            }
        }
        Ok(())
    }

    pub async fn find_correction(
        conn: &mut PgConnection,
        id: CorrectionId,
        for_update: bool,
    ) -> Result<Option<Correction>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM corrections WHERE correction_id = $1{}",
            CORRECTION_COLUMNS,
            if for_update { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query_as::<_, CorrectionRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?;
        match row {
            Some(row) => Ok(Self::hydrate_corrections(conn, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn list_corrections(
        conn: &mut PgConnection,
        query: &ReviewQuery,
    ) -> Result<Vec<Correction>, DatabaseError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM corrections WHERE TRUE", CORRECTION_COLUMNS));
        push_review_filters(&mut builder, query);
        builder.push(" ORDER BY created_at DESC, number DESC");

        let rows = builder.build_query_as::<CorrectionRow>().fetch_all(&mut *conn).await?;
        Self::hydrate_corrections(conn, rows).await
    }

    pub async fn save_correction(conn: &mut PgConnection, correction: &Correction) -> Result<(), DatabaseError> {
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO corrections (
                correction_id, number, company_id, comment, status, review_comment,
                reviewed_by, reviewed_at, created_by, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (correction_id) DO UPDATE SET
                status = EXCLUDED.status,
                review_comment = EXCLUDED.review_comment,
                reviewed_by = EXCLUDED.reviewed_by,
                reviewed_at = EXCLUDED.reviewed_at,
                updated_at = EXCLUDED.updated_at
            RETURNING (xmax = 0)
            "#,
        )
        .bind(*correction.id.as_uuid())
        .bind(&correction.number)
        .bind(*correction.company_id.as_uuid())
        .bind(&correction.comment)
        .bind(DbReviewStatus::from(correction.status))
        .bind(&correction.review.comment)
        .bind(&correction.review.reviewed_by)
        .bind(correction.review.reviewed_at)
        .bind(&correction.created_by)
        .bind(correction.created_at)
        .bind(correction.updated_at)
        .fetch_one(&mut *conn)
        .await?;

        if inserted {
            for (index, line) in correction.items.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO correction_items (
                        correction_id, position, calculation_id, original_amount, corrected_amount, reason
                    ) VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(*correction.id.as_uuid())
                .bind(position(index)?)
                .bind(*line.calculation_id.as_uuid())
                .bind(line.original_amount.amount())
                .bind(line.corrected_amount.amount())
                .bind(&line.reason)
                .execute(&mut *conn)
                .await?;
            }
        }
        Ok(())
    }

    async fn hydrate_refunds(conn: &mut PgConnection, rows: Vec<RefundRow>) -> Result<Vec<Refund>, DatabaseError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|row| row.refund_id).collect();
        let item_rows = sqlx::query_as::<_, RefundItemRow>(
            "SELECT refund_id, calculation_id, amount, reason FROM refund_items \
             WHERE refund_id = ANY($1) ORDER BY refund_id, position",
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut items: HashMap<Uuid, Vec<RefundItem>> = HashMap::new();
        for row in item_rows {
            items.entry(row.refund_id).or_default().push(row.into());
        }
        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.refund_id;
                row.into_domain(items.remove(&id).unwrap_or_default())
            })
            .collect())
    }

    async fn hydrate_corrections(
        conn: &mut PgConnection,
        rows: Vec<CorrectionRow>,
    ) -> Result<Vec<Correction>, DatabaseError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|row| row.correction_id).collect();
        let item_rows = sqlx::query_as::<_, CorrectionItemRow>(
            "SELECT correction_id, calculation_id, original_amount, corrected_amount, reason \
             FROM correction_items WHERE correction_id = ANY($1) ORDER BY correction_id, position",
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut items: HashMap<Uuid, Vec<CorrectionLine>> = HashMap::new();
        for row in item_rows {
            items.entry(row.correction_id).or_default().push(row.into());
        }
        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.correction_id;
                row.into_domain(items.remove(&id).unwrap_or_default())
            })
            .collect())
    }
}

fn push_review_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ReviewQuery) {
    if let Some(company_id) = query.company_id {
        builder.push(" AND company_id = ");
        builder.push_bind(*company_id.as_uuid());
    }
    if let Some(status) = query.status {
        builder.push(" AND status = ");
        builder.push_bind(DbReviewStatus::from(status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_filters() {
        let query = ReviewQuery { company_id: Some(CompanyId::new()), status: Some(ReviewStatus::Pending) };
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT 1 FROM refunds WHERE TRUE");
        push_review_filters(&mut builder, &query);
        assert_eq!(builder.sql(), "SELECT 1 FROM refunds WHERE TRUE AND company_id = $1 AND status = $2");
    }

    #[test]
    fn test_row_keeps_review_fields() {
        let now = Utc::now();
        let row = RefundRow {
            refund_id: Uuid::new_v4(),
            number: "REF-2026-000001".to_string(),
            company_id: Uuid::new_v4(),
            total_amount: Decimal::new(10000, 2),
            status: DbReviewStatus::Rejected,
            comment: None,
            review_comment: Some("No export declaration".to_string()),
            reviewed_by: Some("reviewer".to_string()),
            reviewed_at: Some(now),
            created_by: "payer".to_string(),
            created_at: now,
            updated_at: now,
        };
        let refund = row.into_domain(Vec::new());

        assert_eq!(refund.status, ReviewStatus::Rejected);
        assert_eq!(refund.review.comment.as_deref(), Some("No export declaration"));
        assert_eq!(refund.total_amount, Money::from_minor(10000));
    }
}
