//! Calculations with their item lines and payment attempts

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use core_kernel::{CalculationId, CalculationItemId, CompanyId, Money, PaymentId};
use domain_calculation::{
    Calculation, CalculationItem, CalculationStatus, DocumentType, Payment, PaymentMethod, PaymentStatus,
};
use app_services::CalculationQuery;

use crate::error::DatabaseError;
use super::position;

db_enum!(
    /// `calculation_status`
    DbCalculationStatus, "calculation_status", CalculationStatus {
        Draft, Submitted, UnderReview, Approved, Rejected, PartiallyPaid, Paid,
    }
);

db_enum!(
    /// `document_type`
    DbDocumentType, "document_type", DocumentType {
        Gtd, Invoice, Contract, Act, Other,
    }
);

db_enum!(
    /// `payment_status`
    DbPaymentStatus, "payment_status", PaymentStatus {
        Pending, Confirmed, Rejected,
    }
);

db_enum!(
    /// `payment_method`
    DbPaymentMethod, "payment_method", PaymentMethod {
        BankTransfer, Online, Cash,
    }
);

const CALCULATION_COLUMNS: &str = "calculation_id, number, company_id, period, quarter, document_type, \
     document_number, document_date, total_amount, status, review_comment, reviewed_by, reviewed_at, \
     submitted_at, created_by, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct CalculationRow {
    pub calculation_id: Uuid,
    pub number: String,
    pub company_id: Uuid,
    pub period: String,
    pub quarter: Option<String>,
    pub document_type: Option<DbDocumentType>,
    pub document_number: Option<String>,
    pub document_date: Option<NaiveDate>,
    pub total_amount: Decimal,
    pub status: DbCalculationStatus,
    pub review_comment: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalculationRow {
    pub fn into_domain(self, items: Vec<CalculationItem>, payments: Vec<Payment>) -> Calculation {
        Calculation {
            id: CalculationId::from_uuid(self.calculation_id),
            number: self.number,
            company_id: CompanyId::from_uuid(self.company_id),
            period: self.period,
            quarter: self.quarter,
            document_type: self.document_type.map(Into::into),
            document_number: self.document_number,
            document_date: self.document_date,
            items,
            total_amount: Money::new(self.total_amount),
            status: self.status.into(),
            review_comment: self.review_comment,
            reviewed_by: self.reviewed_by,
            reviewed_at: self.reviewed_at,
            submitted_at: self.submitted_at,
            payments,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ItemRow {
    pub item_id: Uuid,
    pub calculation_id: Uuid,
    pub product_group: String,
    pub product_subgroup: Option<String>,
    pub tnved_code: Option<String>,
    pub gskp_code: Option<String>,
    pub product_name: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub weight: Option<Decimal>,
    pub rate: Option<Decimal>,
    pub recycling_norm: Option<Decimal>,
    pub amount: Decimal,
}

impl From<ItemRow> for CalculationItem {
    fn from(row: ItemRow) -> Self {
        CalculationItem {
            id: CalculationItemId::from_uuid(row.item_id),
            product_group: row.product_group,
            product_subgroup: row.product_subgroup,
            tnved_code: row.tnved_code,
            gskp_code: row.gskp_code,
            product_name: row.product_name,
            quantity: row.quantity,
            unit: row.unit,
            weight: row.weight,
            rate: row.rate,
            recycling_norm: row.recycling_norm,
            amount: Money::new(row.amount),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub calculation_id: Uuid,
    pub number: String,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub method: DbPaymentMethod,
    pub status: DbPaymentStatus,
    pub document_number: Option<String>,
    pub document_url: Option<String>,
    pub submitted_by: String,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_comment: Option<String>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: PaymentId::from_uuid(row.payment_id),
            number: row.number,
            amount: Money::new(row.amount),
            payment_date: row.payment_date,
            method: row.method.into(),
            status: row.status.into(),
            document_number: row.document_number,
            document_url: row.document_url,
            submitted_by: row.submitted_by,
            submitted_at: row.submitted_at,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            review_comment: row.review_comment,
        }
    }
}

/// Repository for the calculation aggregate
#[derive(Debug, Clone, Copy, Default)]
pub struct CalculationRepository;

impl CalculationRepository {
    pub async fn find(
        conn: &mut PgConnection,
        id: CalculationId,
        for_update: bool,
    ) -> Result<Option<Calculation>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM calculations WHERE calculation_id = $1{}",
            CALCULATION_COLUMNS,
            if for_update { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query_as::<_, CalculationRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => {
                let mut loaded = Self::hydrate(conn, vec![row]).await?;
                Ok(loaded.pop())
            }
            None => Ok(None),
        }
    }

    /// One page of calculations, newest first, plus the total match count
    pub async fn search(
        conn: &mut PgConnection,
        query: &CalculationQuery,
    ) -> Result<(Vec<Calculation>, u64), DatabaseError> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM calculations WHERE TRUE");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&mut *conn).await?;

        let mut select: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM calculations WHERE TRUE", CALCULATION_COLUMNS));
        push_filters(&mut select, query);
        select.push(" ORDER BY created_at DESC, number DESC LIMIT ");
        select.push_bind(i64::from(query.page_size));
        select.push(" OFFSET ");
        select.push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));

        let rows = select.build_query_as::<CalculationRow>().fetch_all(&mut *conn).await?;
        let calculations = Self::hydrate(conn, rows).await?;
        Ok((calculations, super::to_u64(total, "count")?))
    }

    pub async fn count(
        conn: &mut PgConnection,
        company_id: Option<CompanyId>,
        statuses: &[CalculationStatus],
    ) -> Result<u64, DatabaseError> {
        let query = CalculationQuery {
            company_id,
            statuses: statuses.to_vec(),
            ..Default::default()
        };
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM calculations WHERE TRUE");
        push_filters(&mut count, &query);
        let total: i64 = count.build_query_scalar().fetch_one(&mut *conn).await?;
        super::to_u64(total, "count")
    }

    /// Upserts the header and replaces items; payments are upserted by id
    pub async fn save(conn: &mut PgConnection, calculation: &Calculation) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO calculations (
                calculation_id, number, company_id, period, quarter, document_type, document_number,
                document_date, total_amount, status, review_comment, reviewed_by, reviewed_at,
                submitted_at, created_by, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (calculation_id) DO UPDATE SET
                period = EXCLUDED.period,
                quarter = EXCLUDED.quarter,
                document_type = EXCLUDED.document_type,
                document_number = EXCLUDED.document_number,
                document_date = EXCLUDED.document_date,
                total_amount = EXCLUDED.total_amount,
                status = EXCLUDED.status,
                review_comment = EXCLUDED.review_comment,
                reviewed_by = EXCLUDED.reviewed_by,
                reviewed_at = EXCLUDED.reviewed_at,
                submitted_at = EXCLUDED.submitted_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(*calculation.id.as_uuid())
        .bind(&calculation.number)
        .bind(*calculation.company_id.as_uuid())
        .bind(&calculation.period)
        .bind(&calculation.quarter)
        .bind(calculation.document_type.map(DbDocumentType::from))
        .bind(&calculation.document_number)
        .bind(calculation.document_date)
        .bind(calculation.total_amount.amount())
        .bind(DbCalculationStatus::from(calculation.status))
        .bind(&calculation.review_comment)
        .bind(&calculation.reviewed_by)
        .bind(calculation.reviewed_at)
        .bind(calculation.submitted_at)
        .bind(&calculation.created_by)
        .bind(calculation.created_at)
        .bind(calculation.updated_at)
        .execute(&mut *conn)
        .await?;

        sqlx::query("DELETE FROM calculation_items WHERE calculation_id = $1")
            .bind(*calculation.id.as_uuid())
            .execute(&mut *conn)
            .await?;

        for (index, item) in calculation.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO calculation_items (
                    item_id, calculation_id, position, product_group, product_subgroup, tnved_code,
                    gskp_code, product_name, quantity, unit, weight, rate, recycling_norm, amount
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                "#,
            )
            .bind(*item.id.as_uuid())
            .bind(*calculation.id.as_uuid())
            .bind(position(index)?)
            .bind(&item.product_group)
            .bind(&item.product_subgroup)
            .bind(&item.tnved_code)
            .bind(&item.gskp_code)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(&item.unit)
            .bind(item.weight)
            .bind(item.rate)
            .bind(item.recycling_norm)
            .bind(item.amount.amount())
            .execute(&mut *conn)
            .await?;
        }

        // Settled attempts go first so the pending index never sees two rows
        let mut ordered: Vec<(usize, &Payment)> = calculation.payments.iter().enumerate().collect();
        ordered.sort_by_key(|(_, payment)| payment.status == PaymentStatus::Pending);
        for (index, payment) in ordered {
            sqlx::query(
                r#"
                INSERT INTO calculation_payments (
                    payment_id, calculation_id, position, number, amount, payment_date, method, status,
                    document_number, document_url, submitted_by, submitted_at, reviewed_by, reviewed_at,
                    review_comment
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                ON CONFLICT (payment_id) DO UPDATE SET
                    status = EXCLUDED.status,
                    reviewed_by = EXCLUDED.reviewed_by,
                    reviewed_at = EXCLUDED.reviewed_at,
                    review_comment = EXCLUDED.review_comment
                "#,
            )
            .bind(*payment.id.as_uuid())
            .bind(*calculation.id.as_uuid())
            .bind(position(index)?)
            .bind(&payment.number)
            .bind(payment.amount.amount())
            .bind(payment.payment_date)
            .bind(DbPaymentMethod::from(payment.method))
            .bind(DbPaymentStatus::from(payment.status))
            .bind(&payment.document_number)
            .bind(&payment.document_url)
            .bind(&payment.submitted_by)
            .bind(payment.submitted_at)
            .bind(&payment.reviewed_by)
            .bind(payment.reviewed_at)
            .bind(&payment.review_comment)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    pub async fn delete(conn: &mut PgConnection, id: CalculationId) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM calculations WHERE calculation_id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Calculation", id));
        }
        Ok(())
    }

    /// Loads items and payments for a batch of headers in two queries
    async fn hydrate(conn: &mut PgConnection, rows: Vec<CalculationRow>) -> Result<Vec<Calculation>, DatabaseError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|row| row.calculation_id).collect();

        let item_rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT item_id, calculation_id, product_group, product_subgroup, tnved_code, gskp_code,
                   product_name, quantity, unit, weight, rate, recycling_norm, amount
            FROM calculation_items
            WHERE calculation_id = ANY($1)
            ORDER BY calculation_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let payment_rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT payment_id, calculation_id, number, amount, payment_date, method, status,
                   document_number, document_url, submitted_by, submitted_at, reviewed_by,
                   reviewed_at, review_comment
            FROM calculation_payments
            WHERE calculation_id = ANY($1)
            ORDER BY calculation_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut items: HashMap<Uuid, Vec<CalculationItem>> = HashMap::new();
        for row in item_rows {
            items.entry(row.calculation_id).or_default().push(row.into());
        }
        let mut payments: HashMap<Uuid, Vec<Payment>> = HashMap::new();
        for row in payment_rows {
            payments.entry(row.calculation_id).or_default().push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.calculation_id;
                row.into_domain(
                    items.remove(&id).unwrap_or_default(),
                    payments.remove(&id).unwrap_or_default(),
                )
            })
            .collect())
    }
}

/// Appends the WHERE conditions shared by the count and page queries
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &CalculationQuery) {
    if let Some(company_id) = query.company_id {
        builder.push(" AND company_id = ");
        builder.push_bind(*company_id.as_uuid());
    }
    if !query.statuses.is_empty() {
        let statuses: Vec<String> = query.statuses.iter().map(|s| s.as_str().to_string()).collect();
        builder.push(" AND status::text = ANY(");
        builder.push_bind(statuses);
        builder.push(")");
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        builder.push(" AND lower(number) LIKE ");
        builder.push_bind(format!("%{}%", search.to_lowercase()));
    }
    if !query.period.is_unbounded() {
        builder.push(" AND document_date IS NOT NULL");
        if let Some(from) = query.period.from {
            builder.push(" AND document_date >= ");
            builder.push_bind(from);
        }
        if let Some(to) = query.period.to {
            builder.push(" AND document_date <= ");
            builder.push_bind(to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::DateRange;

    fn sql_for(query: &CalculationQuery) -> String {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM calculations WHERE TRUE");
        push_filters(&mut builder, query);
        builder.sql().to_string()
    }

    #[test]
    fn test_unfiltered_query_has_no_conditions() {
        assert_eq!(sql_for(&CalculationQuery::default()), "SELECT COUNT(*) FROM calculations WHERE TRUE");
    }

    #[test]
    fn test_filters_bind_in_order() {
        let query = CalculationQuery {
            company_id: Some(CompanyId::new()),
            statuses: vec![CalculationStatus::Submitted, CalculationStatus::UnderReview],
            search: Some("CALC-2026".to_string()),
            period: DateRange::new(NaiveDate::from_ymd_opt(2026, 1, 1), None).unwrap(),
            ..Default::default()
        };
        let sql = sql_for(&query);

        assert!(sql.contains("company_id = $1"));
        assert!(sql.contains("status::text = ANY($2)"));
        assert!(sql.contains("lower(number) LIKE $3"));
        assert!(sql.contains("document_date >= $4"));
        assert!(!sql.contains("document_date <="));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let query = CalculationQuery { search: Some("  ".to_string()), ..Default::default() };
        assert!(!sql_for(&query).contains("LIKE"));
    }

    #[test]
    fn test_status_mirror_round_trip() {
        for status in CalculationStatus::ALL {
            assert_eq!(CalculationStatus::from(DbCalculationStatus::from(status)), status);
        }
    }
}
