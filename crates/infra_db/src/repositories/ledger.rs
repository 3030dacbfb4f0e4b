//! Accounts and the append-only transaction log

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use uuid::Uuid;

use core_kernel::{AccountId, CompanyId, DateRange, Money, TransactionId};
use domain_ledger::{Account, Entry, Reference, ReferenceKind, Transaction, TransactionKind};

use crate::error::DatabaseError;
use super::{to_i64, to_u64};

db_enum!(
    /// `transaction_kind`
    DbTransactionKind, "transaction_kind", TransactionKind {
        Charge, Payment, Offset, Refund, Correction, Penalty,
    }
);

db_enum!(
    /// `reference_kind`
    DbReferenceKind, "reference_kind", ReferenceKind {
        Calculation, Payment, Report, Refund, Correction,
    }
);

const ACCOUNT_COLUMNS: &str = "account_id, company_id, company_name, company_tax_number, balance, \
     total_charged, total_paid, total_offset, posted_count, created_at, last_updated";

const TRANSACTION_COLUMNS: &str = "t.transaction_id, t.account_id, t.sequence, t.transaction_date, t.kind, \
     t.debit, t.credit, t.balance_after, t.reference_kind, t.reference_id, t.description, t.created_at";

/// Database row for `accounts`
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub account_id: Uuid,
    pub company_id: Uuid,
    pub company_name: String,
    pub company_tax_number: String,
    pub balance: Decimal,
    pub total_charged: Decimal,
    pub total_paid: Decimal,
    pub total_offset: Decimal,
    pub posted_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl AccountRow {
    pub fn into_domain(self) -> Result<Account, DatabaseError> {
        Ok(Account {
            id: AccountId::from_uuid(self.account_id),
            company_id: CompanyId::from_uuid(self.company_id),
            company_name: self.company_name,
            company_tax_number: self.company_tax_number,
            balance: Money::new(self.balance),
            total_charged: Money::new(self.total_charged),
            total_paid: Money::new(self.total_paid),
            total_offset: Money::new(self.total_offset),
            posted_count: to_u64(self.posted_count, "posted_count")?,
            created_at: self.created_at,
            last_updated: self.last_updated,
        })
    }
}

/// Database row for `account_transactions`
#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub transaction_id: Uuid,
    pub account_id: Uuid,
    pub sequence: i64,
    pub transaction_date: NaiveDate,
    pub kind: DbTransactionKind,
    pub debit: Decimal,
    pub credit: Decimal,
    pub balance_after: Decimal,
    pub reference_kind: Option<DbReferenceKind>,
    pub reference_id: Option<Uuid>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl TransactionRow {
    pub fn into_domain(self) -> Result<Transaction, DatabaseError> {
        let entry = Entry::from_columns(Money::new(self.debit), Money::new(self.credit))
            .map_err(|e| DatabaseError::corrupt(format!("transaction {}: {}", self.transaction_id, e)))?;
        let reference = match (self.reference_kind, self.reference_id) {
            (Some(kind), Some(id)) => Some(Reference::from_parts(kind.into(), id)),
            (None, None) => None,
            _ => {
                return Err(DatabaseError::corrupt(format!(
                    "transaction {} has half a reference",
                    self.transaction_id
                )))
            }
        };

        Ok(Transaction {
            id: TransactionId::from_uuid(self.transaction_id),
            account_id: AccountId::from_uuid(self.account_id),
            sequence: to_u64(self.sequence, "sequence")?,
            date: self.transaction_date,
            kind: self.kind.into(),
            entry,
            balance_after: Money::new(self.balance_after),
            reference,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

/// Repository for accounts and their transaction log
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerRepository;

impl LedgerRepository {
    /// Loads the company's account, taking a row lock when `for_update` is set
    pub async fn find_account(
        conn: &mut PgConnection,
        company_id: CompanyId,
        for_update: bool,
    ) -> Result<Option<Account>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE company_id = $1{}",
            ACCOUNT_COLUMNS,
            if for_update { " FOR UPDATE" } else { "" }
        );
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(*company_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?
            .map(AccountRow::into_domain)
            .transpose()
    }

    /// Accounts filtered by name/tax-number substring and balance sign, ordered by name
    pub async fn search_accounts(
        conn: &mut PgConnection,
        search: Option<&str>,
        has_debt: Option<bool>,
        has_positive_balance: Option<bool>,
    ) -> Result<Vec<Account>, DatabaseError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM accounts WHERE TRUE", ACCOUNT_COLUMNS));

        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search.to_lowercase());
            builder.push(" AND (lower(company_name) LIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR lower(company_tax_number) LIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }
        match has_debt {
            Some(true) => {
                builder.push(" AND balance < 0");
            }
            Some(false) => {
                builder.push(" AND balance >= 0");
            }
            None => {}
        }
        match has_positive_balance {
            Some(true) => {
                builder.push(" AND balance > 0");
            }
            Some(false) => {
                builder.push(" AND balance <= 0");
            }
            None => {}
        }
        builder.push(" ORDER BY company_name");

        builder
            .build_query_as::<AccountRow>()
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .map(AccountRow::into_domain)
            .collect()
    }

    pub async fn insert_account(conn: &mut PgConnection, account: &Account) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                account_id, company_id, company_name, company_tax_number, balance,
                total_charged, total_paid, total_offset, posted_count, created_at, last_updated
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(*account.id.as_uuid())
        .bind(*account.company_id.as_uuid())
        .bind(&account.company_name)
        .bind(&account.company_tax_number)
        .bind(account.balance.amount())
        .bind(account.total_charged.amount())
        .bind(account.total_paid.amount())
        .bind(account.total_offset.amount())
        .bind(to_i64(account.posted_count, "posted_count")?)
        .bind(account.created_at)
        .bind(account.last_updated)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Writes the aggregates of an account whose row is locked
    pub async fn update_account(conn: &mut PgConnection, account: &Account) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = $2, total_charged = $3, total_paid = $4, total_offset = $5,
                posted_count = $6, last_updated = $7
            WHERE account_id = $1
            "#,
        )
        .bind(*account.id.as_uuid())
        .bind(account.balance.amount())
        .bind(account.total_charged.amount())
        .bind(account.total_paid.amount())
        .bind(account.total_offset.amount())
        .bind(to_i64(account.posted_count, "posted_count")?)
        .bind(account.last_updated)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Account", account.id));
        }
        Ok(())
    }

    pub async fn insert_transaction(conn: &mut PgConnection, txn: &Transaction) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO account_transactions (
                transaction_id, account_id, sequence, transaction_date, kind, debit, credit,
                balance_after, reference_kind, reference_id, description, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(*txn.id.as_uuid())
        .bind(*txn.account_id.as_uuid())
        .bind(to_i64(txn.sequence, "sequence")?)
        .bind(txn.date)
        .bind(DbTransactionKind::from(txn.kind))
        .bind(txn.entry.debit().amount())
        .bind(txn.entry.credit().amount())
        .bind(txn.balance_after.amount())
        .bind(txn.reference.map(|r| DbReferenceKind::from(r.kind())))
        .bind(txn.reference.map(|r| r.source_id()))
        .bind(&txn.description)
        .bind(txn.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// The company's transactions dated within `range`, in sequence order
    pub async fn transactions(
        conn: &mut PgConnection,
        company_id: CompanyId,
        range: DateRange,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM account_transactions t
            JOIN accounts a ON a.account_id = t.account_id
            WHERE a.company_id = $1
              AND ($2::date IS NULL OR t.transaction_date >= $2)
              AND ($3::date IS NULL OR t.transaction_date <= $3)
            ORDER BY t.sequence
            "#,
            TRANSACTION_COLUMNS
        );
        sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(*company_id.as_uuid())
            .bind(range.from)
            .bind(range.to)
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .map(TransactionRow::into_domain)
            .collect()
    }

    /// The company's transactions referencing one source document
    pub async fn transactions_for(
        conn: &mut PgConnection,
        company_id: CompanyId,
        reference: Reference,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM account_transactions t
            JOIN accounts a ON a.account_id = t.account_id
            WHERE a.company_id = $1 AND t.reference_kind = $2 AND t.reference_id = $3
            ORDER BY t.sequence
            "#,
            TRANSACTION_COLUMNS
        );
        sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(*company_id.as_uuid())
            .bind(DbReferenceKind::from(reference.kind()))
            .bind(reference.source_id())
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .map(TransactionRow::into_domain)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::CalculationId;

    fn row(debit: Decimal, credit: Decimal) -> TransactionRow {
        TransactionRow {
            transaction_id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            sequence: 1,
            transaction_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            kind: DbTransactionKind::Charge,
            debit,
            credit,
            balance_after: -debit,
            reference_kind: Some(DbReferenceKind::Calculation),
            reference_id: Some(Uuid::new_v4()),
            description: "Charge".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_rebuilds_entry_and_reference() {
        let source = row(Decimal::new(80000, 2), Decimal::ZERO);
        let calc = CalculationId::from_uuid(source.reference_id.unwrap());
        let txn = source.into_domain().unwrap();

        assert_eq!(txn.kind, TransactionKind::Charge);
        assert!(txn.entry.is_debit());
        assert_eq!(txn.reference, Some(Reference::Calculation(calc)));
    }

    #[test]
    fn test_two_sided_row_is_corrupt() {
        let result = row(Decimal::ONE, Decimal::ONE).into_domain();
        assert!(matches!(result, Err(DatabaseError::CorruptRow(_))));
    }

    #[test]
    fn test_half_reference_is_corrupt() {
        let mut source = row(Decimal::ONE, Decimal::ZERO);
        source.reference_kind = None;
        assert!(matches!(source.into_domain(), Err(DatabaseError::CorruptRow(_))));
    }

    #[test]
    fn test_negative_counter_is_corrupt() {
        let mut source = row(Decimal::ONE, Decimal::ZERO);
        source.sequence = -1;
        assert!(source.into_domain().is_err());
    }

    #[test]
    fn test_enum_mirrors_round_trip() {
        for kind in TransactionKind::ALL {
            assert_eq!(TransactionKind::from(DbTransactionKind::from(kind)), kind);
        }
    }
}
