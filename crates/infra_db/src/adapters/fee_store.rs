//! PostgreSQL fee store
//!
//! `PostgresFeeStore` implements the `FeeStore` port on a connection pool.
//! Reads check out a pooled connection; every unit of work is one database
//! transaction whose row locks (`SELECT ... FOR UPDATE`) serialize writers of
//! the same company.
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PostgresFeeStore};
//! use app_services::{FeeServices, Notifier};
//! use std::sync::Arc;
//!
//! let pool = create_pool(DatabaseConfig::new(url)).await?;
//! let services = FeeServices::new(Arc::new(PostgresFeeStore::new(pool)), Notifier::tracing());
//! ```

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction as DbTransaction};
use std::time::Instant;
use tracing::{debug, instrument};

use core_kernel::{
    CalculationId, CompanyId, CorrectionId, DateRange, DocumentSeries, DomainPort, HealthCheckResult,
    HealthCheckable, PortError, RefundId,
};
use domain_adjustment::{Correction, Refund};
use domain_calculation::{Calculation, CalculationStatus};
use domain_ledger::{Account, Reference, Transaction};
use app_services::{AccountQuery, CalculationQuery, FeeStore, FeeUnitOfWork, Page, ReviewQuery};

use crate::error::DatabaseError;
use crate::repositories::{AdjustmentRepository, CalculationRepository, LedgerRepository, SequenceRepository};

const ADAPTER_ID: &str = "postgres-fee-store";

/// PostgreSQL-backed implementation of `FeeStore`
#[derive(Debug, Clone)]
pub struct PostgresFeeStore {
    pool: PgPool,
}

impl PostgresFeeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn conn(&self) -> Result<sqlx::pool::PoolConnection<Postgres>, PortError> {
        self.pool.acquire().await.map_err(|e| PortError::from(DatabaseError::from(e)))
    }
}

fn port_err(error: DatabaseError) -> PortError {
    PortError::from(error)
}

impl DomainPort for PostgresFeeStore {}

#[async_trait]
impl HealthCheckable for PostgresFeeStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let result = sqlx::query("SELECT 1").execute(&self.pool).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::healthy(ADAPTER_ID, latency_ms),
            Err(e) => HealthCheckResult::unhealthy(ADAPTER_ID, latency_ms, e.to_string()),
        }
    }
}

#[async_trait]
impl FeeStore for PostgresFeeStore {
    async fn begin(&self) -> Result<Box<dyn FeeUnitOfWork>, PortError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| port_err(DatabaseError::TransactionFailed(e.to_string())))?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn account(&self, company_id: CompanyId) -> Result<Option<Account>, PortError> {
        let mut conn = self.conn().await?;
        LedgerRepository::find_account(&mut conn, company_id, false).await.map_err(port_err)
    }

    async fn accounts(&self, query: &AccountQuery) -> Result<Vec<Account>, PortError> {
        let mut conn = self.conn().await?;
        LedgerRepository::search_accounts(&mut conn, query.search.as_deref(), query.has_debt, query.has_positive_balance)
            .await
            .map_err(port_err)
    }

    async fn transactions(&self, company_id: CompanyId, range: DateRange) -> Result<Vec<Transaction>, PortError> {
        let mut conn = self.conn().await?;
        LedgerRepository::transactions(&mut conn, company_id, range).await.map_err(port_err)
    }

    async fn transactions_for(
        &self,
        company_id: CompanyId,
        reference: Reference,
    ) -> Result<Vec<Transaction>, PortError> {
        let mut conn = self.conn().await?;
        LedgerRepository::transactions_for(&mut conn, company_id, reference).await.map_err(port_err)
    }

    async fn calculation(&self, id: CalculationId) -> Result<Option<Calculation>, PortError> {
        let mut conn = self.conn().await?;
        CalculationRepository::find(&mut conn, id, false).await.map_err(port_err)
    }

    #[instrument(skip_all, fields(page = query.page, page_size = query.page_size))]
    async fn calculations(&self, query: &CalculationQuery) -> Result<Page<Calculation>, PortError> {
        let mut conn = self.conn().await?;
        let (items, total) = CalculationRepository::search(&mut conn, query).await.map_err(port_err)?;
        debug!(total, returned = items.len(), "Calculation page loaded");
        Ok(Page {
            items,
            total,
            page: query.page,
            page_size: query.page_size,
        })
    }

    async fn count_calculations(
        &self,
        company_id: Option<CompanyId>,
        statuses: &[CalculationStatus],
    ) -> Result<u64, PortError> {
        let mut conn = self.conn().await?;
        CalculationRepository::count(&mut conn, company_id, statuses).await.map_err(port_err)
    }

    async fn refund(&self, id: RefundId) -> Result<Option<Refund>, PortError> {
        let mut conn = self.conn().await?;
        AdjustmentRepository::find_refund(&mut conn, id, false).await.map_err(port_err)
    }

    async fn refunds(&self, query: &ReviewQuery) -> Result<Vec<Refund>, PortError> {
        let mut conn = self.conn().await?;
        AdjustmentRepository::list_refunds(&mut conn, query).await.map_err(port_err)
    }

    async fn correction(&self, id: CorrectionId) -> Result<Option<Correction>, PortError> {
        let mut conn = self.conn().await?;
        AdjustmentRepository::find_correction(&mut conn, id, false).await.map_err(port_err)
    }

    async fn corrections(&self, query: &ReviewQuery) -> Result<Vec<Correction>, PortError> {
        let mut conn = self.conn().await?;
        AdjustmentRepository::list_corrections(&mut conn, query).await.map_err(port_err)
    }
}

/// A unit of work backed by one open database transaction
///
/// Dropping it without `commit` rolls the transaction back.
pub struct PgUnitOfWork {
    tx: DbTransaction<'static, Postgres>,
}

#[async_trait]
impl FeeUnitOfWork for PgUnitOfWork {
    async fn lock_account(&mut self, company_id: CompanyId) -> Result<Option<Account>, PortError> {
        let account = LedgerRepository::find_account(&mut self.tx, company_id, true)
            .await
            .map_err(port_err)?;
        debug!(company_id = %company_id, found = account.is_some(), "Locked account row");
        Ok(account)
    }

    async fn insert_account(&mut self, account: &Account) -> Result<(), PortError> {
        LedgerRepository::insert_account(&mut self.tx, account).await.map_err(|e| match e {
            DatabaseError::DuplicateEntry(_) => {
                PortError::conflict(format!("Account already exists for company {}", account.company_id))
            }
            other => port_err(other),
        })
    }

    async fn save_account(&mut self, account: &Account) -> Result<(), PortError> {
        LedgerRepository::update_account(&mut self.tx, account).await.map_err(port_err)
    }

    async fn append_transaction(&mut self, transaction: &Transaction) -> Result<(), PortError> {
        LedgerRepository::insert_transaction(&mut self.tx, transaction).await.map_err(port_err)
    }

    async fn calculation_for_update(&mut self, id: CalculationId) -> Result<Option<Calculation>, PortError> {
        CalculationRepository::find(&mut self.tx, id, true).await.map_err(port_err)
    }

    async fn save_calculation(&mut self, calculation: &Calculation) -> Result<(), PortError> {
        CalculationRepository::save(&mut self.tx, calculation).await.map_err(port_err)
    }

    async fn delete_calculation(&mut self, id: CalculationId) -> Result<(), PortError> {
        CalculationRepository::delete(&mut self.tx, id).await.map_err(port_err)
    }

    async fn refund_for_update(&mut self, id: RefundId) -> Result<Option<Refund>, PortError> {
        AdjustmentRepository::find_refund(&mut self.tx, id, true).await.map_err(port_err)
    }

    async fn save_refund(&mut self, refund: &Refund) -> Result<(), PortError> {
        AdjustmentRepository::save_refund(&mut self.tx, refund).await.map_err(port_err)
    }

    async fn correction_for_update(&mut self, id: CorrectionId) -> Result<Option<Correction>, PortError> {
        AdjustmentRepository::find_correction(&mut self.tx, id, true).await.map_err(port_err)
    }

    async fn save_correction(&mut self, correction: &Correction) -> Result<(), PortError> {
        AdjustmentRepository::save_correction(&mut self.tx, correction).await.map_err(port_err)
    }

    async fn next_sequence(&mut self, series: DocumentSeries, year: i32) -> Result<u64, PortError> {
        SequenceRepository::next(&mut self.tx, series, year).await.map_err(port_err)
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        self.tx
            .commit()
            .await
            .map_err(|e| port_err(DatabaseError::TransactionFailed(e.to_string())))
    }
}
