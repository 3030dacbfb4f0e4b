//! Store port
//!
//! `FeeStore` is the persistence boundary of every workflow. Reads go
//! straight to the store; every write happens inside a `FeeUnitOfWork`.
//!
//! # Unit of work
//!
//! A unit of work spans read-validate-write-append for one operation:
//!
//! 1. `lock_account` on the owning company, always first
//! 2. `*_for_update` on the document being changed
//! 3. saves and appends
//! 4. `commit`
//!
//! Dropping a unit of work without committing discards every write. Holding
//! the account lock serializes all balance changes and document transitions
//! of one company; different companies never block each other.
//!
//! ```rust,ignore
//! let mut uow = store.begin().await?;
//! let mut account = uow.lock_account(company_id).await?.ok_or(...)?;
//! let txn = account.post(posting, Utc::now())?;
//! uow.append_transaction(&txn).await?;
//! uow.save_account(&account).await?;
//! uow.commit().await?;
//! ```

use async_trait::async_trait;

use core_kernel::{
    CalculationId, CompanyId, CorrectionId, DateRange, DocumentSeries, DomainPort, HealthCheckable,
    PortError, RefundId,
};
use domain_adjustment::{Correction, Refund, ReviewStatus};
use domain_calculation::{Calculation, CalculationStatus};
use domain_ledger::{Account, Reference, Transaction};

/// Default page size for calculation listings
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Largest page a caller may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Filters for account listings
#[derive(Debug, Clone, Default)]
pub struct AccountQuery {
    /// Case-insensitive substring of company name or tax number
    pub search: Option<String>,
    pub has_debt: Option<bool>,
    pub has_positive_balance: Option<bool>,
}

impl AccountQuery {
    pub fn matches(&self, account: &Account) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = account.company_name.to_lowercase().contains(&needle)
                || account.company_tax_number.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        if let Some(has_debt) = self.has_debt {
            if account.has_debt() != has_debt {
                return false;
            }
        }
        if let Some(positive) = self.has_positive_balance {
            if account.has_positive_balance() != positive {
                return false;
            }
        }
        true
    }
}

/// Filters and paging for calculation listings
#[derive(Debug, Clone)]
pub struct CalculationQuery {
    pub company_id: Option<CompanyId>,
    /// Empty means any status
    pub statuses: Vec<CalculationStatus>,
    /// Case-insensitive substring of the calculation number
    pub search: Option<String>,
    /// Inclusive bounds on the document date
    pub period: DateRange,
    /// 1-based
    pub page: u32,
    pub page_size: u32,
}

impl Default for CalculationQuery {
    fn default() -> Self {
        Self {
            company_id: None,
            statuses: Vec::new(),
            search: None,
            period: DateRange::unbounded(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl CalculationQuery {
    pub fn matches(&self, calculation: &Calculation) -> bool {
        if self.company_id.is_some_and(|company| company != calculation.company_id) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&calculation.status) {
            return false;
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if !calculation.number.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        if !self.period.is_unbounded() {
            match calculation.document_date {
                Some(date) if self.period.contains(date) => {}
                _ => return false,
            }
        }
        true
    }

    /// Page and size clamped to valid values
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

/// Filters for refund and correction listings
#[derive(Debug, Clone, Default)]
pub struct ReviewQuery {
    pub company_id: Option<CompanyId>,
    pub status: Option<ReviewStatus>,
}

impl ReviewQuery {
    pub fn matches(&self, company_id: CompanyId, status: ReviewStatus) -> bool {
        self.company_id.map_or(true, |c| c == company_id) && self.status.map_or(true, |s| s == status)
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size))
    }
}

/// Read side of the store and factory for units of work
#[async_trait]
pub trait FeeStore: DomainPort + HealthCheckable {
    /// Starts a unit of work
    async fn begin(&self) -> Result<Box<dyn FeeUnitOfWork>, PortError>;

    async fn account(&self, company_id: CompanyId) -> Result<Option<Account>, PortError>;

    /// Accounts matching the query, ordered by company name
    async fn accounts(&self, query: &AccountQuery) -> Result<Vec<Account>, PortError>;

    /// Transactions with a business date in `range`, in sequence order
    async fn transactions(&self, company_id: CompanyId, range: DateRange) -> Result<Vec<Transaction>, PortError>;

    /// Transactions pointing at one source document, in sequence order
    async fn transactions_for(
        &self,
        company_id: CompanyId,
        reference: Reference,
    ) -> Result<Vec<Transaction>, PortError>;

    async fn calculation(&self, id: CalculationId) -> Result<Option<Calculation>, PortError>;

    /// Calculations matching the query, newest first
    async fn calculations(&self, query: &CalculationQuery) -> Result<Page<Calculation>, PortError>;

    async fn count_calculations(
        &self,
        company_id: Option<CompanyId>,
        statuses: &[CalculationStatus],
    ) -> Result<u64, PortError>;

    async fn refund(&self, id: RefundId) -> Result<Option<Refund>, PortError>;

    /// Refunds matching the query, newest first
    async fn refunds(&self, query: &ReviewQuery) -> Result<Vec<Refund>, PortError>;

    async fn correction(&self, id: CorrectionId) -> Result<Option<Correction>, PortError>;

    /// Corrections matching the query, newest first
    async fn corrections(&self, query: &ReviewQuery) -> Result<Vec<Correction>, PortError>;
}

/// One atomic read-validate-write-append unit
#[async_trait]
pub trait FeeUnitOfWork: Send {
    /// Locks the company's account for the rest of the unit and returns it
    ///
    /// Returns `None` (while still holding the company lock) if no account exists.
    async fn lock_account(&mut self, company_id: CompanyId) -> Result<Option<Account>, PortError>;

    /// Stores a new account; `Conflict` if the company already has one
    async fn insert_account(&mut self, account: &Account) -> Result<(), PortError>;

    async fn save_account(&mut self, account: &Account) -> Result<(), PortError>;

    async fn append_transaction(&mut self, transaction: &Transaction) -> Result<(), PortError>;

    async fn calculation_for_update(&mut self, id: CalculationId) -> Result<Option<Calculation>, PortError>;

    /// Inserts or replaces a calculation with its items and payments
    async fn save_calculation(&mut self, calculation: &Calculation) -> Result<(), PortError>;

    async fn delete_calculation(&mut self, id: CalculationId) -> Result<(), PortError>;

    async fn refund_for_update(&mut self, id: RefundId) -> Result<Option<Refund>, PortError>;

    async fn save_refund(&mut self, refund: &Refund) -> Result<(), PortError>;

    async fn correction_for_update(&mut self, id: CorrectionId) -> Result<Option<Correction>, PortError>;

    async fn save_correction(&mut self, correction: &Correction) -> Result<(), PortError>;

    /// Next number in a (series, year) counter
    async fn next_sequence(&mut self, series: DocumentSeries, year: i32) -> Result<u64, PortError>;

    /// Makes every write of the unit visible at once
    async fn commit(self: Box<Self>) -> Result<(), PortError>;
}
