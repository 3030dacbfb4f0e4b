//! In-memory store
//!
//! Backs the server when no database is configured and every service test.
//! Each company has an async mutex; a unit of work holds the mutexes of the
//! companies it locked until it is committed or dropped. Writes are staged
//! inside the unit and applied under one short write lock at commit, so
//! readers never see a half-applied operation.
//!
//! Sequence counters are advanced immediately and are not rolled back, so a
//! discarded unit of work may leave a gap in document numbers.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use core_kernel::{
    AccountId, CalculationId, CompanyId, CorrectionId, DateRange, DocumentSeries, DomainPort,
    HealthCheckResult, HealthCheckable, PortError, RefundId,
};
use domain_adjustment::{Correction, Refund};
use domain_calculation::{Calculation, CalculationStatus};
use domain_ledger::{Account, Reference, Transaction};

use crate::ports::{AccountQuery, CalculationQuery, FeeStore, FeeUnitOfWork, Page, ReviewQuery};

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<CompanyId, Account>,
    transactions: HashMap<AccountId, Vec<Transaction>>,
    calculations: HashMap<CalculationId, Calculation>,
    refunds: HashMap<RefundId, Refund>,
    corrections: HashMap<CorrectionId, Correction>,
}

type CompanyLocks = Mutex<HashMap<CompanyId, Arc<AsyncMutex<()>>>>;
type Sequences = Mutex<HashMap<(DocumentSeries, i32), u64>>;

/// Thread-safe in-memory implementation of `FeeStore`
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeeStore {
    state: Arc<RwLock<State>>,
    locks: Arc<CompanyLocks>,
    sequences: Arc<Sequences>,
}

impl InMemoryFeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, PortError> {
        self.state.read().map_err(|_| PortError::internal("store state lock poisoned"))
    }
}

impl DomainPort for InMemoryFeeStore {}

#[async_trait]
impl HealthCheckable for InMemoryFeeStore {
    async fn health_check(&self) -> HealthCheckResult {
        match self.read() {
            Ok(_) => HealthCheckResult::healthy("memory-fee-store", 0),
            Err(e) => HealthCheckResult::unhealthy("memory-fee-store", 0, e.to_string()),
        }
    }
}

fn newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl FeeStore for InMemoryFeeStore {
    async fn begin(&self) -> Result<Box<dyn FeeUnitOfWork>, PortError> {
        Ok(Box::new(MemoryUnitOfWork {
            store: self.clone(),
            guards: Vec::new(),
            locked: HashSet::new(),
            staged: Staged::default(),
        }))
    }

    async fn account(&self, company_id: CompanyId) -> Result<Option<Account>, PortError> {
        Ok(self.read()?.accounts.get(&company_id).cloned())
    }

    async fn accounts(&self, query: &AccountQuery) -> Result<Vec<Account>, PortError> {
        let mut accounts: Vec<Account> = self
            .read()?
            .accounts
            .values()
            .filter(|a| query.matches(a))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.company_name.cmp(&b.company_name));
        Ok(accounts)
    }

    async fn transactions(&self, company_id: CompanyId, range: DateRange) -> Result<Vec<Transaction>, PortError> {
        let state = self.read()?;
        let Some(account) = state.accounts.get(&company_id) else {
            return Ok(Vec::new());
        };
        Ok(state
            .transactions
            .get(&account.id)
            .map(|log| log.iter().filter(|t| range.contains(t.date)).cloned().collect())
            .unwrap_or_default())
    }

    async fn transactions_for(
        &self,
        company_id: CompanyId,
        reference: Reference,
    ) -> Result<Vec<Transaction>, PortError> {
        let state = self.read()?;
        let Some(account) = state.accounts.get(&company_id) else {
            return Ok(Vec::new());
        };
        Ok(state
            .transactions
            .get(&account.id)
            .map(|log| log.iter().filter(|t| t.reference == Some(reference)).cloned().collect())
            .unwrap_or_default())
    }

    async fn calculation(&self, id: CalculationId) -> Result<Option<Calculation>, PortError> {
        Ok(self.read()?.calculations.get(&id).cloned())
    }

    async fn calculations(&self, query: &CalculationQuery) -> Result<Page<Calculation>, PortError> {
        let mut matching: Vec<Calculation> = self
            .read()?
            .calculations
            .values()
            .filter(|c| query.matches(c))
            .cloned()
            .collect();
        newest_first(&mut matching, |c| c.created_at);

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.page_size as usize)
            .collect();
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
        let count = self
            .read()?
            .calculations
            .values()
            .filter(|c| company_id.map_or(true, |id| id == c.company_id))
            .filter(|c| statuses.contains(&c.status))
            .count();
        Ok(count as u64)
    }

    async fn refund(&self, id: RefundId) -> Result<Option<Refund>, PortError> {
        Ok(self.read()?.refunds.get(&id).cloned())
    }

    async fn refunds(&self, query: &ReviewQuery) -> Result<Vec<Refund>, PortError> {
        let mut refunds: Vec<Refund> = self
            .read()?
            .refunds
            .values()
            .filter(|r| query.matches(r.company_id, r.status))
            .cloned()
            .collect();
        newest_first(&mut refunds, |r| r.created_at);
        Ok(refunds)
    }

    async fn correction(&self, id: CorrectionId) -> Result<Option<Correction>, PortError> {
        Ok(self.read()?.corrections.get(&id).cloned())
    }

    async fn corrections(&self, query: &ReviewQuery) -> Result<Vec<Correction>, PortError> {
        let mut corrections: Vec<Correction> = self
            .read()?
            .corrections
            .values()
            .filter(|c| query.matches(c.company_id, c.status))
            .cloned()
            .collect();
        newest_first(&mut corrections, |c| c.created_at);
        Ok(corrections)
    }
}

/// Writes waiting for commit; `None` marks a deletion
#[derive(Debug, Default)]
struct Staged {
    new_accounts: HashSet<CompanyId>,
    accounts: HashMap<CompanyId, Account>,
    transactions: Vec<Transaction>,
    calculations: HashMap<CalculationId, Option<Calculation>>,
    refunds: HashMap<RefundId, Refund>,
    corrections: HashMap<CorrectionId, Correction>,
}

struct MemoryUnitOfWork {
    store: InMemoryFeeStore,
    guards: Vec<OwnedMutexGuard<()>>,
    locked: HashSet<CompanyId>,
    staged: Staged,
}

impl MemoryUnitOfWork {
    fn company_lock(&self, company_id: CompanyId) -> Result<Arc<AsyncMutex<()>>, PortError> {
        let mut locks = self
            .store
            .locks
            .lock()
            .map_err(|_| PortError::internal("company lock table poisoned"))?;
        Ok(locks.entry(company_id).or_default().clone())
    }
}

#[async_trait]
impl FeeUnitOfWork for MemoryUnitOfWork {
    async fn lock_account(&mut self, company_id: CompanyId) -> Result<Option<Account>, PortError> {
        if self.locked.insert(company_id) {
            let lock = self.company_lock(company_id)?;
            self.guards.push(lock.lock_owned().await);
            debug!(company_id = %company_id, "Locked account");
        }
        if let Some(account) = self.staged.accounts.get(&company_id) {
            return Ok(Some(account.clone()));
        }
        Ok(self.store.read()?.accounts.get(&company_id).cloned())
    }

    async fn insert_account(&mut self, account: &Account) -> Result<(), PortError> {
        let exists = self.staged.accounts.contains_key(&account.company_id)
            || self.store.read()?.accounts.contains_key(&account.company_id);
        if exists {
            return Err(PortError::conflict(format!(
                "Account already exists for company {}",
                account.company_id
            )));
        }
        self.staged.new_accounts.insert(account.company_id);
        self.staged.accounts.insert(account.company_id, account.clone());
        Ok(())
    }

    async fn save_account(&mut self, account: &Account) -> Result<(), PortError> {
        if !self.locked.contains(&account.company_id) {
            return Err(PortError::internal(format!(
                "account of company {} saved without holding its lock",
                account.company_id
            )));
        }
        self.staged.accounts.insert(account.company_id, account.clone());
        Ok(())
    }

    async fn append_transaction(&mut self, transaction: &Transaction) -> Result<(), PortError> {
        self.staged.transactions.push(transaction.clone());
        Ok(())
    }

    async fn calculation_for_update(&mut self, id: CalculationId) -> Result<Option<Calculation>, PortError> {
        if let Some(staged) = self.staged.calculations.get(&id) {
            return Ok(staged.clone());
        }
        Ok(self.store.read()?.calculations.get(&id).cloned())
    }

    async fn save_calculation(&mut self, calculation: &Calculation) -> Result<(), PortError> {
        self.staged.calculations.insert(calculation.id, Some(calculation.clone()));
        Ok(())
    }

    async fn delete_calculation(&mut self, id: CalculationId) -> Result<(), PortError> {
        self.staged.calculations.insert(id, None);
        Ok(())
    }

    async fn refund_for_update(&mut self, id: RefundId) -> Result<Option<Refund>, PortError> {
        if let Some(staged) = self.staged.refunds.get(&id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.store.read()?.refunds.get(&id).cloned())
    }

    async fn save_refund(&mut self, refund: &Refund) -> Result<(), PortError> {
        self.staged.refunds.insert(refund.id, refund.clone());
        Ok(())
    }

    async fn correction_for_update(&mut self, id: CorrectionId) -> Result<Option<Correction>, PortError> {
        if let Some(staged) = self.staged.corrections.get(&id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.store.read()?.corrections.get(&id).cloned())
    }

    async fn save_correction(&mut self, correction: &Correction) -> Result<(), PortError> {
        self.staged.corrections.insert(correction.id, correction.clone());
        Ok(())
    }

    async fn next_sequence(&mut self, series: DocumentSeries, year: i32) -> Result<u64, PortError> {
        let mut sequences = self
            .store
            .sequences
            .lock()
            .map_err(|_| PortError::internal("sequence table poisoned"))?;
        let counter = sequences.entry((series, year)).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        let MemoryUnitOfWork { store, guards, staged, .. } = *self;
        {
            let mut state = store
                .state
                .write()
                .map_err(|_| PortError::internal("store state lock poisoned"))?;

            for company_id in &staged.new_accounts {
                if state.accounts.contains_key(company_id) {
                    return Err(PortError::conflict(format!("Account already exists for company {}", company_id)));
                }
            }

            for (company_id, account) in staged.accounts {
                state.transactions.entry(account.id).or_default();
                state.accounts.insert(company_id, account);
            }
            for transaction in staged.transactions {
                state.transactions.entry(transaction.account_id).or_default().push(transaction);
            }
            for (id, calculation) in staged.calculations {
                match calculation {
                    Some(calculation) => {
                        state.calculations.insert(id, calculation);
                    }
                    None => {
                        state.calculations.remove(&id);
                    }
                }
            }
            state.refunds.extend(staged.refunds);
            state.corrections.extend(staged.corrections);
        }
        drop(guards);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_kernel::CalculationId;
    use domain_ledger::Posting;
    use rust_decimal_macros::dec;

    async fn seeded() -> (InMemoryFeeStore, CompanyId) {
        let store = InMemoryFeeStore::new();
        let company = CompanyId::new();
        let mut uow = store.begin().await.unwrap();
        assert!(uow.lock_account(company).await.unwrap().is_none());
        uow.insert_account(&Account::open(company, "Eco Plast LLC", "01234567890123", Utc::now()))
            .await
            .unwrap();
        uow.commit().await.unwrap();
        (store, company)
    }

    #[tokio::test]
    async fn test_dropped_unit_discards_writes() {
        let (store, company) = seeded().await;

        {
            let mut uow = store.begin().await.unwrap();
            let mut account = uow.lock_account(company).await.unwrap().unwrap();
            let txn = account
                .post(Posting::charge(core_kernel::Money::new(dec!(10)), CalculationId::new(), None), Utc::now())
                .unwrap();
            uow.append_transaction(&txn).await.unwrap();
            uow.save_account(&account).await.unwrap();
        }

        let account = store.account(company).await.unwrap().unwrap();
        assert!(account.balance.is_zero());
        assert!(store.transactions(company, DateRange::unbounded()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_account_conflicts() {
        let (store, company) = seeded().await;
        let mut uow = store.begin().await.unwrap();
        let result = uow
            .insert_account(&Account::open(company, "Other", "1", Utc::now()))
            .await;
        assert!(matches!(result, Err(PortError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_sequences_count_per_series_and_year() {
        let store = InMemoryFeeStore::new();
        let mut uow = store.begin().await.unwrap();
        assert_eq!(uow.next_sequence(DocumentSeries::Calculation, 2026).await.unwrap(), 1);
        assert_eq!(uow.next_sequence(DocumentSeries::Calculation, 2026).await.unwrap(), 2);
        assert_eq!(uow.next_sequence(DocumentSeries::Refund, 2026).await.unwrap(), 1);
        assert_eq!(uow.next_sequence(DocumentSeries::Calculation, 2027).await.unwrap(), 1);
    }
}
