//! Ledger operations
//!
//! Every posting runs in its own unit of work with the account locked, so
//! the appended transaction and the new aggregates commit together.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use core_kernel::{CalculationId, CompanyId, DateRange, Money, ReportId};
use domain_ledger::{Account, Posting, Reconciliation, Reference, Transaction};

use crate::actor::Actor;
use crate::error::ServiceError;
use crate::ports::{AccountQuery, FeeStore, FeeUnitOfWork};

/// Portfolio totals across every account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub total_accounts: u64,
    /// balance < 0
    pub accounts_with_debt: u64,
    /// balance > 0
    pub accounts_with_positive_balance: u64,
    pub total_charged: Money,
    pub total_paid: Money,
    pub total_offset: Money,
}

impl AccountSummary {
    pub fn of<'a>(accounts: impl IntoIterator<Item = &'a Account>) -> Self {
        accounts.into_iter().fold(
            Self {
                total_accounts: 0,
                accounts_with_debt: 0,
                accounts_with_positive_balance: 0,
                total_charged: Money::zero(),
                total_paid: Money::zero(),
                total_offset: Money::zero(),
            },
            |mut summary, account| {
                summary.total_accounts += 1;
                summary.accounts_with_debt += u64::from(account.has_debt());
                summary.accounts_with_positive_balance += u64::from(account.has_positive_balance());
                summary.total_charged += account.total_charged;
                summary.total_paid += account.total_paid;
                summary.total_offset += account.total_offset;
                summary
            },
        )
    }
}

/// Rounds to money and rejects non-positive amounts before any lock is taken
pub(crate) fn positive_amount(amount: Decimal) -> Result<Money, ServiceError> {
    Money::positive(amount).map_err(|e| ServiceError::validation(e.to_string(), Some("amount")))
}

/// Locks the company's account, failing if it was never opened
pub(crate) async fn lock_existing(
    uow: &mut dyn FeeUnitOfWork,
    company_id: CompanyId,
) -> Result<Account, ServiceError> {
    uow.lock_account(company_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Account", company_id))
}

/// Applies postings to a locked account and stages the resulting rows
///
/// The account changes only if every posting succeeds.
pub(crate) async fn post_in(
    uow: &mut dyn FeeUnitOfWork,
    account: &mut Account,
    postings: Vec<Posting>,
) -> Result<Vec<Transaction>, ServiceError> {
    let posted = account.post_all(postings, Utc::now())?;

    for txn in &posted {
        uow.append_transaction(txn).await?;
        info!(
            company_id = %account.company_id,
            kind = %txn.kind,
            amount = %txn.entry.amount(),
            balance = %txn.balance_after,
            sequence = txn.sequence,
            "Posted ledger transaction"
        );
    }
    uow.save_account(account).await?;
    Ok(posted)
}

/// Account opening, postings and ledger queries
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn FeeStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn FeeStore>) -> Self {
        Self { store }
    }

    /// Opens a zero-balance account for a registered company
    #[instrument(skip_all, fields(company_id = %company_id))]
    pub async fn open_account(
        &self,
        actor: &Actor,
        company_id: CompanyId,
        name: &str,
        tax_number: &str,
    ) -> Result<Account, ServiceError> {
        actor.ensure_reviewer()?;
        if name.trim().is_empty() {
            return Err(ServiceError::validation("company name is required", Some("companyName")));
        }

        let mut uow = self.store.begin().await?;
        if uow.lock_account(company_id).await?.is_some() {
            return Err(ServiceError::business(format!(
                "Account already exists for company {}",
                company_id
            )));
        }
        let account = Account::open(company_id, name.trim(), tax_number.trim(), Utc::now());
        uow.insert_account(&account).await?;
        uow.commit().await?;

        info!(account_id = %account.id, "Opened account");
        Ok(account)
    }

    pub async fn account(&self, actor: &Actor, company_id: CompanyId) -> Result<Account, ServiceError> {
        actor.ensure_can_read(company_id)?;
        self.store
            .account(company_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Account", company_id))
    }

    pub async fn accounts(&self, actor: &Actor, query: &AccountQuery) -> Result<Vec<Account>, ServiceError> {
        actor.ensure_reviewer()?;
        Ok(self.store.accounts(query).await?)
    }

    pub async fn summary(&self, actor: &Actor) -> Result<AccountSummary, ServiceError> {
        actor.ensure_reviewer()?;
        let accounts = self.store.accounts(&AccountQuery::default()).await?;
        Ok(AccountSummary::of(&accounts))
    }

    /// Transactions dated within `range`, each with its balance snapshot
    pub async fn history(
        &self,
        actor: &Actor,
        company_id: CompanyId,
        range: DateRange,
    ) -> Result<Vec<Transaction>, ServiceError> {
        self.account(actor, company_id).await?;
        Ok(self.store.transactions(company_id, range).await?)
    }

    #[instrument(skip_all, fields(company_id = %company_id, amount = %amount))]
    pub async fn charge(
        &self,
        actor: &Actor,
        company_id: CompanyId,
        amount: Decimal,
        calculation_id: CalculationId,
        description: Option<String>,
    ) -> Result<Transaction, ServiceError> {
        actor.ensure_reviewer()?;
        let amount = positive_amount(amount)?;
        self.post_one(company_id, Posting::charge(amount, calculation_id, description)).await
    }

    #[instrument(skip_all, fields(company_id = %company_id, amount = %amount))]
    pub async fn pay(
        &self,
        actor: &Actor,
        company_id: CompanyId,
        amount: Decimal,
        date: Option<NaiveDate>,
        document_number: Option<String>,
    ) -> Result<Transaction, ServiceError> {
        actor.ensure_reviewer()?;
        let amount = positive_amount(amount)?;
        let posting = Posting::payment(amount, date, document_number.as_deref(), None);
        self.post_one(company_id, posting).await
    }

    #[instrument(skip_all, fields(company_id = %company_id, amount = %amount))]
    pub async fn offset(
        &self,
        actor: &Actor,
        company_id: CompanyId,
        amount: Decimal,
        report_id: ReportId,
    ) -> Result<Transaction, ServiceError> {
        actor.ensure_reviewer()?;
        let amount = positive_amount(amount)?;
        self.post_one(company_id, Posting::offset(amount, report_id)).await
    }

    /// Disburses money back to the payer; fails if the balance does not cover it
    #[instrument(skip_all, fields(company_id = %company_id, amount = %amount))]
    pub async fn refund_request(
        &self,
        actor: &Actor,
        company_id: CompanyId,
        amount: Decimal,
        reason: &str,
    ) -> Result<Transaction, ServiceError> {
        actor.ensure_reviewer()?;
        let amount = positive_amount(amount)?;
        self.post_one(company_id, Posting::refund_request(amount, reason)).await
    }

    #[instrument(skip_all, fields(company_id = %company_id, amount = %amount))]
    pub async fn penalty(
        &self,
        actor: &Actor,
        company_id: CompanyId,
        amount: Decimal,
        reason: &str,
    ) -> Result<Transaction, ServiceError> {
        actor.ensure_admin()?;
        if reason.trim().is_empty() {
            return Err(ServiceError::validation("penalty reason is required", Some("reason")));
        }
        let amount = positive_amount(amount)?;
        self.post_one(company_id, Posting::penalty(amount, reason.trim())).await
    }

    /// Charged, paid and offset amounts recorded against one calculation
    pub async fn reconcile(
        &self,
        actor: &Actor,
        company_id: CompanyId,
        calculation_id: CalculationId,
    ) -> Result<Reconciliation, ServiceError> {
        self.account(actor, company_id).await?;
        let owned = self
            .store
            .calculation(calculation_id)
            .await?
            .is_some_and(|c| c.company_id == company_id);
        if !owned {
            return Err(ServiceError::not_found("Calculation", calculation_id));
        }

        let log = self
            .store
            .transactions_for(company_id, Reference::Calculation(calculation_id))
            .await?;
        Ok(Reconciliation::from_log(calculation_id, &log))
    }

    /// Replays the account's log and checks every snapshot and aggregate
    pub async fn verify(&self, actor: &Actor, company_id: CompanyId) -> Result<(), ServiceError> {
        actor.ensure_reviewer()?;
        let account = self.account(actor, company_id).await?;
        let log = self.store.transactions(company_id, DateRange::unbounded()).await?;
        Ok(account.verify(&log)?)
    }

    async fn post_one(&self, company_id: CompanyId, posting: Posting) -> Result<Transaction, ServiceError> {
        let mut uow = self.store.begin().await?;
        let mut account = lock_existing(uow.as_mut(), company_id).await?;
        let mut posted = post_in(uow.as_mut(), &mut account, vec![posting]).await?;
        uow.commit().await?;
        posted
            .pop()
            .ok_or_else(|| ServiceError::internal("posting produced no transaction"))
    }
}
