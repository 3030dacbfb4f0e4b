//! Calculation workflow service
//!
//! Each transition locks the owning company's account before loading the
//! calculation for update, so transitions of one company serialize with its
//! ledger postings. Approval posts the charge and payment confirmation posts
//! the payment in the same unit of work as the status change. Notifications
//! go out only after commit.

use chrono::{Datelike, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

use core_kernel::{CalculationId, DocumentSeries};
use domain_calculation::{
    Calculation, CalculationEvent, CalculationHeader, CalculationStatus, ItemInput, PaymentSubmission,
};
use domain_ledger::{Account, Posting, Reference};

use crate::actor::Actor;
use crate::error::ServiceError;
use crate::ledger::{lock_existing, post_in};
use crate::notification::Notifier;
use crate::ports::{CalculationQuery, FeeStore, FeeUnitOfWork, Page};

/// Who may run a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    /// The payer company that owns the calculation
    Owner,
    Reviewer,
}

/// A calculation loaded for update with its company's account locked
struct Locked {
    uow: Box<dyn FeeUnitOfWork>,
    account: Account,
    calculation: Calculation,
}

/// Allocates the next `{PREFIX}-{year}-{seq}` number inside a unit of work
pub(crate) async fn next_number(
    uow: &mut dyn FeeUnitOfWork,
    series: DocumentSeries,
) -> Result<String, ServiceError> {
    let year = Utc::now().year();
    let sequence = uow.next_sequence(series, year).await?;
    Ok(series.format(year, sequence))
}

#[derive(Clone)]
pub struct CalculationService {
    store: Arc<dyn FeeStore>,
    notifier: Notifier,
}

impl CalculationService {
    pub fn new(store: Arc<dyn FeeStore>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    /// Lists calculations visible to the actor
    ///
    /// Payers only see their own company. Staff listing without a status
    /// filter do not see drafts.
    pub async fn list(&self, actor: &Actor, query: CalculationQuery) -> Result<Page<Calculation>, ServiceError> {
        let mut query = query.normalized();
        match actor.scope()? {
            Some(company_id) => query.company_id = Some(company_id),
            None if query.statuses.is_empty() => {
                query.statuses = CalculationStatus::ALL
                    .iter()
                    .copied()
                    .filter(|s| *s != CalculationStatus::Draft)
                    .collect();
            }
            None => {}
        }
        Ok(self.store.calculations(&query).await?)
    }

    pub async fn get(&self, actor: &Actor, id: CalculationId) -> Result<Calculation, ServiceError> {
        let calculation = self
            .store
            .calculation(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Calculation", id))?;
        actor.ensure_can_read(calculation.company_id)?;
        Ok(calculation)
    }

    #[instrument(skip_all, fields(user = %actor.user_id))]
    pub async fn create(
        &self,
        actor: &Actor,
        header: CalculationHeader,
        items: Vec<ItemInput>,
    ) -> Result<Calculation, ServiceError> {
        let company_id = actor.payer_company()?;

        let mut uow = self.store.begin().await?;
        lock_existing(uow.as_mut(), company_id).await?;
        let number = next_number(uow.as_mut(), DocumentSeries::Calculation).await?;
        let calculation = Calculation::draft(number, company_id, header, items, &actor.user_id)?;
        uow.save_calculation(&calculation).await?;
        uow.commit().await?;

        info!(calculation_id = %calculation.id, number = %calculation.number, "Created calculation");
        Ok(calculation)
    }

    /// Replaces header and items of a draft or rejected calculation
    pub async fn update(
        &self,
        actor: &Actor,
        id: CalculationId,
        header: CalculationHeader,
        items: Vec<ItemInput>,
    ) -> Result<Calculation, ServiceError> {
        let mut locked = self.open(actor, id, Access::Owner).await?;
        let event = locked.calculation.edit(header, items)?;
        self.finish(locked, event).await
    }

    /// Replaces only the items, keeping the header
    pub async fn update_items(
        &self,
        actor: &Actor,
        id: CalculationId,
        items: Vec<ItemInput>,
    ) -> Result<Calculation, ServiceError> {
        let mut locked = self.open(actor, id, Access::Owner).await?;
        let header = header_of(&locked.calculation);
        let event = locked.calculation.edit(header, items)?;
        self.finish(locked, event).await
    }

    #[instrument(skip_all, fields(calculation_id = %id))]
    pub async fn delete(&self, actor: &Actor, id: CalculationId) -> Result<(), ServiceError> {
        let Locked { mut uow, calculation, .. } = self.open(actor, id, Access::Owner).await?;
        calculation.ensure_deletable()?;
        uow.delete_calculation(id).await?;
        uow.commit().await?;
        info!(number = %calculation.number, "Deleted calculation");
        Ok(())
    }

    #[instrument(skip_all, fields(calculation_id = %id))]
    pub async fn submit(&self, actor: &Actor, id: CalculationId) -> Result<Calculation, ServiceError> {
        let mut locked = self.open(actor, id, Access::Owner).await?;
        let event = locked.calculation.submit()?;
        self.finish(locked, Some(event)).await
    }

    #[instrument(skip_all, fields(calculation_id = %id))]
    pub async fn resubmit(&self, actor: &Actor, id: CalculationId) -> Result<Calculation, ServiceError> {
        let mut locked = self.open(actor, id, Access::Owner).await?;
        let event = locked.calculation.resubmit()?;
        self.finish(locked, Some(event)).await
    }

    #[instrument(skip_all, fields(calculation_id = %id))]
    pub async fn take_into_review(&self, actor: &Actor, id: CalculationId) -> Result<Calculation, ServiceError> {
        let mut locked = self.open(actor, id, Access::Reviewer).await?;
        let event = locked.calculation.take_into_review(&actor.user_id)?;
        self.finish(locked, Some(event)).await
    }

    /// Approves and charges the total to the company's account
    ///
    /// A zero total is approved without a posting.
    #[instrument(skip_all, fields(calculation_id = %id))]
    pub async fn approve(
        &self,
        actor: &Actor,
        id: CalculationId,
        comment: Option<String>,
    ) -> Result<Calculation, ServiceError> {
        let mut locked = self.open(actor, id, Access::Reviewer).await?;
        let event = locked.calculation.approve(&actor.user_id, comment)?;

        let total = locked.calculation.total_amount;
        if total.is_positive() {
            let description = format!("Charge for calculation {}", locked.calculation.number);
            let posting = Posting::charge(total, id, Some(description));
            post_in(locked.uow.as_mut(), &mut locked.account, vec![posting]).await?;
        }
        self.finish(locked, Some(event)).await
    }

    #[instrument(skip_all, fields(calculation_id = %id))]
    pub async fn reject(
        &self,
        actor: &Actor,
        id: CalculationId,
        comment: Option<&str>,
    ) -> Result<Calculation, ServiceError> {
        let mut locked = self.open(actor, id, Access::Reviewer).await?;
        let event = locked.calculation.reject(&actor.user_id, comment)?;
        self.finish(locked, Some(event)).await
    }

    /// Copies items and period into a fresh draft with a new number
    pub async fn copy(&self, actor: &Actor, id: CalculationId) -> Result<Calculation, ServiceError> {
        let Locked { mut uow, calculation, .. } = self.open(actor, id, Access::Owner).await?;
        let number = next_number(uow.as_mut(), DocumentSeries::Calculation).await?;
        let copy = calculation.copy_as(number, &actor.user_id)?;
        uow.save_calculation(&copy).await?;
        uow.commit().await?;

        info!(source = %calculation.number, number = %copy.number, "Copied calculation");
        Ok(copy)
    }

    #[instrument(skip_all, fields(calculation_id = %id, amount = %submission.amount))]
    pub async fn submit_payment(
        &self,
        actor: &Actor,
        id: CalculationId,
        submission: PaymentSubmission,
    ) -> Result<Calculation, ServiceError> {
        let mut locked = self.open(actor, id, Access::Owner).await?;
        let number = next_number(locked.uow.as_mut(), DocumentSeries::Payment).await?;
        let event = locked.calculation.submit_payment(number, submission, &actor.user_id)?;
        self.finish(locked, Some(event)).await
    }

    /// Confirms the pending attempt and credits it to the account
    #[instrument(skip_all, fields(calculation_id = %id))]
    pub async fn approve_payment(&self, actor: &Actor, id: CalculationId) -> Result<Calculation, ServiceError> {
        let mut locked = self.open(actor, id, Access::Reviewer).await?;
        let (payment, event) = locked.calculation.approve_payment(&actor.user_id)?;

        let posting = Posting::payment(
            payment.amount,
            Some(payment.payment_date),
            payment.document_number.as_deref(),
            Some(Reference::Calculation(id)),
        );
        post_in(locked.uow.as_mut(), &mut locked.account, vec![posting]).await?;
        self.finish(locked, Some(event)).await
    }

    #[instrument(skip_all, fields(calculation_id = %id))]
    pub async fn reject_payment(
        &self,
        actor: &Actor,
        id: CalculationId,
        comment: Option<String>,
    ) -> Result<Calculation, ServiceError> {
        let mut locked = self.open(actor, id, Access::Reviewer).await?;
        let event = locked.calculation.reject_payment(&actor.user_id, comment)?;
        self.finish(locked, Some(event)).await
    }

    /// Forces `Paid` without checking amounts or posting
    #[instrument(skip_all, fields(calculation_id = %id))]
    pub async fn mark_paid(&self, actor: &Actor, id: CalculationId) -> Result<Calculation, ServiceError> {
        let mut locked = self.open(actor, id, Access::Reviewer).await?;
        let event = locked.calculation.mark_paid(&actor.user_id)?;
        self.finish(locked, Some(event)).await
    }

    /// The payer's calculations waiting for a reviewer
    pub async fn pending_count(&self, actor: &Actor) -> Result<u64, ServiceError> {
        let company_id = actor.payer_company()?;
        Ok(self
            .store
            .count_calculations(Some(company_id), &CalculationStatus::AWAITING_REVIEW)
            .await?)
    }

    /// Calculations of every company waiting for a reviewer
    pub async fn review_count(&self, actor: &Actor) -> Result<u64, ServiceError> {
        actor.ensure_reviewer()?;
        Ok(self
            .store
            .count_calculations(None, &CalculationStatus::AWAITING_REVIEW)
            .await?)
    }

    async fn open(&self, actor: &Actor, id: CalculationId, access: Access) -> Result<Locked, ServiceError> {
        match access {
            Access::Owner => {
                actor.payer_company()?;
            }
            Access::Reviewer => actor.ensure_reviewer()?,
        }

        let company_id = self
            .store
            .calculation(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Calculation", id))?
            .company_id;
        if access == Access::Owner {
            actor.ensure_owner(company_id)?;
        }

        let mut uow = self.store.begin().await?;
        let account = lock_existing(uow.as_mut(), company_id).await?;
        let calculation = uow
            .calculation_for_update(id)
            .await?
            .filter(|c| c.company_id == company_id)
            .ok_or_else(|| ServiceError::not_found("Calculation", id))?;

        Ok(Locked { uow, account, calculation })
    }

    async fn finish(&self, locked: Locked, event: Option<CalculationEvent>) -> Result<Calculation, ServiceError> {
        let Locked { mut uow, account, calculation } = locked;
        uow.save_calculation(&calculation).await?;
        uow.commit().await?;

        if let Some(event) = event {
            info!(
                number = %calculation.number,
                from = %event.from,
                to = %event.to,
                "Calculation {:?}",
                event.kind
            );
            self.notifier.calculation(&event, &account.company_name);
        }
        Ok(calculation)
    }
}

fn header_of(calculation: &Calculation) -> CalculationHeader {
    CalculationHeader {
        period: calculation.period.clone(),
        quarter: calculation.quarter.clone(),
        document_type: calculation.document_type,
        document_number: calculation.document_number.clone(),
        document_date: calculation.document_date,
    }
}
