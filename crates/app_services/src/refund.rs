//! Refund workflow service

use std::sync::Arc;
use tracing::{info, instrument};

use core_kernel::{CalculationId, CompanyId, DocumentSeries, RefundId};
use domain_adjustment::{AdjustmentError, AdjustmentEvent, Refund, RefundItem, ReviewStatus};

use crate::actor::Actor;
use crate::calculation::next_number;
use crate::error::ServiceError;
use crate::ledger::{lock_existing, post_in};
use crate::notification::Notifier;
use crate::ports::{FeeStore, ReviewQuery};

#[derive(Clone)]
pub struct RefundService {
    store: Arc<dyn FeeStore>,
    notifier: Notifier,
}

impl RefundService {
    pub fn new(store: Arc<dyn FeeStore>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    /// Files a refund request against the payer's own calculations
    #[instrument(skip_all, fields(user = %actor.user_id, items = items.len()))]
    pub async fn create(
        &self,
        actor: &Actor,
        items: Vec<RefundItem>,
        comment: Option<String>,
    ) -> Result<Refund, ServiceError> {
        let company_id = actor.payer_company()?;
        ensure_owned(self.store.as_ref(), company_id, items.iter().map(|i| i.calculation_id)).await?;

        let mut uow = self.store.begin().await?;
        let account = lock_existing(uow.as_mut(), company_id).await?;
        let number = next_number(uow.as_mut(), DocumentSeries::Refund).await?;
        let refund = Refund::request(number, company_id, items, comment, &actor.user_id)?;
        uow.save_refund(&refund).await?;
        uow.commit().await?;

        info!(refund_id = %refund.id, number = %refund.number, total = %refund.total_amount, "Refund requested");
        self.notifier.adjustment(&refund.requested_event(), &account.company_name);
        Ok(refund)
    }

    pub async fn get(&self, actor: &Actor, id: RefundId) -> Result<Refund, ServiceError> {
        let refund = self
            .store
            .refund(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Refund", id))?;
        actor.ensure_can_read(refund.company_id)?;
        Ok(refund)
    }

    /// Payers see their own refunds, staff see all
    pub async fn list(&self, actor: &Actor, status: Option<ReviewStatus>) -> Result<Vec<Refund>, ServiceError> {
        let query = ReviewQuery {
            company_id: actor.scope()?,
            status,
        };
        Ok(self.store.refunds(&query).await?)
    }

    /// Approves a pending refund and credits its total to the account
    #[instrument(skip_all, fields(refund_id = %id))]
    pub async fn approve(&self, actor: &Actor, id: RefundId) -> Result<Refund, ServiceError> {
        self.decide(actor, id, |refund, reviewer| refund.approve(reviewer)).await
    }

    #[instrument(skip_all, fields(refund_id = %id))]
    pub async fn reject(&self, actor: &Actor, id: RefundId, reason: Option<String>) -> Result<Refund, ServiceError> {
        self.decide(actor, id, move |refund, reviewer| refund.reject(reviewer, reason)).await
    }

    pub async fn pending_count(&self, actor: &Actor) -> Result<u64, ServiceError> {
        actor.ensure_reviewer()?;
        let query = ReviewQuery {
            company_id: None,
            status: Some(ReviewStatus::Pending),
        };
        Ok(self.store.refunds(&query).await?.len() as u64)
    }

    async fn decide<F>(&self, actor: &Actor, id: RefundId, transition: F) -> Result<Refund, ServiceError>
    where
        F: FnOnce(&mut Refund, &str) -> Result<AdjustmentEvent, AdjustmentError> + Send,
    {
        actor.ensure_reviewer()?;
        let company_id = self
            .store
            .refund(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Refund", id))?
            .company_id;

        let mut uow = self.store.begin().await?;
        let mut account = lock_existing(uow.as_mut(), company_id).await?;
        let mut refund = uow
            .refund_for_update(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Refund", id))?;

        let event = transition(&mut refund, &actor.user_id)?;
        if refund.status == ReviewStatus::Approved {
            post_in(uow.as_mut(), &mut account, vec![refund.ledger_posting()]).await?;
        }
        uow.save_refund(&refund).await?;
        uow.commit().await?;

        info!(number = %refund.number, status = %refund.status, "Refund reviewed");
        self.notifier.adjustment(&event, &account.company_name);
        Ok(refund)
    }
}

/// Fails with `NotFound` unless every calculation exists and belongs to the company
pub(crate) async fn ensure_owned(
    store: &dyn FeeStore,
    company_id: CompanyId,
    calculation_ids: impl Iterator<Item = CalculationId>,
) -> Result<(), ServiceError> {
    let mut seen = Vec::new();
    for id in calculation_ids {
        if seen.contains(&id) {
            continue;
        }
        let owned = store
            .calculation(id)
            .await?
            .is_some_and(|c| c.company_id == company_id);
        if !owned {
            return Err(ServiceError::not_found("Calculation", id));
        }
        seen.push(id);
    }
    Ok(())
}
