//! Charge correction service
//!
//! Corrections are created by staff for one company and post nothing until
//! approved. Approval posts one signed correction row per changed line.

use std::sync::Arc;
use tracing::{info, instrument};

use core_kernel::{CompanyId, CorrectionId, DocumentSeries};
use domain_adjustment::{AdjustmentError, AdjustmentEvent, Correction, ReviewStatus};
use domain_ledger::CorrectionLine;

use crate::actor::Actor;
use crate::calculation::next_number;
use crate::error::ServiceError;
use crate::ledger::{lock_existing, post_in};
use crate::notification::Notifier;
use crate::ports::{FeeStore, ReviewQuery};
use crate::refund::ensure_owned;

#[derive(Clone)]
pub struct CorrectionService {
    store: Arc<dyn FeeStore>,
    notifier: Notifier,
}

impl CorrectionService {
    pub fn new(store: Arc<dyn FeeStore>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    #[instrument(skip_all, fields(company_id = %company_id, lines = items.len()))]
    pub async fn create(
        &self,
        actor: &Actor,
        company_id: CompanyId,
        items: Vec<CorrectionLine>,
        comment: Option<String>,
    ) -> Result<Correction, ServiceError> {
        actor.ensure_reviewer()?;
        ensure_owned(self.store.as_ref(), company_id, items.iter().map(|l| l.calculation_id)).await?;

        let mut uow = self.store.begin().await?;
        let account = lock_existing(uow.as_mut(), company_id).await?;
        let number = next_number(uow.as_mut(), DocumentSeries::Correction).await?;
        let correction = Correction::request(number, company_id, items, comment, &actor.user_id)?;
        uow.save_correction(&correction).await?;
        uow.commit().await?;

        info!(
            correction_id = %correction.id,
            number = %correction.number,
            net_change = %correction.net_change(),
            "Correction requested"
        );
        self.notifier.adjustment(&correction.requested_event(), &account.company_name);
        Ok(correction)
    }

    pub async fn get(&self, actor: &Actor, id: CorrectionId) -> Result<Correction, ServiceError> {
        let correction = self
            .store
            .correction(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Correction", id))?;
        actor.ensure_can_read(correction.company_id)?;
        Ok(correction)
    }

    pub async fn list(&self, actor: &Actor, query: &ReviewQuery) -> Result<Vec<Correction>, ServiceError> {
        actor.ensure_reviewer()?;
        Ok(self.store.corrections(query).await?)
    }

    #[instrument(skip_all, fields(correction_id = %id))]
    pub async fn approve(&self, actor: &Actor, id: CorrectionId) -> Result<Correction, ServiceError> {
        self.decide(actor, id, |correction, reviewer| correction.approve(reviewer)).await
    }

    #[instrument(skip_all, fields(correction_id = %id))]
    pub async fn reject(
        &self,
        actor: &Actor,
        id: CorrectionId,
        reason: Option<String>,
    ) -> Result<Correction, ServiceError> {
        self.decide(actor, id, move |correction, reviewer| correction.reject(reviewer, reason)).await
    }

    pub async fn pending_count(&self, actor: &Actor) -> Result<u64, ServiceError> {
        let query = ReviewQuery {
            company_id: None,
            status: Some(ReviewStatus::Pending),
        };
        Ok(self.list(actor, &query).await?.len() as u64)
    }

    async fn decide<F>(&self, actor: &Actor, id: CorrectionId, transition: F) -> Result<Correction, ServiceError>
    where
        F: FnOnce(&mut Correction, &str) -> Result<AdjustmentEvent, AdjustmentError> + Send,
    {
        actor.ensure_reviewer()?;
        let company_id = self
            .store
            .correction(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Correction", id))?
            .company_id;

        let mut uow = self.store.begin().await?;
        let mut account = lock_existing(uow.as_mut(), company_id).await?;
        let mut correction = uow
            .correction_for_update(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Correction", id))?;

        let event = transition(&mut correction, &actor.user_id)?;
        if correction.status == ReviewStatus::Approved {
            post_in(uow.as_mut(), &mut account, correction.ledger_postings()?).await?;
        }
        uow.save_correction(&correction).await?;
        uow.commit().await?;

        info!(number = %correction.number, status = %correction.status, "Correction reviewed");
        self.notifier.adjustment(&event, &account.company_name);
        Ok(correction)
    }
}
