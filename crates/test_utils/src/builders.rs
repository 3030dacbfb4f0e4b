//! Test Data Builders
//!
//! `FeeWorldBuilder` assembles services over a store with one registered
//! company; `FeeWorld` then walks calculations through the workflow so
//! tests only spell out the step they are about.

use rust_decimal::Decimal;
use std::sync::Arc;

use app_services::{Actor, FeeServices, FeeStore, InMemoryFeeStore, Notifier, ServiceError};
use core_kernel::CompanyId;
use domain_calculation::{Calculation, CalculationHeader, DocumentType, ItemInput};

use crate::fixtures::{ActorFixtures, CompanyFixtures, HeaderFixtures, PaymentFixtures};

/// Builder for calculation header and items
#[derive(Debug, Clone)]
pub struct CalculationInputBuilder {
    header: CalculationHeader,
    items: Vec<ItemInput>,
}

impl Default for CalculationInputBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CalculationInputBuilder {
    pub fn new() -> Self {
        Self {
            header: HeaderFixtures::q1_2026(),
            items: Vec::new(),
        }
    }

    pub fn period(mut self, period: impl Into<String>) -> Self {
        self.header.period = period.into();
        self
    }

    pub fn document(mut self, kind: DocumentType, number: impl Into<String>) -> Self {
        self.header.document_type = Some(kind);
        self.header.document_number = Some(number.into());
        self
    }

    pub fn item(mut self, item: ItemInput) -> Self {
        self.items.push(item);
        self
    }

    pub fn build(self) -> (CalculationHeader, Vec<ItemInput>) {
        (self.header, self.items)
    }
}

/// Services, one company with an open account, and callers for each role
pub struct FeeWorld {
    pub services: FeeServices,
    pub company: CompanyId,
    pub payer: Actor,
    pub reviewer: Actor,
    pub admin: Actor,
}

pub struct FeeWorldBuilder {
    store: Option<Arc<dyn FeeStore>>,
    notifier: Notifier,
    company: CompanyId,
    company_name: String,
}

impl Default for FeeWorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeeWorldBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            notifier: Notifier::tracing(),
            company: CompanyId::new_v7(),
            company_name: CompanyFixtures::name().to_string(),
        }
    }

    /// Defaults to a fresh `InMemoryFeeStore`
    pub fn store(mut self, store: Arc<dyn FeeStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = name.into();
        self
    }

    /// Opens the company's account and returns the world
    pub async fn build(self) -> Result<FeeWorld, ServiceError> {
        let store = self.store.unwrap_or_else(|| Arc::new(InMemoryFeeStore::new()));
        let services = FeeServices::new(store, self.notifier);
        let reviewer = ActorFixtures::operator();
        services
            .ledger
            .open_account(&reviewer, self.company, &self.company_name, CompanyFixtures::tax_number())
            .await?;

        Ok(FeeWorld {
            services,
            company: self.company,
            payer: ActorFixtures::payer(self.company),
            reviewer,
            admin: ActorFixtures::admin(),
        })
    }
}

impl FeeWorld {
    /// Creates and submits a calculation
    pub async fn submitted(&self, items: Vec<ItemInput>) -> Result<Calculation, ServiceError> {
        let calculations = &self.services.calculations;
        let draft = calculations.create(&self.payer, HeaderFixtures::q1_2026(), items).await?;
        calculations.submit(&self.payer, draft.id).await
    }

    /// Creates, submits, reviews and approves a calculation, charging its total
    pub async fn approved(&self, items: Vec<ItemInput>) -> Result<Calculation, ServiceError> {
        let calculations = &self.services.calculations;
        let submitted = self.submitted(items).await?;
        calculations.take_into_review(&self.reviewer, submitted.id).await?;
        calculations.approve(&self.reviewer, submitted.id, None).await
    }

    /// Submits a bank transfer for `amount` and confirms it
    pub async fn pay(&self, calculation: &Calculation, amount: Decimal) -> Result<Calculation, ServiceError> {
        let calculations = &self.services.calculations;
        calculations
            .submit_payment(&self.payer, calculation.id, PaymentFixtures::transfer(amount))
            .await?;
        calculations.approve_payment(&self.reviewer, calculation.id).await
    }

    pub async fn balance(&self) -> Result<Decimal, ServiceError> {
        Ok(self.services.ledger.account(&self.reviewer, self.company).await?.balance.amount())
    }
}
