//! Pre-built Test Fixtures
//!
//! Ready-to-use inputs for the fee ledger: callers, items, headers and
//! payment submissions with predictable amounts.

use chrono::NaiveDate;
use fake::{faker::company::en::CompanyName, Fake};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use app_services::{Actor, Role};
use core_kernel::{CompanyId, Money};
use domain_calculation::{
    CalculationHeader, DocumentType, ItemInput, PaymentMethod, PaymentSubmission, RateCatalog, RateEntry,
};

/// Company registration data
pub struct CompanyFixtures;

impl CompanyFixtures {
    pub fn name() -> &'static str {
        "Eco Plast LLC"
    }

    pub fn tax_number() -> &'static str {
        "010203040506"
    }

    pub fn other_name() -> &'static str {
        "Glass Works JSC"
    }

    /// Generated company name for tests that open many accounts
    pub fn random_name() -> String {
        CompanyName().fake()
    }
}

/// Callers with each role
pub struct ActorFixtures;

impl ActorFixtures {
    pub fn payer(company_id: CompanyId) -> Actor {
        Actor::payer("payer-1", company_id)
    }

    /// A payer token that names no company
    pub fn unlinked_payer() -> Actor {
        Actor {
            user_id: "payer-unlinked".to_string(),
            role: Role::Business,
            company_id: None,
        }
    }

    pub fn operator() -> Actor {
        Actor::staff("operator-1", Role::EcoOperator)
    }

    pub fn employee() -> Actor {
        Actor::staff("employee-1", Role::Employee)
    }

    pub fn admin() -> Actor {
        Actor::staff("admin-1", Role::Admin)
    }
}

/// Calculation line items
pub struct ItemFixtures;

impl ItemFixtures {
    /// Plastic packaging at 500 per tonne with a 20 % recycling norm
    pub fn plastic(weight_kg: Decimal) -> ItemInput {
        ItemInput {
            product_group: "Plastic packaging".to_string(),
            tnved_code: Some("3923".to_string()),
            weight: Some(weight_kg),
            rate: Some(dec!(500)),
            recycling_norm: Some(dec!(20)),
            ..Default::default()
        }
    }

    /// Glass at 300 per tonne, no norm
    pub fn glass(weight_kg: Decimal) -> ItemInput {
        ItemInput {
            product_group: "Glass containers".to_string(),
            weight: Some(weight_kg),
            rate: Some(dec!(300)),
            ..Default::default()
        }
    }

    /// An item with no rate, priced at zero
    pub fn unrated(weight_kg: Decimal) -> ItemInput {
        ItemInput {
            product_group: "Unlisted goods".to_string(),
            weight: Some(weight_kg),
            ..Default::default()
        }
    }
}

/// Calculation headers
pub struct HeaderFixtures;

impl HeaderFixtures {
    pub fn q1_2026() -> CalculationHeader {
        CalculationHeader {
            period: "2026-Q1".to_string(),
            quarter: Some("Q1".to_string()),
            document_type: Some(DocumentType::Gtd),
            document_number: Some("GTD-0001".to_string()),
            document_date: Some(DateFixtures::document_date()),
        }
    }

    pub fn dated(date: NaiveDate) -> CalculationHeader {
        CalculationHeader {
            document_date: Some(date),
            ..Self::q1_2026()
        }
    }
}

/// Payment attempts
pub struct PaymentFixtures;

impl PaymentFixtures {
    pub fn transfer(amount: Decimal) -> PaymentSubmission {
        PaymentSubmission {
            amount: Money::new(amount),
            payment_date: DateFixtures::payment_date(),
            method: PaymentMethod::BankTransfer,
            document_number: Some("PP-100".to_string()),
            document_url: None,
        }
    }
}

pub struct DateFixtures;

impl DateFixtures {
    pub fn document_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 20).unwrap()
    }

    pub fn payment_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 10).unwrap()
    }
}

/// Rate table matching `ItemFixtures`
pub struct RateFixtures;

impl RateFixtures {
    pub fn catalog() -> RateCatalog {
        RateCatalog::from_entries([
            RateEntry {
                product_group: "Plastic packaging".to_string(),
                rate: dec!(500),
                recycling_norm: dec!(20),
            },
            RateEntry {
                product_group: "Glass containers".to_string(),
                rate: dec!(300),
                recycling_norm: Decimal::ZERO,
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_calculation::CalculationItem;

    #[test]
    fn test_plastic_fixture_prices_at_800_for_two_tonnes() {
        let item = CalculationItem::price(ItemFixtures::plastic(dec!(2000)), 0).unwrap();
        assert_eq!(item.amount, Money::new(dec!(800)));
    }

    #[test]
    fn test_catalog_matches_item_fixtures() {
        let catalog = RateFixtures::catalog();
        let plastic = ItemFixtures::plastic(dec!(1));
        assert_eq!(catalog.lookup(&plastic.product_group), (dec!(500), dec!(20)));
    }

    #[test]
    fn test_actor_roles() {
        assert!(ActorFixtures::operator().is_reviewer());
        assert!(ActorFixtures::admin().is_admin());
        assert!(!ActorFixtures::payer(CompanyId::new()).is_reviewer());
    }
}
