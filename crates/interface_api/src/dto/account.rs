//! Ledger DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use app_services::AccountQuery;
use core_kernel::Money;
use domain_ledger::{Account, Reconciliation, ReferenceKind, Transaction, TransactionKind};

use super::common::positive_decimal;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OpenAccountRequest {
    pub company_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub company_name: String,
    #[validate(length(min = 1, max = 32))]
    pub tax_number: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountListQuery {
    pub search: Option<String>,
    pub has_debt: Option<bool>,
    pub has_positive_balance: Option<bool>,
}

impl From<AccountListQuery> for AccountQuery {
    fn from(query: AccountListQuery) -> Self {
        AccountQuery {
            search: query.search,
            has_debt: query.has_debt,
            has_positive_balance: query.has_positive_balance,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChargeRequest {
    #[validate(custom(function = "positive_decimal"))]
    pub amount: Decimal,
    pub calculation_id: Uuid,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[validate(custom(function = "positive_decimal"))]
    pub amount: Decimal,
    pub payment_date: Option<NaiveDate>,
    #[validate(length(max = 100))]
    pub document_number: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OffsetRequest {
    #[validate(custom(function = "positive_decimal"))]
    pub amount: Decimal,
    pub report_id: Uuid,
}

/// Body of both the refund disbursement and the penalty endpoints
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AmountWithReasonRequest {
    #[validate(custom(function = "positive_decimal"))]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: Uuid,
    pub company_id: Uuid,
    pub company_name: String,
    pub company_tax_number: String,
    pub balance: Money,
    pub total_charged: Money,
    pub total_paid: Money,
    pub total_offset: Money,
    pub transaction_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: *account.id.as_uuid(),
            company_id: *account.company_id.as_uuid(),
            company_name: account.company_name,
            company_tax_number: account.company_tax_number,
            balance: account.balance,
            total_charged: account.total_charged,
            total_paid: account.total_paid,
            total_offset: account.total_offset,
            transaction_count: account.posted_count,
            created_at: account.created_at,
            last_updated: account.last_updated,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: Uuid,
    pub sequence: u64,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub debit: Money,
    pub credit: Money,
    pub balance_after: Money,
    pub reference_type: Option<ReferenceKind>,
    pub reference_id: Option<Uuid>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(tx: Transaction) -> Self {
        Self {
            id: *tx.id.as_uuid(),
            sequence: tx.sequence,
            date: tx.date,
            kind: tx.kind,
            debit: tx.debit(),
            credit: tx.credit(),
            balance_after: tx.balance_after,
            reference_type: tx.reference.as_ref().map(|r| r.kind()),
            reference_id: tx.reference.as_ref().map(|r| r.source_id()),
            description: tx.description,
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResponse {
    pub calculation_id: Uuid,
    pub charged: Money,
    pub paid: Money,
    pub offset: Money,
    pub balance: Money,
    pub settled: bool,
}

impl From<Reconciliation> for ReconciliationResponse {
    fn from(r: Reconciliation) -> Self {
        Self {
            settled: r.is_settled(),
            calculation_id: *r.calculation_id.as_uuid(),
            charged: r.charged,
            paid: r.paid,
            offset: r.offset,
            balance: r.balance,
        }
    }
}
