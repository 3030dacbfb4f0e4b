//! Per-payer fee account
//!
//! An account is opened once per company and never deleted. Its balance and
//! running totals change only through `Account::post`, which turns a
//! `Posting` into the next `Transaction` of the account log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, CompanyId, Money, TransactionId};
use crate::error::LedgerError;
use crate::transaction::{Entry, Posting, Transaction, TransactionKind};

/// A payer's fee account
///
/// # Invariants
///
/// - `balance` equals Σcredits − Σdebits over the account log
/// - `total_charged` equals Σcharge debits plus the signed correction deltas
/// - `total_paid` and `total_offset` equal the credits of their kinds
/// - `posted_count` is the sequence of the last appended transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub company_id: CompanyId,
    pub company_name: String,
    pub company_tax_number: String,
    pub balance: Money,
    pub total_charged: Money,
    pub total_paid: Money,
    pub total_offset: Money,
    pub posted_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Running totals touched by a single transaction
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct TotalsDelta {
    charged: Money,
    paid: Money,
    offset: Money,
}

impl TotalsDelta {
    fn of(kind: TransactionKind, entry: &Entry) -> Self {
        let mut delta = TotalsDelta::default();
        match kind {
            TransactionKind::Charge => delta.charged = entry.debit(),
            TransactionKind::Correction => delta.charged = entry.debit() - entry.credit(),
            TransactionKind::Payment => delta.paid = entry.credit(),
            TransactionKind::Offset => delta.offset = entry.credit(),
            TransactionKind::Refund | TransactionKind::Penalty => {}
        }
        delta
    }
}

impl Account {
    /// Opens a zero-balance account for a company
    pub fn open(
        company_id: CompanyId,
        company_name: impl Into<String>,
        company_tax_number: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AccountId::new_v7(),
            company_id,
            company_name: company_name.into(),
            company_tax_number: company_tax_number.into(),
            balance: Money::zero(),
            total_charged: Money::zero(),
            total_paid: Money::zero(),
            total_offset: Money::zero(),
            posted_count: 0,
            created_at: now,
            last_updated: now,
        }
    }

    /// Returns true if the payer owes money
    pub fn has_debt(&self) -> bool {
        self.balance.is_negative()
    }

    pub fn has_positive_balance(&self) -> bool {
        self.balance.is_positive()
    }

    /// Applies a posting and returns the transaction to append
    ///
    /// Every new value is computed before the account is touched, so a
    /// failed posting leaves the account unchanged.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if the posting amount is not strictly positive
    /// - `InsufficientBalance` if a refund disbursement exceeds the balance
    /// - `Overflow` if any aggregate overflows
    pub fn post(&mut self, posting: Posting, now: DateTime<Utc>) -> Result<Transaction, LedgerError> {
        let amount = posting.entry.amount();
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(format!(
                "{} amount must be greater than zero, got {}",
                posting.kind, amount
            )));
        }

        if posting.kind == TransactionKind::Refund && posting.entry.is_debit() && self.balance < amount {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available: self.balance,
            });
        }

        let balance = self.balance.checked_add(&posting.entry.signed())?;
        let delta = TotalsDelta::of(posting.kind, &posting.entry);
        let total_charged = self.total_charged.checked_add(&delta.charged)?;
        let total_paid = self.total_paid.checked_add(&delta.paid)?;
        let total_offset = self.total_offset.checked_add(&delta.offset)?;
        let sequence = self.posted_count.checked_add(1).ok_or(LedgerError::Overflow)?;

        let transaction = Transaction {
            id: TransactionId::new_v7(),
            account_id: self.id,
            sequence,
            date: posting.date.unwrap_or_else(|| now.date_naive()),
            kind: posting.kind,
            entry: posting.entry,
            balance_after: balance,
            reference: posting.reference,
            description: posting.description,
            created_at: now,
        };

        self.balance = balance;
        self.total_charged = total_charged;
        self.total_paid = total_paid;
        self.total_offset = total_offset;
        self.posted_count = sequence;
        self.last_updated = now;

        Ok(transaction)
    }

    /// Applies postings in order as one unit
    ///
    /// Postings are applied to a copy of the account, which replaces this one
    /// only if every posting succeeds.
    pub fn post_all(&mut self, postings: Vec<Posting>, now: DateTime<Utc>) -> Result<Vec<Transaction>, LedgerError> {
        let mut working = self.clone();
        let posted = postings
            .into_iter()
            .map(|posting| working.post(posting, now))
            .collect::<Result<Vec<_>, _>>()?;
        *self = working;
        Ok(posted)
    }

    /// Replays `log` from zero and checks it against the stored state
    ///
    /// The log must be this account's complete history in sequence order.
    ///
    /// # Errors
    ///
    /// Returns `ReplayMismatch` naming the first sequence that disagrees
    pub fn verify(&self, log: &[Transaction]) -> Result<(), LedgerError> {
        let mut balance = Money::zero();
        let mut totals = TotalsDelta::default();

        for (index, transaction) in log.iter().enumerate() {
            let expected_sequence = index as u64 + 1;
            let mismatch = |message: String| LedgerError::ReplayMismatch {
                sequence: transaction.sequence,
                message,
            };

            if transaction.account_id != self.id {
                return Err(mismatch(format!("belongs to account {}", transaction.account_id)));
            }
            if transaction.sequence != expected_sequence {
                return Err(mismatch(format!("expected sequence {}", expected_sequence)));
            }
            if !transaction.entry.amount().is_positive() {
                return Err(mismatch("non-positive amount".to_string()));
            }

            balance = balance.checked_add(&transaction.entry.signed())?;
            if transaction.balance_after != balance {
                return Err(mismatch(format!(
                    "stored balance {} but replay gives {}",
                    transaction.balance_after, balance
                )));
            }

            let delta = TotalsDelta::of(transaction.kind, &transaction.entry);
            totals.charged = totals.charged.checked_add(&delta.charged)?;
            totals.paid = totals.paid.checked_add(&delta.paid)?;
            totals.offset = totals.offset.checked_add(&delta.offset)?;
        }

        let last = log.len() as u64;
        let summary = |message: String| LedgerError::ReplayMismatch { sequence: last, message };

        if self.posted_count != last {
            return Err(summary(format!("account records {} postings, log has {}", self.posted_count, last)));
        }
        if self.balance != balance {
            return Err(summary(format!("account balance {} but replay gives {}", self.balance, balance)));
        }
        if self.total_charged != totals.charged {
            return Err(summary(format!("total charged {} but replay gives {}", self.total_charged, totals.charged)));
        }
        if self.total_paid != totals.paid {
            return Err(summary(format!("total paid {} but replay gives {}", self.total_paid, totals.paid)));
        }
        if self.total_offset != totals.offset {
            return Err(summary(format!("total offset {} but replay gives {}", self.total_offset, totals.offset)));
        }

        Ok(())
    }
}
