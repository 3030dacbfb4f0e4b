//! Transaction, posting, and reference types
//!
//! A `Posting` is a request to move an account balance. Once applied by
//! `Account::post` it becomes an immutable `Transaction` carrying the
//! resulting balance snapshot and its position in the account log.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use core_kernel::{
    AccountId, CalculationId, CorrectionId, Money, PaymentId, RefundId, ReportId, TransactionId,
};
use crate::error::LedgerError;

/// Business type of a ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Fee assessed on an approved calculation (debit)
    Charge,
    /// Cash received from the payer (credit)
    Payment,
    /// Debt reduced by recognized recycling volume (credit)
    Offset,
    /// Refund recognized (credit) or disbursed (debit)
    Refund,
    /// Signed adjustment of a previously charged amount
    Correction,
    /// Late-payment or regulatory penalty (debit)
    Penalty,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 6] = [
        TransactionKind::Charge,
        TransactionKind::Payment,
        TransactionKind::Offset,
        TransactionKind::Refund,
        TransactionKind::Correction,
        TransactionKind::Penalty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Charge => "charge",
            TransactionKind::Payment => "payment",
            TransactionKind::Offset => "offset",
            TransactionKind::Refund => "refund",
            TransactionKind::Correction => "correction",
            TransactionKind::Penalty => "penalty",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| LedgerError::MalformedTransaction(format!("unknown transaction kind '{}'", s)))
    }
}

/// Kind of source document a transaction points back to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Calculation,
    Payment,
    Report,
    Refund,
    Correction,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Calculation => "calculation",
            ReferenceKind::Payment => "payment",
            ReferenceKind::Report => "report",
            ReferenceKind::Refund => "refund",
            ReferenceKind::Correction => "correction",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weak reference from a transaction to the document that caused it
///
/// Lookup only: the referenced document may live in another store and is
/// never loaded or cascaded through this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Reference {
    Calculation(CalculationId),
    Payment(PaymentId),
    Report(ReportId),
    Refund(RefundId),
    Correction(CorrectionId),
}

impl Reference {
    pub fn kind(&self) -> ReferenceKind {
        match self {
            Reference::Calculation(_) => ReferenceKind::Calculation,
            Reference::Payment(_) => ReferenceKind::Payment,
            Reference::Report(_) => ReferenceKind::Report,
            Reference::Refund(_) => ReferenceKind::Refund,
            Reference::Correction(_) => ReferenceKind::Correction,
        }
    }

    /// Returns the raw identifier of the source document
    pub fn source_id(&self) -> Uuid {
        match self {
            Reference::Calculation(id) => *id.as_uuid(),
            Reference::Payment(id) => *id.as_uuid(),
            Reference::Report(id) => *id.as_uuid(),
            Reference::Refund(id) => *id.as_uuid(),
            Reference::Correction(id) => *id.as_uuid(),
        }
    }

    /// Rebuilds a reference from its stored (kind, id) columns
    pub fn from_parts(kind: ReferenceKind, id: Uuid) -> Self {
        match kind {
            ReferenceKind::Calculation => Reference::Calculation(CalculationId::from_uuid(id)),
            ReferenceKind::Payment => Reference::Payment(PaymentId::from_uuid(id)),
            ReferenceKind::Report => Reference::Report(ReportId::from_uuid(id)),
            ReferenceKind::Refund => Reference::Refund(RefundId::from_uuid(id)),
            ReferenceKind::Correction => Reference::Correction(CorrectionId::from_uuid(id)),
        }
    }
}

/// Side and amount of a transaction; the amount is always positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "side", content = "amount", rename_all = "snake_case")]
pub enum Entry {
    Debit(Money),
    Credit(Money),
}

impl Entry {
    pub fn amount(&self) -> Money {
        match self {
            Entry::Debit(amount) | Entry::Credit(amount) => *amount,
        }
    }

    pub fn is_debit(&self) -> bool {
        matches!(self, Entry::Debit(_))
    }

    /// Debit column value, zero for credits
    pub fn debit(&self) -> Money {
        match self {
            Entry::Debit(amount) => *amount,
            Entry::Credit(_) => Money::zero(),
        }
    }

    /// Credit column value, zero for debits
    pub fn credit(&self) -> Money {
        match self {
            Entry::Credit(amount) => *amount,
            Entry::Debit(_) => Money::zero(),
        }
    }

    /// Effect on the balance: credits positive, debits negative
    pub fn signed(&self) -> Money {
        self.credit() - self.debit()
    }

    /// Rebuilds an entry from debit/credit columns, exactly one of which must be non-zero
    pub fn from_columns(debit: Money, credit: Money) -> Result<Self, LedgerError> {
        match (debit.is_positive(), credit.is_positive()) {
            (true, false) if credit.is_zero() => Ok(Entry::Debit(debit)),
            (false, true) if debit.is_zero() => Ok(Entry::Credit(credit)),
            _ => Err(LedgerError::MalformedTransaction(format!(
                "expected exactly one positive side, got debit={} credit={}",
                debit, credit
            ))),
        }
    }
}

/// An immutable, appended ledger transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    /// 1-based position in the account log
    pub sequence: u64,
    /// Business date of the movement
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub entry: Entry,
    /// Account balance immediately after this transaction
    pub balance_after: Money,
    pub reference: Option<Reference>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn debit(&self) -> Money {
        self.entry.debit()
    }

    pub fn credit(&self) -> Money {
        self.entry.credit()
    }

    /// Returns true if this transaction references the given calculation
    pub fn references_calculation(&self, calculation_id: CalculationId) -> bool {
        self.reference == Some(Reference::Calculation(calculation_id))
    }
}

/// One line of a correction: the charged amount for a calculation and its corrected value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionLine {
    pub calculation_id: CalculationId,
    pub original_amount: Money,
    pub corrected_amount: Money,
    pub reason: String,
}

impl CorrectionLine {
    /// corrected − original; positive means more is owed
    pub fn delta(&self) -> Money {
        self.corrected_amount - self.original_amount
    }
}

/// A balance movement waiting to be applied to an account
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub kind: TransactionKind,
    pub entry: Entry,
    /// Business date; the posting day is used when absent
    pub date: Option<NaiveDate>,
    pub reference: Option<Reference>,
    pub description: String,
}

impl Posting {
    /// Fee charge for an approved calculation
    pub fn charge(amount: Money, calculation_id: CalculationId, description: Option<String>) -> Self {
        Self {
            kind: TransactionKind::Charge,
            entry: Entry::Debit(amount),
            date: None,
            reference: Some(Reference::Calculation(calculation_id)),
            description: description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| format!("Charge for calculation {}", calculation_id)),
        }
    }

    /// Payment received from the payer
    pub fn payment(
        amount: Money,
        date: Option<NaiveDate>,
        document_number: Option<&str>,
        reference: Option<Reference>,
    ) -> Self {
        let description = match document_number.map(str::trim).filter(|d| !d.is_empty()) {
            Some(number) => format!("Payment, document {}", number),
            None => "Payment".to_string(),
        };
        Self {
            kind: TransactionKind::Payment,
            entry: Entry::Credit(amount),
            date,
            reference,
            description,
        }
    }

    /// Debt offset backed by a recycling report
    pub fn offset(amount: Money, report_id: ReportId) -> Self {
        Self {
            kind: TransactionKind::Offset,
            entry: Entry::Credit(amount),
            date: None,
            reference: Some(Reference::Report(report_id)),
            description: format!("Offset by recycling report {}", report_id),
        }
    }

    /// Cash refund paid out of a positive balance
    pub fn refund_request(amount: Money, reason: &str) -> Self {
        Self {
            kind: TransactionKind::Refund,
            entry: Entry::Debit(amount),
            date: None,
            reference: None,
            description: format!("Refund request: {}", reason.trim()),
        }
    }

    /// Refund entitlement recognized by an approved refund application
    pub fn refund_credit(amount: Money, refund_id: RefundId, number: &str) -> Self {
        Self {
            kind: TransactionKind::Refund,
            entry: Entry::Credit(amount),
            date: None,
            reference: Some(Reference::Refund(refund_id)),
            description: format!("Refund {} approved", number),
        }
    }

    /// Signed correction of one calculation's charge, or None when nothing changes
    ///
    /// The posting references `reference` when given, else the corrected calculation.
    pub fn correction(line: &CorrectionLine, comment: &str, reference: Option<Reference>) -> Option<Self> {
        let delta = line.delta();
        let entry = if delta.is_positive() {
            Entry::Debit(delta)
        } else if delta.is_negative() {
            Entry::Credit(delta.abs())
        } else {
            return None;
        };

        let comment = comment.trim();
        let subject = format!("Correction of calculation {}: {}", line.calculation_id, line.reason.trim());
        Some(Self {
            kind: TransactionKind::Correction,
            entry,
            date: None,
            reference: Some(reference.unwrap_or(Reference::Calculation(line.calculation_id))),
            description: if comment.is_empty() {
                subject
            } else {
                format!("{}. {}", comment, subject)
            },
        })
    }

    /// Penalty assessed against the payer
    pub fn penalty(amount: Money, reason: &str) -> Self {
        Self {
            kind: TransactionKind::Penalty,
            entry: Entry::Debit(amount),
            date: None,
            reference: None,
            description: format!("Penalty: {}", reason.trim()),
        }
    }

    /// Overrides the business date
    pub fn dated(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Builds the postings for a correction, skipping unchanged lines
///
/// # Errors
///
/// Returns `EmptyCorrection` when no line changes the charged amount
pub fn correction_postings(
    lines: &[CorrectionLine],
    comment: &str,
    reference: Option<Reference>,
) -> Result<Vec<Posting>, LedgerError> {
    let postings: Vec<Posting> = lines
        .iter()
        .filter_map(|line| Posting::correction(line, comment, reference))
        .collect();
    if postings.is_empty() {
        return Err(LedgerError::EmptyCorrection);
    }
    Ok(postings)
}
