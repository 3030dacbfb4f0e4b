//! Per-calculation reconciliation
//!
//! A read-only projection of the transactions that reference one
//! calculation. Always derived from the live log, never stored.

use serde::{Deserialize, Serialize};

use core_kernel::{CalculationId, Money};
use crate::transaction::{Transaction, TransactionKind};

/// Charged, paid and offset amounts recorded against one calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub calculation_id: CalculationId,
    pub charged: Money,
    pub paid: Money,
    pub offset: Money,
    /// charged − paid − offset; positive means still owed
    pub balance: Money,
}

impl Reconciliation {
    /// Sums the log rows that reference `calculation_id`
    pub fn from_log<'a, I>(calculation_id: CalculationId, log: I) -> Self
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut charged = Money::zero();
        let mut paid = Money::zero();
        let mut offset = Money::zero();

        for txn in log.into_iter().filter(|t| t.references_calculation(calculation_id)) {
            match txn.kind {
                TransactionKind::Charge => charged += txn.debit(),
                TransactionKind::Payment => paid += txn.credit(),
                TransactionKind::Offset => offset += txn.credit(),
                _ => {}
            }
        }

        Self {
            calculation_id,
            charged,
            paid,
            offset,
            balance: charged - paid - offset,
        }
    }

    pub fn is_settled(&self) -> bool {
        !self.balance.is_positive()
    }
}
