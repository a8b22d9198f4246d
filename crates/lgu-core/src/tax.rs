//! # Tax Computer
//!
//! Turns a taxable amount, a resolved rate and the active fee total into a
//! business tax liability, and splits it into quarterly installments.
//!
//! ## Computation Flow
//! ```text
//! taxable_amount ──► × rate ──► tax_amount ─────┐
//!                                               ├──► total_tax ──► Q1 Q2 Q3 Q4
//! aggregate_fees ──────────────► regulatory_fees┘
//! ```
//!
//! Numbers are recomputed on every call; status only ever moves forward.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Quarter, TaxRate, TaxRecordStatus};

/// Number of installments a yearly liability is split into.
pub const INSTALLMENTS_PER_YEAR: usize = 4;

/// The numbers of one business tax computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxComputation {
    pub taxable_amount: Money,
    pub tax_rate: TaxRate,
    pub tax_amount: Money,
    pub regulatory_fees: Money,
    pub total_tax: Money,
}

impl TaxComputation {
    /// Computes `tax = taxable × rate` and `total = tax + fees`.
    ///
    /// ## Example
    /// ```rust
    /// use lgu_core::money::Money;
    /// use lgu_core::tax::TaxComputation;
    /// use lgu_core::types::TaxRate;
    ///
    /// let c = TaxComputation::compute(
    ///     Money::from_major_minor(100_000, 0),
    ///     TaxRate::from_bps(200),
    ///     Money::from_cents(129_998),
    /// );
    /// assert_eq!(c.total_tax.to_string(), "3299.98");
    /// ```
    pub fn compute(taxable_amount: Money, tax_rate: TaxRate, regulatory_fees: Money) -> Self {
        let tax_amount = taxable_amount.calculate_tax(tax_rate);
        TaxComputation {
            taxable_amount,
            tax_rate,
            tax_amount,
            regulatory_fees,
            total_tax: tax_amount + regulatory_fees,
        }
    }

    /// True when the record is billable.
    pub fn is_billable(&self) -> bool {
        self.taxable_amount.is_positive() && self.tax_amount.is_positive()
    }

    /// The four installments of `total_tax`.
    pub fn installments(&self) -> [(Quarter, Money); INSTALLMENTS_PER_YEAR] {
        quarterly_installments(self.total_tax)
    }
}

/// Splits a yearly total into four installments that sum back exactly.
///
/// Leftover centavos go to the earliest quarters.
pub fn quarterly_installments(total: Money) -> [(Quarter, Money); INSTALLMENTS_PER_YEAR] {
    let parts = total.split_even(INSTALLMENTS_PER_YEAR);
    let mut out = [(Quarter::Q1, Money::zero()); INSTALLMENTS_PER_YEAR];
    for (slot, (quarter, amount)) in out.iter_mut().zip(Quarter::ALL.into_iter().zip(parts)) {
        *slot = (quarter, amount);
    }
    out
}

/// Next status of a record after recomputation.
///
/// `Pending` becomes `Approved` once billable. `Approved` and `Active` are
/// kept regardless of the new numbers.
pub fn escalate_status(current: TaxRecordStatus, computation: &TaxComputation) -> TaxRecordStatus {
    match current {
        TaxRecordStatus::Pending if computation.is_billable() => TaxRecordStatus::Approved,
        other => other,
    }
}

/// Whether a persisted computation created or refreshed its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RecordAction {
    Inserted,
    Updated,
}
