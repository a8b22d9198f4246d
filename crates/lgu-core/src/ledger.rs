//! # Quarterly Ledger Rules
//!
//! Schedule creation, penalty assessment, annual settlement planning and
//! statements for the quarterly rows of business and property taxes.
//!
//! ## Row State Machine
//! ```text
//!   pending ─────────────────────► paid
//!      │                            ▲
//!      │ due date passed            │ settled
//!      ▼                            │
//!   overdue ────────────────────────┘
//! ```
//!
//! Nothing here touches storage; lgu-db applies the decisions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::tax::quarterly_installments;
use crate::types::{LedgerKind, Quarter, QuarterStatus, QuarterlyTax};

/// Default surcharge per month late: 2%.
pub const DEFAULT_MONTHLY_PENALTY_BPS: u32 = 200;

/// Default penalty ceiling: 72% of the quarter amount (36 months).
pub const DEFAULT_MAX_PENALTY_BPS: u32 = 7_200;

/// Default discount for paying the whole year in advance: 10%.
pub const DEFAULT_ANNUAL_DISCOUNT_BPS: u32 = 1_000;

const DAYS_PER_MONTH: i128 = 30;

// =============================================================================
// Schedule
// =============================================================================

/// Builds the four pending rows for a yearly total.
///
/// ## Example
/// ```rust
/// use lgu_core::ledger::build_schedule;
/// use lgu_core::money::Money;
/// use lgu_core::types::LedgerKind;
///
/// let rows = build_schedule(LedgerKind::Business, "rec-1", Money::from_cents(329_998), 2026).unwrap();
/// assert_eq!(rows.len(), 4);
/// assert_eq!(rows[0].total_quarterly_tax.cents(), 82_500);
/// ```
pub fn build_schedule(
    ledger: LedgerKind,
    parent_total_id: &str,
    total: Money,
    year: i32,
) -> CoreResult<Vec<QuarterlyTax>> {
    quarterly_installments(total)
        .into_iter()
        .map(|(quarter, amount)| {
            let due_date = quarter
                .due_date(year)
                .ok_or_else(|| CoreError::InvalidDate(format!("{} {}", quarter, year)))?;

            Ok(QuarterlyTax {
                id: uuid::Uuid::new_v4().to_string(),
                ledger,
                parent_total_id: parent_total_id.to_string(),
                quarter,
                year,
                due_date,
                total_quarterly_tax: amount,
                penalty_amount: Money::zero(),
                discount_amount: Money::zero(),
                payment_status: QuarterStatus::Pending,
                receipt_number: None,
                paid_at: None,
            })
        })
        .collect()
}

// =============================================================================
// Penalties
// =============================================================================

/// Late-payment surcharge rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyPolicy {
    pub monthly_rate_bps: u32,
    pub max_penalty_bps: u32,
}

impl Default for PenaltyPolicy {
    fn default() -> Self {
        PenaltyPolicy {
            monthly_rate_bps: DEFAULT_MONTHLY_PENALTY_BPS,
            max_penalty_bps: DEFAULT_MAX_PENALTY_BPS,
        }
    }
}

impl PenaltyPolicy {
    /// `amount × monthly_rate × days_late / 30`, capped at `max_penalty_bps`.
    ///
    /// Zero on or before the due date.
    pub fn assess(&self, amount: Money, due_date: NaiveDate, as_of: NaiveDate) -> Money {
        let days_late = (as_of - due_date).num_days();
        if days_late <= 0 || !amount.is_positive() {
            return Money::zero();
        }

        let numerator = amount.cents() as i128 * self.monthly_rate_bps as i128 * days_late as i128;
        let denominator = DAYS_PER_MONTH * 10_000;
        let penalty = Money::from_cents(((numerator + denominator / 2) / denominator) as i64);

        penalty.min(amount.apply_bps(self.max_penalty_bps))
    }

    /// Penalty to store on an unpaid row past its due date, `None` otherwise.
    ///
    /// Drives the overdue sweep: a `Some` means the row must become
    /// `overdue` with that penalty.
    pub fn overdue_assessment(&self, row: &QuarterlyTax, as_of: NaiveDate) -> Option<Money> {
        if row.payment_status.is_paid() || as_of <= row.due_date {
            return None;
        }
        Some(self.assess(row.total_quarterly_tax, row.due_date, as_of))
    }
}

// =============================================================================
// Annual Settlement
// =============================================================================

/// One row an annual payment will mark paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettledQuarter {
    pub id: String,
    pub quarter: Quarter,
    pub penalty_amount: Money,
    pub discount_amount: Money,
}

/// What an annual payment settles and how much it costs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AnnualSettlement {
    pub quarters: Vec<SettledQuarter>,
    pub total_due: Money,
}

impl AnnualSettlement {
    /// True when every quarter was already paid.
    pub fn is_noop(&self) -> bool {
        self.quarters.is_empty()
    }
}

/// Plans an annual settlement over a property's quarters for one year.
///
/// Paid rows are left out. Rows paid on or before their due date get the
/// advance discount; rows past due carry their penalty.
pub fn plan_annual_settlement(
    rows: &[QuarterlyTax],
    as_of: NaiveDate,
    discount_bps: u32,
    penalties: &PenaltyPolicy,
) -> AnnualSettlement {
    let mut unpaid: Vec<&QuarterlyTax> = rows
        .iter()
        .filter(|row| !row.payment_status.is_paid())
        .collect();
    unpaid.sort_by_key(|row| row.quarter);

    let quarters: Vec<SettledQuarter> = unpaid
        .into_iter()
        .map(|row| {
            let early = as_of <= row.due_date;
            SettledQuarter {
                id: row.id.clone(),
                quarter: row.quarter,
                penalty_amount: if early {
                    Money::zero()
                } else {
                    penalties.assess(row.total_quarterly_tax, row.due_date, as_of)
                },
                discount_amount: if early {
                    row.total_quarterly_tax.apply_bps(discount_bps)
                } else {
                    Money::zero()
                },
            }
        })
        .collect();

    let total_due = rows
        .iter()
        .filter_map(|row| {
            quarters
                .iter()
                .find(|q| q.id == row.id)
                .map(|q| row.total_quarterly_tax + q.penalty_amount - q.discount_amount)
        })
        .sum();

    AnnualSettlement {
        quarters,
        total_due,
    }
}

// =============================================================================
// Statement
// =============================================================================

/// One line of a ledger statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatementLine {
    pub id: String,
    pub quarter: Quarter,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub total_quarterly_tax: Money,
    pub penalty_amount: Money,
    pub discount_amount: Money,
    pub amount_due: Money,
    pub payment_status: QuarterStatus,
    pub receipt_number: Option<String>,
}

/// A parent's quarters for one year with what is still owed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerStatement {
    pub parent_total_id: String,
    pub year: i32,
    pub lines: Vec<StatementLine>,
    pub total_due: Money,
    pub fully_paid: bool,
}

impl LedgerStatement {
    pub fn from_rows(parent_total_id: &str, year: i32, rows: &[QuarterlyTax]) -> Self {
        let mut lines: Vec<StatementLine> = rows
            .iter()
            .map(|row| StatementLine {
                id: row.id.clone(),
                quarter: row.quarter,
                due_date: row.due_date,
                total_quarterly_tax: row.total_quarterly_tax,
                penalty_amount: row.penalty_amount,
                discount_amount: row.discount_amount,
                amount_due: row.amount_due(),
                payment_status: row.payment_status,
                receipt_number: row.receipt_number.clone(),
            })
            .collect();
        lines.sort_by_key(|line| line.quarter);

        let total_due = lines.iter().map(|line| line.amount_due).sum();
        let fully_paid = !lines.is_empty() && lines.iter().all(|l| l.payment_status.is_paid());

        LedgerStatement {
            parent_total_id: parent_total_id.to_string(),
            year,
            lines,
            total_due,
            fully_paid,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn schedule() -> Vec<QuarterlyTax> {
        build_schedule(LedgerKind::Property, "prop-1", Money::from_cents(400_000), 2026).unwrap()
    }

    #[test]
    fn test_schedule_has_four_dated_rows() {
        let rows = schedule();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].due_date, date(2026, 3, 31));
        assert_eq!(rows[3].due_date, date(2026, 12, 31));
        assert!(rows.iter().all(|r| r.payment_status == QuarterStatus::Pending));
        assert_eq!(
            rows.iter().map(|r| r.total_quarterly_tax).sum::<Money>().cents(),
            400_000
        );
    }

    #[test]
    fn test_penalty_accrues_per_day_and_caps() {
        let policy = PenaltyPolicy::default();
        let amount = Money::from_cents(100_000);
        let due = date(2026, 3, 31);

        assert!(policy.assess(amount, due, due).is_zero());
        // 30 days late: one month at 2%
        assert_eq!(policy.assess(amount, due, date(2026, 4, 30)).cents(), 2_000);
        // 15 days late: half a month
        assert_eq!(policy.assess(amount, due, date(2026, 4, 15)).cents(), 1_000);
        // Far past: capped at 72%
        assert_eq!(policy.assess(amount, due, date(2030, 1, 1)).cents(), 72_000);
    }

    #[test]
    fn test_overdue_assessment_skips_paid_and_current() {
        let policy = PenaltyPolicy::default();
        let mut rows = schedule();

        assert_eq!(policy.overdue_assessment(&rows[1], date(2026, 6, 30)), None);
        assert!(policy.overdue_assessment(&rows[0], date(2026, 4, 30)).is_some());

        rows[0].payment_status = QuarterStatus::Paid;
        assert_eq!(policy.overdue_assessment(&rows[0], date(2026, 4, 30)), None);
    }

    #[test]
    fn test_annual_settlement_only_touches_unpaid() {
        let mut rows = schedule();
        rows[0].payment_status = QuarterStatus::Paid;

        let plan = plan_annual_settlement(&rows, date(2026, 2, 1), 1_000, &PenaltyPolicy::default());
        let quarters: Vec<Quarter> = plan.quarters.iter().map(|q| q.quarter).collect();
        assert_eq!(quarters, vec![Quarter::Q2, Quarter::Q3, Quarter::Q4]);
        // 3 × (1000.00 − 10%)
        assert_eq!(plan.total_due.cents(), 270_000);
    }

    #[test]
    fn test_annual_settlement_discounts_only_early_quarters() {
        let rows = schedule();
        let plan = plan_annual_settlement(&rows, date(2026, 5, 1), 1_000, &PenaltyPolicy::default());

        let q1 = &plan.quarters[0];
        assert!(q1.discount_amount.is_zero());
        assert!(q1.penalty_amount.is_positive());
        assert_eq!(plan.quarters[1].discount_amount.cents(), 10_000);
    }

    #[test]
    fn test_annual_settlement_all_paid_is_noop() {
        let mut rows = schedule();
        for row in rows.iter_mut() {
            row.payment_status = QuarterStatus::Paid;
        }
        let plan = plan_annual_settlement(&rows, date(2026, 1, 1), 1_000, &PenaltyPolicy::default());
        assert!(plan.is_noop());
        assert!(plan.total_due.is_zero());
    }

    #[test]
    fn test_statement_totals_amount_due() {
        let mut rows = schedule();
        rows.reverse();
        rows[3].payment_status = QuarterStatus::Paid; // Q1
        rows[2].penalty_amount = Money::from_cents(2_000); // Q2

        let statement = LedgerStatement::from_rows("prop-1", 2026, &rows);
        assert_eq!(statement.lines[0].quarter, Quarter::Q1);
        assert!(statement.lines[0].amount_due.is_zero());
        assert_eq!(statement.total_due.cents(), 302_000);
        assert!(!statement.fully_paid);
    }
}
