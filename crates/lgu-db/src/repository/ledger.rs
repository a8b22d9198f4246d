//! # Quarterly Ledger Repository
//!
//! Persistence for the four quarterly rows owned by each business tax record
//! and each property total.
//!
//! ## Write Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  approval          ──► create_schedule      INSERT OR IGNORE × 4       │
//! │                                             (unique ledger/parent/     │
//! │                                              year/quarter)             │
//! │                                                                         │
//! │  OTP verified      ──► settle_quarter       UPDATE ... WHERE id = ?    │
//! │                    ──► settle_property_quarter                          │
//! │                    ──► settle_property_annual  (unpaid rows only)       │
//! │                                                                         │
//! │  reconcile tick    ──► mark_overdue         pending/overdue past due   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Settling is idempotent per receipt: re-applying the same receipt to a row
//! it already paid succeeds, which is what the reconciliation worker relies on.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{money, year};
use lgu_core::ledger::{plan_annual_settlement, AnnualSettlement, LedgerStatement, PenaltyPolicy};
use lgu_core::{LedgerKind, Quarter, QuarterStatus, QuarterlyTax};

const QUARTER_COLUMNS: &str = "id, ledger, parent_total_id, quarter, year, due_date,
    total_quarterly_tax_cents, penalty_amount_cents, discount_amount_cents,
    payment_status, receipt_number, paid_at";

#[derive(Debug, FromRow)]
struct QuarterRow {
    id: String,
    ledger: LedgerKind,
    parent_total_id: String,
    quarter: Quarter,
    year: i64,
    due_date: NaiveDate,
    total_quarterly_tax_cents: i64,
    penalty_amount_cents: i64,
    discount_amount_cents: i64,
    payment_status: QuarterStatus,
    receipt_number: Option<String>,
    paid_at: Option<DateTime<Utc>>,
}

impl QuarterRow {
    fn into_record(self) -> DbResult<QuarterlyTax> {
        Ok(QuarterlyTax {
            year: year("QuarterlyTax", &self.id, self.year)?,
            id: self.id,
            ledger: self.ledger,
            parent_total_id: self.parent_total_id,
            quarter: self.quarter,
            due_date: self.due_date,
            total_quarterly_tax: money(self.total_quarterly_tax_cents),
            penalty_amount: money(self.penalty_amount_cents),
            discount_amount: money(self.discount_amount_cents),
            payment_status: self.payment_status,
            receipt_number: self.receipt_number,
            paid_at: self.paid_at,
        })
    }
}

fn into_records(rows: Vec<QuarterRow>) -> DbResult<Vec<QuarterlyTax>> {
    rows.into_iter().map(QuarterRow::into_record).collect()
}

/// Inserts schedule rows on an open connection, skipping existing quarters.
///
/// Returns how many rows were actually created.
pub(crate) async fn insert_schedule(
    conn: &mut SqliteConnection,
    rows: &[QuarterlyTax],
) -> DbResult<u64> {
    let mut created = 0;
    for row in rows {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO quarterly_taxes (
                id, ledger, parent_total_id, quarter, year, due_date,
                total_quarterly_tax_cents, penalty_amount_cents, discount_amount_cents,
                payment_status, receipt_number, paid_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(&row.id)
        .bind(row.ledger)
        .bind(&row.parent_total_id)
        .bind(row.quarter)
        .bind(row.year as i64)
        .bind(row.due_date)
        .bind(row.total_quarterly_tax.cents())
        .bind(row.penalty_amount.cents())
        .bind(row.discount_amount.cents())
        .bind(row.payment_status)
        .bind(&row.receipt_number)
        .bind(row.paid_at)
        .execute(&mut *conn)
        .await?;
        created += result.rows_affected();
    }
    Ok(created)
}

/// Repository for quarterly ledger rows.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Persists a schedule; quarters that already exist are left untouched.
    pub async fn create_schedule(&self, rows: &[QuarterlyTax]) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;
        let created = insert_schedule(&mut *tx, rows).await?;
        tx.commit().await?;

        debug!(created, "Quarterly schedule persisted");
        Ok(created)
    }

    /// Gets one row by id.
    pub async fn get(&self, id: &str) -> DbResult<Option<QuarterlyTax>> {
        let sql = format!("SELECT {} FROM quarterly_taxes WHERE id = ?1", QUARTER_COLUMNS);
        sqlx::query_as::<_, QuarterRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(QuarterRow::into_record)
            .transpose()
    }

    /// Rows of one parent, Q1..Q4, optionally for a single year.
    pub async fn list_for_parent(
        &self,
        ledger: LedgerKind,
        parent_total_id: &str,
        year: Option<i32>,
    ) -> DbResult<Vec<QuarterlyTax>> {
        let sql = format!(
            "SELECT {} FROM quarterly_taxes
             WHERE ledger = ?1 AND parent_total_id = ?2 AND (?3 IS NULL OR year = ?3)
             ORDER BY year, quarter",
            QUARTER_COLUMNS
        );
        let rows = sqlx::query_as::<_, QuarterRow>(&sql)
            .bind(ledger)
            .bind(parent_total_id)
            .bind(year.map(i64::from))
            .fetch_all(&self.pool)
            .await?;

        into_records(rows)
    }

    /// Settles a single row by id.
    ///
    /// Fails with `NotFound` for an unknown id and `StaleState` when the row
    /// was already paid under a different receipt.
    pub async fn settle_quarter(
        &self,
        id: &str,
        receipt_number: &str,
        paid_at: DateTime<Utc>,
    ) -> DbResult<QuarterlyTax> {
        let result = sqlx::query(
            "UPDATE quarterly_taxes SET
                payment_status = 'paid',
                receipt_number = ?2,
                paid_at = ?3
             WHERE id = ?1
               AND (payment_status != 'paid' OR receipt_number = ?2)",
        )
        .bind(id)
        .bind(receipt_number)
        .bind(paid_at)
        .execute(&self.pool)
        .await?;

        let row = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("QuarterlyTax", id))?;

        if result.rows_affected() == 0 {
            return Err(DbError::stale("QuarterlyTax", id));
        }

        info!(id = %id, quarter = %row.quarter, receipt = %receipt_number, "Quarter settled");
        Ok(row)
    }

    /// Settles one property quarter addressed by property, quarter and year.
    pub async fn settle_property_quarter(
        &self,
        property_total_id: &str,
        quarter: Quarter,
        year: i32,
        receipt_number: &str,
        paid_at: DateTime<Utc>,
    ) -> DbResult<QuarterlyTax> {
        let sql = format!(
            "SELECT {} FROM quarterly_taxes
             WHERE ledger = 'property' AND parent_total_id = ?1 AND quarter = ?2 AND year = ?3",
            QUARTER_COLUMNS
        );
        let row = sqlx::query_as::<_, QuarterRow>(&sql)
            .bind(property_total_id)
            .bind(quarter)
            .bind(year as i64)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                DbError::not_found("QuarterlyTax", format!("{} {} {}", property_total_id, quarter, year))
            })?;

        self.settle_quarter(&row.id, receipt_number, paid_at).await
    }

    /// Settles every unpaid quarter of a property for one year.
    ///
    /// Paid rows are untouched. Nothing unpaid is a successful no-op.
    pub async fn settle_property_annual(
        &self,
        property_total_id: &str,
        year: i32,
        receipt_number: &str,
        paid_at: DateTime<Utc>,
        discount_bps: u32,
        penalties: &PenaltyPolicy,
    ) -> DbResult<AnnualSettlement> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {} FROM quarterly_taxes
             WHERE ledger = 'property' AND parent_total_id = ?1 AND year = ?2
             ORDER BY quarter",
            QUARTER_COLUMNS
        );
        let rows = into_records(
            sqlx::query_as::<_, QuarterRow>(&sql)
                .bind(property_total_id)
                .bind(year as i64)
                .fetch_all(&mut *tx)
                .await?,
        )?;

        if rows.is_empty() {
            return Err(DbError::not_found(
                "PropertyTotal quarters",
                format!("{} {}", property_total_id, year),
            ));
        }

        let plan = plan_annual_settlement(&rows, paid_at.date_naive(), discount_bps, penalties);

        for settled in &plan.quarters {
            sqlx::query(
                "UPDATE quarterly_taxes SET
                    payment_status = 'paid',
                    receipt_number = ?2,
                    paid_at = ?3,
                    penalty_amount_cents = ?4,
                    discount_amount_cents = ?5
                 WHERE id = ?1 AND payment_status != 'paid'",
            )
            .bind(&settled.id)
            .bind(receipt_number)
            .bind(paid_at)
            .bind(settled.penalty_amount.cents())
            .bind(settled.discount_amount.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            property_total_id = %property_total_id,
            year,
            settled = plan.quarters.len(),
            total_due = %plan.total_due,
            "Annual settlement applied"
        );
        Ok(plan)
    }

    /// Marks unpaid rows past their due date as overdue and refreshes their
    /// penalty. Returns how many rows changed.
    pub async fn mark_overdue(&self, as_of: NaiveDate, penalties: &PenaltyPolicy) -> DbResult<u64> {
        let sql = format!(
            "SELECT {} FROM quarterly_taxes
             WHERE payment_status != 'paid' AND due_date < ?1",
            QUARTER_COLUMNS
        );
        let rows = into_records(
            sqlx::query_as::<_, QuarterRow>(&sql)
                .bind(as_of)
                .fetch_all(&self.pool)
                .await?,
        )?;

        let mut changed = 0;
        for row in &rows {
            let Some(penalty) = penalties.overdue_assessment(row, as_of) else {
                continue;
            };
            if row.payment_status == QuarterStatus::Overdue && row.penalty_amount == penalty {
                continue;
            }

            let result = sqlx::query(
                "UPDATE quarterly_taxes SET
                    payment_status = 'overdue',
                    penalty_amount_cents = ?2
                 WHERE id = ?1 AND payment_status != 'paid'",
            )
            .bind(&row.id)
            .bind(penalty.cents())
            .execute(&self.pool)
            .await?;
            changed += result.rows_affected();
        }

        if changed > 0 {
            info!(changed, as_of = %as_of, "Overdue sweep updated quarters");
        }
        Ok(changed)
    }

    /// Read-only statement of a parent's quarters for one year.
    pub async fn statement(
        &self,
        ledger: LedgerKind,
        parent_total_id: &str,
        year: i32,
    ) -> DbResult<LedgerStatement> {
        let rows = self.list_for_parent(ledger, parent_total_id, Some(year)).await?;
        Ok(LedgerStatement::from_rows(parent_total_id, year, &rows))
    }
}

// =============================================================================
// Tests
// =============================================================================
