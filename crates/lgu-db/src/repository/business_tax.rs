//! # Business Tax Repository
//!
//! One tax record per business permit, recomputed in place.
//!
//! ## Save Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       SINGLE TRANSACTION                                │
//! │                                                                         │
//! │  1. SELECT record WHERE business_permit_id = ?                         │
//! │  2. status = escalate_status(existing or pending, computation)         │
//! │  3. UPDATE (existing) or INSERT (new)          → action                │
//! │  4. status past pending? INSERT OR IGNORE four quarterly rows          │
//! │                                                                         │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::ledger::insert_schedule;
use crate::repository::{money, rate};
use lgu_core::ledger::build_schedule;
use lgu_core::tax::{escalate_status, RecordAction, TaxComputation};
use lgu_core::{LedgerKind, TaxCalculationType, TaxRecord, TaxRecordStatus};

/// Descriptive fields of a business, as submitted with a computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessTaxInput {
    pub business_permit_id: String,
    pub business_name: String,
    pub full_name: String,
    pub business_type: String,
    pub calculation_type: TaxCalculationType,
}

/// Outcome of [`BusinessTaxRepository::save_computation`].
#[derive(Debug, Clone)]
pub struct SavedTaxRecord {
    pub record: TaxRecord,
    pub action: RecordAction,
    /// Quarterly rows created by this save (0 on recompute).
    pub quarters_created: u64,
}

#[derive(Debug, FromRow)]
struct TaxRecordRow {
    id: String,
    business_permit_id: String,
    business_name: String,
    full_name: String,
    business_type: String,
    calculation_type: TaxCalculationType,
    taxable_amount_cents: i64,
    tax_rate_bps: i64,
    tax_amount_cents: i64,
    regulatory_fees_cents: i64,
    total_tax_cents: i64,
    status: TaxRecordStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaxRecordRow {
    fn into_record(self) -> DbResult<TaxRecord> {
        Ok(TaxRecord {
            tax_rate: rate("TaxRecord", &self.id, self.tax_rate_bps)?,
            id: self.id,
            business_permit_id: self.business_permit_id,
            business_name: self.business_name,
            full_name: self.full_name,
            business_type: self.business_type,
            calculation_type: self.calculation_type,
            taxable_amount: money(self.taxable_amount_cents),
            tax_amount: money(self.tax_amount_cents),
            regulatory_fees: money(self.regulatory_fees_cents),
            total_tax: money(self.total_tax_cents),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const RECORD_COLUMNS: &str = "id, business_permit_id, business_name, full_name, business_type,
    calculation_type, taxable_amount_cents, tax_rate_bps, tax_amount_cents,
    regulatory_fees_cents, total_tax_cents, status, created_at, updated_at";

/// Repository for business tax records.
#[derive(Debug, Clone)]
pub struct BusinessTaxRepository {
    pool: SqlitePool,
}

impl BusinessTaxRepository {
    /// Creates a new BusinessTaxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BusinessTaxRepository { pool }
    }

    /// Gets the record of a business permit.
    pub async fn get_by_permit(&self, business_permit_id: &str) -> DbResult<Option<TaxRecord>> {
        let sql = format!(
            "SELECT {} FROM business_tax_records WHERE business_permit_id = ?1",
            RECORD_COLUMNS
        );
        sqlx::query_as::<_, TaxRecordRow>(&sql)
            .bind(business_permit_id.trim())
            .fetch_optional(&self.pool)
            .await?
            .map(TaxRecordRow::into_record)
            .transpose()
    }

    /// Inserts or refreshes the record for a permit and creates its quarterly
    /// rows the first time it is billable.
    pub async fn save_computation(
        &self,
        input: &BusinessTaxInput,
        computation: &TaxComputation,
        now: DateTime<Utc>,
    ) -> DbResult<SavedTaxRecord> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {} FROM business_tax_records WHERE business_permit_id = ?1",
            RECORD_COLUMNS
        );
        let existing = sqlx::query_as::<_, TaxRecordRow>(&sql)
            .bind(input.business_permit_id.trim())
            .fetch_optional(&mut *tx)
            .await?
            .map(TaxRecordRow::into_record)
            .transpose()?;

        let current = existing
            .as_ref()
            .map(|r| r.status)
            .unwrap_or(TaxRecordStatus::Pending);
        let status = escalate_status(current, computation);

        let (record, action) = match existing {
            Some(previous) => {
                debug!(id = %previous.id, permit = %previous.business_permit_id, "Updating tax record");

                sqlx::query(
                    "UPDATE business_tax_records SET
                        business_name = ?2,
                        full_name = ?3,
                        business_type = ?4,
                        calculation_type = ?5,
                        taxable_amount_cents = ?6,
                        tax_rate_bps = ?7,
                        tax_amount_cents = ?8,
                        regulatory_fees_cents = ?9,
                        total_tax_cents = ?10,
                        status = ?11,
                        updated_at = ?12
                     WHERE id = ?1",
                )
                .bind(&previous.id)
                .bind(input.business_name.trim())
                .bind(input.full_name.trim())
                .bind(input.business_type.trim())
                .bind(input.calculation_type)
                .bind(computation.taxable_amount.cents())
                .bind(computation.tax_rate.bps() as i64)
                .bind(computation.tax_amount.cents())
                .bind(computation.regulatory_fees.cents())
                .bind(computation.total_tax.cents())
                .bind(status)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                let record = TaxRecord {
                    business_name: input.business_name.trim().to_string(),
                    full_name: input.full_name.trim().to_string(),
                    business_type: input.business_type.trim().to_string(),
                    calculation_type: input.calculation_type,
                    taxable_amount: computation.taxable_amount,
                    tax_rate: computation.tax_rate,
                    tax_amount: computation.tax_amount,
                    regulatory_fees: computation.regulatory_fees,
                    total_tax: computation.total_tax,
                    status,
                    updated_at: now,
                    ..previous
                };
                (record, RecordAction::Updated)
            }
            None => {
                let record = TaxRecord {
                    id: Uuid::new_v4().to_string(),
                    business_permit_id: input.business_permit_id.trim().to_string(),
                    business_name: input.business_name.trim().to_string(),
                    full_name: input.full_name.trim().to_string(),
                    business_type: input.business_type.trim().to_string(),
                    calculation_type: input.calculation_type,
                    taxable_amount: computation.taxable_amount,
                    tax_rate: computation.tax_rate,
                    tax_amount: computation.tax_amount,
                    regulatory_fees: computation.regulatory_fees,
                    total_tax: computation.total_tax,
                    status,
                    created_at: now,
                    updated_at: now,
                };

                debug!(id = %record.id, permit = %record.business_permit_id, "Inserting tax record");

                let sql = format!(
                    "INSERT INTO business_tax_records ({}) VALUES
                     (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                    RECORD_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(&record.id)
                    .bind(&record.business_permit_id)
                    .bind(&record.business_name)
                    .bind(&record.full_name)
                    .bind(&record.business_type)
                    .bind(record.calculation_type)
                    .bind(record.taxable_amount.cents())
                    .bind(record.tax_rate.bps() as i64)
                    .bind(record.tax_amount.cents())
                    .bind(record.regulatory_fees.cents())
                    .bind(record.total_tax.cents())
                    .bind(record.status)
                    .bind(record.created_at)
                    .bind(record.updated_at)
                    .execute(&mut *tx)
                    .await?;

                (record, RecordAction::Inserted)
            }
        };

        let quarters_created = if record.status.is_frozen() {
            let schedule = build_schedule(
                LedgerKind::Business,
                &record.id,
                record.total_tax,
                record.created_at.year(),
            )
            .map_err(|e| DbError::Internal(e.to_string()))?;
            insert_schedule(&mut *tx, &schedule).await?
        } else {
            0
        };

        tx.commit().await?;

        info!(
            permit = %record.business_permit_id,
            action = ?action,
            status = ?record.status,
            total_tax = %record.total_tax,
            quarters_created,
            "Business tax saved"
        );

        Ok(SavedTaxRecord {
            record,
            action,
            quarters_created,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::TimeZone;
    use lgu_core::{Money, QuarterStatus, TaxRate};

    fn input() -> BusinessTaxInput {
        BusinessTaxInput {
            business_permit_id: "BP-2026-0001".into(),
            business_name: "Aling Nena Store".into(),
            full_name: "Nena Santos".into(),
            business_type: "Retail".into(),
            calculation_type: TaxCalculationType::GrossSales,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_first_save_inserts_and_schedules() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let computation = TaxComputation::compute(
            Money::from_major_minor(100_000, 0),
            TaxRate::from_bps(200),
            Money::from_cents(129_998),
        );

        let saved = db
            .business_tax()
            .save_computation(&input(), &computation, now())
            .await
            .unwrap();
        assert_eq!(saved.action, RecordAction::Inserted);
        assert_eq!(saved.record.status, TaxRecordStatus::Approved);
        assert_eq!(saved.quarters_created, 4);

        let quarters = db
            .ledger()
            .list_for_parent(LedgerKind::Business, &saved.record.id, Some(2026))
            .await
            .unwrap();
        let amounts: Vec<i64> = quarters.iter().map(|q| q.total_quarterly_tax.cents()).collect();
        assert_eq!(amounts, vec![82_500, 82_500, 82_499, 82_499]);
        assert!(quarters.iter().all(|q| q.payment_status == QuarterStatus::Pending));
    }

    #[tokio::test]
    async fn test_recompute_updates_in_place() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.business_tax();
        let computation = TaxComputation::compute(
            Money::from_major_minor(100_000, 0),
            TaxRate::from_bps(200),
            Money::from_cents(129_998),
        );

        let first = repo.save_computation(&input(), &computation, now()).await.unwrap();
        let second = repo.save_computation(&input(), &computation, now()).await.unwrap();

        assert_eq!(second.action, RecordAction::Updated);
        assert_eq!(second.record.id, first.record.id);
        assert_eq!(second.record.total_tax, first.record.total_tax);
        assert_eq!(second.quarters_created, 0);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM business_tax_records")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_pending_until_billable_and_never_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.business_tax();

        let unrated = TaxComputation::compute(
            Money::from_major_minor(100_000, 0),
            TaxRate::zero(),
            Money::from_cents(129_998),
        );
        let saved = repo.save_computation(&input(), &unrated, now()).await.unwrap();
        assert_eq!(saved.record.status, TaxRecordStatus::Pending);
        assert_eq!(saved.quarters_created, 0);

        let rated = TaxComputation::compute(
            Money::from_major_minor(100_000, 0),
            TaxRate::from_bps(200),
            Money::from_cents(129_998),
        );
        let approved = repo.save_computation(&input(), &rated, now()).await.unwrap();
        assert_eq!(approved.record.status, TaxRecordStatus::Approved);
        assert_eq!(approved.quarters_created, 4);

        let back = repo.save_computation(&input(), &unrated, now()).await.unwrap();
        assert_eq!(back.record.status, TaxRecordStatus::Approved);

        let fetched = repo.get_by_permit("BP-2026-0001").await.unwrap().unwrap();
        assert_eq!(fetched.status, TaxRecordStatus::Approved);
        assert!(fetched.tax_amount.is_zero());
    }
}
