//! # Payment Repository
//!
//! OTP-gated payment transactions and their ledger sync status.
//!
//! ## Compare-and-Swap Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two verify calls race on the same payment_id                          │
//! │                                                                         │
//! │  A: read attempts = 1            B: read attempts = 1                  │
//! │  A: UPDATE ... attempts = 2      B: UPDATE ... attempts = 2            │
//! │        WHERE attempts = 1              WHERE attempts = 1              │
//! │        → 1 row ✓                       → 0 rows ✗ (caller re-reads)    │
//! │                                                                         │
//! │  Same for pending → paid: WHERE payment_status = 'pending'             │
//! │  Both also pin otp_code, so a code replaced by a resend is dead.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Sync Outbox
//! Paid transactions carry `sync_status`. `failed` rows are the queue the
//! reconciliation worker drains. Every failure bumps `sync_attempts`; the
//! queue is served least-attempted first, then by `paid_at`, and rows that
//! reach the retry cap drop out of it so they cannot starve newer ones.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::money;
use lgu_core::{PaymentLinkage, PaymentStatus, PaymentTransaction, Quarter, SyncStatus};

const PAYMENT_COLUMNS: &str = "payment_id, phone, payment_method, purpose, amount_cents,
    otp_code, otp_expires_at, otp_attempts, otp_locked,
    payment_status, receipt_number, sync_status, system_error,
    tax_id, property_total_id, quarter, year, is_annual,
    created_at, updated_at, paid_at, sync_attempts, last_sync_attempt_at";

#[derive(Debug, FromRow)]
struct PaymentRow {
    payment_id: String,
    phone: String,
    payment_method: String,
    purpose: String,
    amount_cents: i64,
    otp_code: String,
    otp_expires_at: DateTime<Utc>,
    otp_attempts: i64,
    otp_locked: bool,
    payment_status: PaymentStatus,
    receipt_number: Option<String>,
    sync_status: SyncStatus,
    system_error: Option<String>,
    tax_id: Option<String>,
    property_total_id: Option<String>,
    quarter: Option<Quarter>,
    year: Option<i64>,
    is_annual: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    sync_attempts: i64,
    last_sync_attempt_at: Option<DateTime<Utc>>,
}

impl PaymentRow {
    fn into_record(self) -> DbResult<PaymentTransaction> {
        let year = self
            .year
            .map(|y| i32::try_from(y))
            .transpose()
            .map_err(|_| DbError::corrupt("PaymentTransaction", &self.payment_id, "year"))?;

        let linkage = PaymentLinkage::from_parts(
            self.tax_id,
            self.property_total_id,
            self.quarter,
            year,
            self.is_annual,
        )
        .map_err(|e| DbError::corrupt("PaymentTransaction", &self.payment_id, e))?;

        Ok(PaymentTransaction {
            otp_attempts: u32::try_from(self.otp_attempts).unwrap_or(u32::MAX),
            sync_attempts: u32::try_from(self.sync_attempts).unwrap_or(u32::MAX),
            last_sync_attempt_at: self.last_sync_attempt_at,
            payment_id: self.payment_id,
            phone: self.phone,
            payment_method: self.payment_method,
            purpose: self.purpose,
            amount: money(self.amount_cents),
            otp_code: self.otp_code,
            otp_expires_at: self.otp_expires_at,
            otp_locked: self.otp_locked,
            payment_status: self.payment_status,
            receipt_number: self.receipt_number,
            sync_status: self.sync_status,
            system_error: self.system_error,
            linkage,
            created_at: self.created_at,
            updated_at: self.updated_at,
            paid_at: self.paid_at,
        })
    }
}

/// Flattens a linkage into its storage columns.
fn linkage_columns(
    linkage: &PaymentLinkage,
) -> (Option<&str>, Option<&str>, Option<Quarter>, Option<i64>, bool) {
    match linkage {
        PaymentLinkage::None => (None, None, None, None, false),
        PaymentLinkage::QuarterRow { tax_id } => (Some(tax_id), None, None, None, false),
        PaymentLinkage::PropertyQuarter {
            property_total_id,
            quarter,
            year,
        } => (
            None,
            Some(property_total_id),
            Some(*quarter),
            Some(*year as i64),
            false,
        ),
        PaymentLinkage::PropertyAnnual {
            property_total_id,
            year,
        } => (None, Some(property_total_id), None, Some(*year as i64), true),
    }
}

/// Repository for payment transactions.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Inserts a freshly requested payment.
    pub async fn insert(&self, payment: &PaymentTransaction) -> DbResult<()> {
        debug!(payment_id = %payment.payment_id, amount = %payment.amount, "Inserting payment");

        let (tax_id, property_total_id, quarter, year, is_annual) =
            linkage_columns(&payment.linkage);

        let sql = format!(
            "INSERT INTO payment_transactions ({}) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23
             )",
            PAYMENT_COLUMNS
        );
        sqlx::query(&sql)
            .bind(&payment.payment_id)
            .bind(&payment.phone)
            .bind(&payment.payment_method)
            .bind(&payment.purpose)
            .bind(payment.amount.cents())
            .bind(&payment.otp_code)
            .bind(payment.otp_expires_at)
            .bind(payment.otp_attempts as i64)
            .bind(payment.otp_locked)
            .bind(payment.payment_status)
            .bind(&payment.receipt_number)
            .bind(payment.sync_status)
            .bind(&payment.system_error)
            .bind(tax_id)
            .bind(property_total_id)
            .bind(quarter)
            .bind(year)
            .bind(is_annual)
            .bind(payment.created_at)
            .bind(payment.updated_at)
            .bind(payment.paid_at)
            .bind(payment.sync_attempts as i64)
            .bind(payment.last_sync_attempt_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Gets a payment in any state.
    pub async fn get(&self, payment_id: &str) -> DbResult<Option<PaymentTransaction>> {
        let sql = format!(
            "SELECT {} FROM payment_transactions WHERE payment_id = ?1",
            PAYMENT_COLUMNS
        );
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?
            .map(PaymentRow::into_record)
            .transpose()
    }

    /// Gets a payment only while it is still pending.
    pub async fn get_pending(&self, payment_id: &str) -> DbResult<Option<PaymentTransaction>> {
        let sql = format!(
            "SELECT {} FROM payment_transactions
             WHERE payment_id = ?1 AND payment_status = 'pending'",
            PAYMENT_COLUMNS
        );
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?
            .map(PaymentRow::into_record)
            .transpose()
    }

    /// Records a wrong code if the row still holds `expected_code` and the
    /// counter still reads `expected_attempts`.
    ///
    /// Returns `false` when another request changed the row first.
    pub async fn record_failed_attempt(
        &self,
        payment_id: &str,
        expected_code: &str,
        expected_attempts: u32,
        attempts: u32,
        locked: bool,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE payment_transactions SET
                otp_attempts = ?4,
                otp_locked = ?5,
                updated_at = ?6
             WHERE payment_id = ?1
               AND payment_status = 'pending'
               AND otp_locked = 0
               AND otp_code = ?2
               AND otp_attempts = ?3",
        )
        .bind(payment_id)
        .bind(expected_code)
        .bind(expected_attempts as i64)
        .bind(attempts as i64)
        .bind(locked)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() == 1;
        if applied && locked {
            warn!(payment_id = %payment_id, attempts, "Payment locked after failed OTP attempts");
        }
        Ok(applied)
    }

    /// Flips a payment from pending to paid, provided `expected_code` is
    /// still the live OTP.
    ///
    /// Returns `false` when it was no longer pending, got locked, or the
    /// code was replaced by a resend.
    pub async fn mark_paid(
        &self,
        payment_id: &str,
        expected_code: &str,
        expected_attempts: u32,
        receipt_number: &str,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE payment_transactions SET
                payment_status = 'paid',
                receipt_number = ?4,
                paid_at = ?5,
                updated_at = ?5
             WHERE payment_id = ?1
               AND payment_status = 'pending'
               AND otp_locked = 0
               AND otp_code = ?2
               AND otp_attempts = ?3",
        )
        .bind(payment_id)
        .bind(expected_code)
        .bind(expected_attempts as i64)
        .bind(receipt_number)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() == 1;
        if applied {
            info!(payment_id = %payment_id, receipt = %receipt_number, "Payment marked paid");
        }
        Ok(applied)
    }

    /// Replaces the OTP of a pending, unlocked payment. Attempts carry over.
    pub async fn replace_otp(
        &self,
        payment_id: &str,
        otp_code: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE payment_transactions SET
                otp_code = ?2,
                otp_expires_at = ?3,
                updated_at = ?4
             WHERE payment_id = ?1
               AND payment_status = 'pending'
               AND otp_locked = 0",
        )
        .bind(payment_id)
        .bind(otp_code)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Marks the ledger side effect as applied.
    pub async fn mark_synced(&self, payment_id: &str, now: DateTime<Utc>) -> DbResult<()> {
        sqlx::query(
            "UPDATE payment_transactions SET
                sync_status = 'synced',
                system_error = NULL,
                updated_at = ?2
             WHERE payment_id = ?1",
        )
        .bind(payment_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records a failed ledger side effect; the payment stays paid.
    ///
    /// Returns the attempt count after this failure.
    pub async fn mark_sync_failed(
        &self,
        payment_id: &str,
        error: &str,
        now: DateTime<Utc>,
    ) -> DbResult<u32> {
        let attempts: Option<i64> = sqlx::query_scalar(
            "UPDATE payment_transactions SET
                sync_status = 'failed',
                system_error = ?2,
                sync_attempts = sync_attempts + 1,
                last_sync_attempt_at = ?3,
                updated_at = ?3
             WHERE payment_id = ?1
             RETURNING sync_attempts",
        )
        .bind(payment_id)
        .bind(error)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        let attempts = attempts.ok_or_else(|| DbError::not_found("PaymentTransaction", payment_id))?;
        Ok(u32::try_from(attempts).unwrap_or(u32::MAX))
    }

    /// Retryable failed syncs: under `max_attempts`, least-attempted first,
    /// then oldest payment first.
    pub async fn list_sync_failed(
        &self,
        limit: u32,
        max_attempts: u32,
    ) -> DbResult<Vec<PaymentTransaction>> {
        let sql = format!(
            "SELECT {} FROM payment_transactions
             WHERE payment_status = 'paid' AND sync_status = 'failed'
               AND sync_attempts < ?2
             ORDER BY sync_attempts ASC, paid_at ASC
             LIMIT ?1",
            PAYMENT_COLUMNS
        );
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(limit as i64)
            .bind(max_attempts as i64)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(PaymentRow::into_record)
            .collect()
    }

    /// Counts the reconciliation backlog.
    pub async fn count_sync_failed(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM payment_transactions
             WHERE payment_status = 'paid' AND sync_status = 'failed'",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Failed syncs that reached `max_attempts` and are no longer retried.
    pub async fn list_sync_exhausted(
        &self,
        max_attempts: u32,
    ) -> DbResult<Vec<PaymentTransaction>> {
        let sql = format!(
            "SELECT {} FROM payment_transactions
             WHERE payment_status = 'paid' AND sync_status = 'failed'
               AND sync_attempts >= ?1
             ORDER BY paid_at ASC",
            PAYMENT_COLUMNS
        );
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(max_attempts as i64)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(PaymentRow::into_record)
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
