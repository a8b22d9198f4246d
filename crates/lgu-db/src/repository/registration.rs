//! # Registration Repository
//!
//! RPT registrations under review and the yearly property totals that
//! approval produces.
//!
//! Approving a registration with an assessed annual tax creates the
//! property total for the approval year and its four quarterly rows in the
//! same transaction. Both inserts ignore duplicates, so approving twice is
//! harmless.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::ledger::insert_schedule;
use crate::repository::{money, year};
use lgu_core::ledger::build_schedule;
use lgu_core::{
    LedgerKind, Money, PropertyTotal, RegistrationStatus, RptRegistration, TaxRecordStatus,
};

/// A registration as submitted by a property owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRegistration {
    pub owner_name: String,
    pub property_address: String,
    #[serde(default)]
    pub tdn: Option<String>,
    #[serde(default)]
    pub annual_tax: Option<Money>,
}

/// Outcome of [`RegistrationRepository::update_status`].
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub registration: RptRegistration,
    /// False when the registration already had the requested status.
    pub updated: bool,
    /// The approval-year total, when the registration is approved and assessed.
    pub property_total: Option<PropertyTotal>,
}

#[derive(Debug, FromRow)]
struct RegistrationRow {
    id: String,
    owner_name: String,
    property_address: String,
    tdn: Option<String>,
    status: RegistrationStatus,
    correction_notes: Option<String>,
    annual_tax_cents: Option<i64>,
    updated_at: DateTime<Utc>,
}

impl From<RegistrationRow> for RptRegistration {
    fn from(row: RegistrationRow) -> Self {
        RptRegistration {
            id: row.id,
            owner_name: row.owner_name,
            property_address: row.property_address,
            tdn: row.tdn,
            status: row.status,
            correction_notes: row.correction_notes,
            annual_tax: row.annual_tax_cents.map(money),
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PropertyTotalRow {
    id: String,
    registration_id: String,
    tdn: Option<String>,
    year: i64,
    total_annual_tax_cents: i64,
    status: TaxRecordStatus,
    created_at: DateTime<Utc>,
}

impl PropertyTotalRow {
    fn into_record(self) -> DbResult<PropertyTotal> {
        Ok(PropertyTotal {
            year: year("PropertyTotal", &self.id, self.year)?,
            id: self.id,
            registration_id: self.registration_id,
            tdn: self.tdn,
            total_annual_tax: money(self.total_annual_tax_cents),
            status: self.status,
            created_at: self.created_at,
        })
    }
}

const REGISTRATION_COLUMNS: &str = "id, owner_name, property_address, tdn, status,
    correction_notes, annual_tax_cents, updated_at";

const TOTAL_COLUMNS: &str =
    "id, registration_id, tdn, year, total_annual_tax_cents, status, created_at";

async fn fetch_registration(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<RptRegistration>> {
    let sql = format!(
        "SELECT {} FROM rpt_registrations WHERE id = ?1",
        REGISTRATION_COLUMNS
    );
    let row = sqlx::query_as::<_, RegistrationRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(RptRegistration::from))
}

async fn fetch_total_for_year(
    conn: &mut SqliteConnection,
    registration_id: &str,
    tax_year: i32,
) -> DbResult<Option<PropertyTotal>> {
    let sql = format!(
        "SELECT {} FROM property_totals WHERE registration_id = ?1 AND year = ?2",
        TOTAL_COLUMNS
    );
    sqlx::query_as::<_, PropertyTotalRow>(&sql)
        .bind(registration_id)
        .bind(tax_year as i64)
        .fetch_optional(&mut *conn)
        .await?
        .map(PropertyTotalRow::into_record)
        .transpose()
}

/// Repository for RPT registrations and property totals.
#[derive(Debug, Clone)]
pub struct RegistrationRepository {
    pool: SqlitePool,
}

impl RegistrationRepository {
    /// Creates a new RegistrationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RegistrationRepository { pool }
    }

    /// Files a new registration in `pending`.
    pub async fn insert(
        &self,
        registration: &NewRegistration,
        now: DateTime<Utc>,
    ) -> DbResult<RptRegistration> {
        let record = RptRegistration {
            id: Uuid::new_v4().to_string(),
            owner_name: registration.owner_name.trim().to_string(),
            property_address: registration.property_address.trim().to_string(),
            tdn: registration
                .tdn
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            status: RegistrationStatus::Pending,
            correction_notes: None,
            annual_tax: registration.annual_tax,
            updated_at: now,
        };

        debug!(id = %record.id, owner = %record.owner_name, "Inserting registration");

        sqlx::query(
            "INSERT INTO rpt_registrations (
                id, owner_name, property_address, tdn, status,
                correction_notes, annual_tax_cents, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        )
        .bind(&record.id)
        .bind(&record.owner_name)
        .bind(&record.property_address)
        .bind(&record.tdn)
        .bind(record.status)
        .bind(&record.correction_notes)
        .bind(record.annual_tax.map(|m| m.cents()))
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<RptRegistration>> {
        let mut conn = self.pool.acquire().await?;
        fetch_registration(&mut *conn, id).await
    }

    pub async fn get_property_total(&self, id: &str) -> DbResult<Option<PropertyTotal>> {
        let sql = format!("SELECT {} FROM property_totals WHERE id = ?1", TOTAL_COLUMNS);
        sqlx::query_as::<_, PropertyTotalRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(PropertyTotalRow::into_record)
            .transpose()
    }

    /// Moves a registration to `status`.
    ///
    /// Requesting the current status changes nothing and reports
    /// `updated: false`. Entering `approved` with an assessed, positive
    /// annual tax ensures the approval-year property total and schedule.
    pub async fn update_status(
        &self,
        id: &str,
        status: RegistrationStatus,
        correction_notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<StatusChange> {
        let mut tx = self.pool.begin().await?;

        let current = fetch_registration(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("RptRegistration", id))?;

        let previous = current.status;
        if previous == status {
            debug!(id = %id, status = status.as_str(), "Registration status unchanged");
            tx.commit().await?;
            return Ok(StatusChange {
                registration: current,
                updated: false,
                property_total: None,
            });
        }

        let result = sqlx::query(
            "UPDATE rpt_registrations SET
                status = ?2,
                correction_notes = COALESCE(?3, correction_notes),
                updated_at = ?4
             WHERE id = ?1 AND status = ?5",
        )
        .bind(id)
        .bind(status)
        .bind(correction_notes)
        .bind(now)
        .bind(previous)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::stale("RptRegistration", id));
        }

        let registration = RptRegistration {
            status,
            correction_notes: correction_notes
                .map(str::to_string)
                .or(current.correction_notes),
            updated_at: now,
            ..current
        };

        let property_total = match registration.annual_tax {
            Some(annual_tax)
                if status == RegistrationStatus::Approved && annual_tax.is_positive() =>
            {
                Some(ensure_property_total(&mut *tx, &registration, annual_tax, now).await?)
            }
            _ => None,
        };

        tx.commit().await?;

        info!(
            id = %id,
            from = previous.as_str(),
            to = status.as_str(),
            property_total = property_total.as_ref().map(|t| t.id.as_str()),
            "Registration status updated"
        );

        Ok(StatusChange {
            registration,
            updated: true,
            property_total,
        })
    }
}

/// Creates (or finds) the approval-year total and its four quarters.
async fn ensure_property_total(
    conn: &mut SqliteConnection,
    registration: &RptRegistration,
    annual_tax: Money,
    now: DateTime<Utc>,
) -> DbResult<PropertyTotal> {
    let tax_year = now.year();

    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO property_totals (
            id, registration_id, tdn, year, total_annual_tax_cents, status, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&registration.id)
    .bind(&registration.tdn)
    .bind(tax_year as i64)
    .bind(annual_tax.cents())
    .bind(TaxRecordStatus::Approved)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let total = fetch_total_for_year(&mut *conn, &registration.id, tax_year)
        .await?
        .ok_or_else(|| DbError::not_found("PropertyTotal", &registration.id))?;

    let schedule = build_schedule(
        LedgerKind::Property,
        &total.id,
        total.total_annual_tax,
        total.year,
    )
    .map_err(|e| DbError::Internal(e.to_string()))?;
    let quarters_created = insert_schedule(&mut *conn, &schedule).await?;

    info!(
        registration_id = %registration.id,
        property_total_id = %total.id,
        year = total.year,
        created = inserted.rows_affected() == 1,
        quarters_created,
        "Property total ensured"
    );

    Ok(total)
}

// =============================================================================
// Tests
// =============================================================================
