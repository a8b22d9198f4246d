//! # Tax Configuration Repository
//!
//! Rate tables and regulatory fees.
//!
//! Rows are loaded whole and handed to `lgu_core::rate` / `lgu_core::fees`;
//! selection happens in pure code so it can be tested without a database.
//! A row whose dates cannot be parsed is skipped with a warning rather than
//! failing every computation.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{date, money, rate};
use lgu_core::rate::parse_expiration;
use lgu_core::{Money, RateScope, RegulatoryFee, TaxCalculationType, TaxConfiguration, TaxRate};

/// A rate row as entered by an administrator.
///
/// `expiration_date` is kept raw so legacy sentinels round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTaxConfiguration {
    pub scope: RateScope,
    pub rate: TaxRate,
    pub effective_date: chrono::NaiveDate,
    #[serde(default)]
    pub expiration_date: Option<String>,
}

/// A fee row as entered by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRegulatoryFee {
    pub name: String,
    pub amount: Money,
    #[serde(default)]
    pub expiration_date: Option<String>,
}

#[derive(Debug, FromRow)]
struct TaxConfigRow {
    id: i64,
    calculation_type: TaxCalculationType,
    business_type: Option<String>,
    min_amount_cents: Option<i64>,
    max_amount_cents: Option<i64>,
    rate_bps: i64,
    effective_date: String,
    expiration_date: Option<String>,
}

impl TaxConfigRow {
    fn into_record(self) -> DbResult<TaxConfiguration> {
        let id = self.id.to_string();
        let scope = match self.calculation_type {
            TaxCalculationType::GrossSales => RateScope::GrossSales {
                business_type: self
                    .business_type
                    .ok_or_else(|| DbError::corrupt("TaxConfiguration", &id, "no business_type"))?,
            },
            TaxCalculationType::CapitalInvestment => {
                match (self.min_amount_cents, self.max_amount_cents) {
                    (Some(min), Some(max)) => RateScope::CapitalInvestment {
                        min_amount: money(min),
                        max_amount: money(max),
                    },
                    _ => return Err(DbError::corrupt("TaxConfiguration", &id, "no bracket")),
                }
            }
        };

        Ok(TaxConfiguration {
            rate: rate("TaxConfiguration", &id, self.rate_bps)?,
            effective_date: date("TaxConfiguration", &id, self.effective_date.trim())?,
            expiration_date: parse_expiration(self.expiration_date.as_deref())
                .map_err(|e| DbError::corrupt("TaxConfiguration", &id, e))?,
            id: self.id,
            scope,
        })
    }
}

#[derive(Debug, FromRow)]
struct FeeRow {
    id: i64,
    name: String,
    amount_cents: i64,
    expiration_date: Option<String>,
}

impl FeeRow {
    fn into_record(self) -> DbResult<RegulatoryFee> {
        Ok(RegulatoryFee {
            expiration_date: parse_expiration(self.expiration_date.as_deref())
                .map_err(|e| DbError::corrupt("RegulatoryFee", self.id.to_string(), e))?,
            id: self.id,
            name: self.name,
            amount: money(self.amount_cents),
        })
    }
}

/// Repository for rate tables and fees.
#[derive(Debug, Clone)]
pub struct TaxConfigRepository {
    pool: SqlitePool,
}

impl TaxConfigRepository {
    /// Creates a new TaxConfigRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TaxConfigRepository { pool }
    }

    /// Inserts a rate row and returns its id.
    pub async fn insert_configuration(&self, config: &NewTaxConfiguration) -> DbResult<i64> {
        let (business_type, min_cents, max_cents) = match &config.scope {
            RateScope::GrossSales { business_type } => (Some(business_type.trim()), None, None),
            RateScope::CapitalInvestment {
                min_amount,
                max_amount,
            } => (None, Some(min_amount.cents()), Some(max_amount.cents())),
        };

        debug!(
            calculation_type = config.scope.calculation_type().as_str(),
            rate_bps = config.rate.bps(),
            "Inserting tax configuration"
        );

        let result = sqlx::query(
            "INSERT INTO tax_configurations (
                calculation_type, business_type, min_amount_cents, max_amount_cents,
                rate_bps, effective_date, expiration_date
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(config.scope.calculation_type())
        .bind(business_type)
        .bind(min_cents)
        .bind(max_cents)
        .bind(config.rate.bps() as i64)
        .bind(config.effective_date)
        .bind(config.expiration_date.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Inserts a fee row and returns its id.
    pub async fn insert_fee(&self, fee: &NewRegulatoryFee) -> DbResult<i64> {
        debug!(name = %fee.name, amount = %fee.amount, "Inserting regulatory fee");

        let result = sqlx::query(
            "INSERT INTO regulatory_fees (name, amount_cents, expiration_date)
             VALUES (?1, ?2, ?3)",
        )
        .bind(fee.name.trim())
        .bind(fee.amount.cents())
        .bind(fee.expiration_date.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Every readable rate row of one calculation type, expired ones included.
    pub async fn list_configurations(
        &self,
        calculation_type: TaxCalculationType,
    ) -> DbResult<Vec<TaxConfiguration>> {
        let rows = sqlx::query_as::<_, TaxConfigRow>(
            "SELECT id, calculation_type, business_type, min_amount_cents, max_amount_cents,
                    rate_bps, effective_date, expiration_date
             FROM tax_configurations
             WHERE calculation_type = ?1
             ORDER BY effective_date DESC, id DESC",
        )
        .bind(calculation_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match row.into_record() {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable tax configuration");
                    None
                }
            })
            .collect())
    }

    /// Every readable fee row, expired ones included.
    pub async fn list_fees(&self) -> DbResult<Vec<RegulatoryFee>> {
        let rows = sqlx::query_as::<_, FeeRow>(
            "SELECT id, name, amount_cents, expiration_date FROM regulatory_fees ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match row.into_record() {
                Ok(fee) => Some(fee),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable regulatory fee");
                    None
                }
            })
            .collect())
    }

    /// Number of rate rows (seed uses it to stay idempotent).
    pub async fn count_configurations(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tax_configurations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use lgu_core::fees::aggregate_fees;
    use lgu_core::rate::{resolve_rate, RateLookup};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn repo() -> TaxConfigRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().tax_config()
    }

    fn retail(bps: u32, effective: NaiveDate, expires: Option<&str>) -> NewTaxConfiguration {
        NewTaxConfiguration {
            scope: RateScope::GrossSales {
                business_type: "Retail".into(),
            },
            rate: TaxRate::from_bps(bps),
            effective_date: effective,
            expiration_date: expires.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_configurations_round_trip_with_sentinels() {
        let repo = repo().await;
        repo.insert_configuration(&retail(150, day(2023, 1, 1), Some("0000-00-00")))
            .await
            .unwrap();
        repo.insert_configuration(&retail(200, day(2025, 1, 1), Some("")))
            .await
            .unwrap();
        repo.insert_configuration(&NewTaxConfiguration {
            scope: RateScope::CapitalInvestment {
                min_amount: Money::zero(),
                max_amount: Money::from_major_minor(50_000, 0),
            },
            rate: TaxRate::from_bps(100),
            effective_date: day(2024, 1, 1),
            expiration_date: None,
        })
        .await
        .unwrap();

        let gross = repo
            .list_configurations(TaxCalculationType::GrossSales)
            .await
            .unwrap();
        assert_eq!(gross.len(), 2);
        assert!(gross.iter().all(|c| c.expiration_date.is_none()));

        let resolved = resolve_rate(
            &gross,
            &RateLookup::GrossSales("retail".into()),
            day(2026, 10, 16),
        );
        assert_eq!(resolved.rate_or_zero().bps(), 200);

        let capital = repo
            .list_configurations(TaxCalculationType::CapitalInvestment)
            .await
            .unwrap();
        assert_eq!(capital.len(), 1);
        assert_eq!(repo.count_configurations().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_unparseable_expiration_is_skipped() {
        let repo = repo().await;
        repo.insert_configuration(&retail(150, day(2023, 1, 1), Some("someday")))
            .await
            .unwrap();
        repo.insert_configuration(&retail(175, day(2023, 1, 1), Some("2030-12-31")))
            .await
            .unwrap();

        let rows = repo
            .list_configurations(TaxCalculationType::GrossSales)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rate.bps(), 175);
    }

    #[tokio::test]
    async fn test_fees_sum_active_only() {
        let repo = repo().await;
        for (name, amount, expires) in [
            ("Mayor's permit", "499.98", None),
            ("Sanitary", "500", Some("2026-12-31")),
            ("Garbage", "300", Some("0000-00-00")),
            ("Old fire fee", "250", Some("2020-12-31")),
        ] {
            repo.insert_fee(&NewRegulatoryFee {
                name: name.into(),
                amount: amount.parse().unwrap(),
                expiration_date: expires.map(str::to_string),
            })
            .await
            .unwrap();
        }

        let fees = repo.list_fees().await.unwrap();
        assert_eq!(fees.len(), 4);

        let total = aggregate_fees(&fees, day(2026, 10, 16));
        assert_eq!(total.amount.to_string(), "1299.98");
        assert_eq!(total.fee_count, 3);
    }
}
