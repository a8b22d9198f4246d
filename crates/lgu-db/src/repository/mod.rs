//! # Repository Module
//!
//! Database repository implementations for the portal.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP handler / service                                                 │
//! │       │                                                                 │
//! │       │  db.payments().record_failed_attempt(id, code, 1, 2, false, now)│
//! │       ▼                                                                 │
//! │  PaymentRepository                                                     │
//! │  ├── insert / get / get_pending                                        │
//! │  ├── record_failed_attempt   (CAS on otp_code + otp_attempts)          │
//! │  ├── mark_paid               (CAS on payment_status + otp_code)        │
//! │  └── mark_synced / mark_sync_failed (sync_attempts + 1)                │
//! │       │                                                                 │
//! │       │  SQL (runtime-checked sqlx queries, FromRow rows)              │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`TaxConfigRepository`](tax_config::TaxConfigRepository) - Rate tables and regulatory fees
//! - [`BusinessTaxRepository`](business_tax::BusinessTaxRepository) - Business tax records
//! - [`LedgerRepository`](ledger::LedgerRepository) - Quarterly rows, settlement, overdue sweep
//! - [`PaymentRepository`](payment::PaymentRepository) - OTP-gated payments and sync outbox
//! - [`RegistrationRepository`](registration::RegistrationRepository) - RPT registrations and property totals

pub mod business_tax;
pub mod ledger;
pub mod payment;
pub mod registration;
pub mod tax_config;

use chrono::NaiveDate;
use lgu_core::{Money, TaxRate};

use crate::error::{DbError, DbResult};

/// Centavo column to `Money`.
#[inline]
pub(crate) fn money(cents: i64) -> Money {
    Money::from_cents(cents)
}

/// Basis point column to `TaxRate`.
pub(crate) fn rate(entity: &str, id: &str, bps: i64) -> DbResult<TaxRate> {
    u32::try_from(bps)
        .map(TaxRate::from_bps)
        .map_err(|_| DbError::corrupt(entity, id, format!("rate {} out of range", bps)))
}

/// Year column to `i32`.
pub(crate) fn year(entity: &str, id: &str, year: i64) -> DbResult<i32> {
    i32::try_from(year).map_err(|_| DbError::corrupt(entity, id, format!("year {}", year)))
}

/// Stored `YYYY-MM-DD` text to a date.
pub(crate) fn date(entity: &str, id: &str, raw: &str) -> DbResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| DbError::corrupt(entity, id, format!("date '{}'", raw)))
}
