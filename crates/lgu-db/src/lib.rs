//! # lgu-db: Database Layer for the LGU Portal
//!
//! SQLite storage for rate tables, tax records, the quarterly ledger and
//! OTP-gated payments, using sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Portal Data Flow                                 │
//! │                                                                         │
//! │  HTTP handler (POST /otp/verify)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     lgu-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ TaxConfigRepo  │   │ 001_rates    │  │   │
//! │  │   │ SqlitePool    │◄───│ BusinessTax    │   │ 002_ledger   │  │   │
//! │  │   │               │    │ LedgerRepo     │   │ 003_payments │  │   │
//! │  │   │               │    │ PaymentRepo    │   │              │  │   │
//! │  │   │               │    │ Registration   │   │              │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rules live in `lgu-core`; repositories only load rows, hand them to the
//! pure functions and persist what comes back.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lgu_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./portal.db")).await?;
//! let fees = db.tax_config().list_fees().await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::business_tax::{BusinessTaxInput, BusinessTaxRepository, SavedTaxRecord};
pub use repository::ledger::LedgerRepository;
pub use repository::payment::PaymentRepository;
pub use repository::registration::{NewRegistration, RegistrationRepository, StatusChange};
pub use repository::tax_config::{NewRegulatoryFee, NewTaxConfiguration, TaxConfigRepository};
