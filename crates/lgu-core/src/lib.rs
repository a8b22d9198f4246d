//! # lgu-core: Pure Business Logic for the LGU Portal
//!
//! This crate holds the tax and payment rules of the municipal portal as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        LGU Portal Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Citizen forms / React admin dashboard              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    lgu-portal-api (axum)                        │   │
//! │  │   /otp/*, /business-tax/*, /registration/*, /rpt/statement      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ lgu-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐       │   │
//! │  │   │  rate  │ │  fees  │ │  tax   │ │ ledger │ │  otp   │       │   │
//! │  │   └────────┘ └────────┘ └────────┘ └────────┘ └────────┘       │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    lgu-db (Database Layer)                      │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (TaxRecord, QuarterlyTax, PaymentTransaction, etc.)
//! - [`money`] - Money type with integer centavo arithmetic
//! - [`rate`] - Rate resolver over time-bounded rate tables
//! - [`fees`] - Regulatory fee aggregation
//! - [`tax`] - Business tax computation and quarterly split
//! - [`ledger`] - Quarterly ledger schedules, penalties, annual settlement
//! - [`otp`] - OTP payment gate state machine
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use lgu_core::money::Money;
//! use lgu_core::tax::TaxComputation;
//! use lgu_core::types::TaxRate;
//!
//! let fees: Money = ["499.98", "500", "300"]
//!     .iter()
//!     .map(|s| s.parse::<Money>().unwrap())
//!     .sum();
//!
//! let tax = TaxComputation::compute("100000".parse().unwrap(), TaxRate::from_bps(200), fees);
//! assert_eq!(tax.total_tax.to_string(), "3299.98");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fees;
pub mod ledger;
pub mod money;
pub mod otp;
pub mod rate;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;
