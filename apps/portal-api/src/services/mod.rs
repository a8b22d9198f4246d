//! Orchestration between handlers, pure rules in `lgu-core` and the
//! repositories in `lgu-db`.
//!
//! - [`payment`] - OTP gate and the ledger update after payment
//! - [`business_tax`] - Rate lookup, fees and business tax persistence

pub mod business_tax;
pub mod payment;
