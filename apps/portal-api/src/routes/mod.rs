//! # HTTP Routes
//!
//! | Method | Path | Module |
//! |--------|------|--------|
//! | POST | `/otp/request`, `/otp/verify`, `/otp/resend` | [`otp`] |
//! | GET | `/otp/status` | [`otp`] |
//! | POST | `/business-tax/calculate` | [`business_tax`] |
//! | GET | `/business-tax/quarters` | [`business_tax`] |
//! | POST | `/registration/update-status` | [`registration`] |
//! | GET | `/rpt/statement` | [`rpt`] |
//! | GET | `/health` | [`health`] |
//!
//! Amounts cross the wire as decimal pesos and are converted to centavos
//! here, before any rule sees them.

pub mod business_tax;
pub mod health;
pub mod otp;
pub mod registration;
pub mod rpt;

use axum::Router;
use lgu_core::{Money, ValidationError};

use crate::error::ApiResult;
use crate::state::AppState;

/// All API routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(otp::router())
        .merge(business_tax::router())
        .merge(registration::router())
        .merge(rpt::router())
        .merge(health::router())
}

/// Peso amount from a request body.
pub(crate) fn money_from_pesos(field: &str, pesos: f64) -> ApiResult<Money> {
    Money::from_pesos_f64(pesos).ok_or_else(|| {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "not a finite amount".to_string(),
        }
        .into()
    })
}

/// Peso amount for a response body.
#[inline]
pub(crate) fn pesos(amount: Money) -> f64 {
    amount.as_pesos_f64()
}
