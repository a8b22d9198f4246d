//! OTP payment gate endpoints.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use lgu_core::validation::validate_payment_id;
use lgu_core::{
    CoreError, LedgerKind, PaymentLinkage, PaymentStatus, Quarter, QuarterStatus, SyncStatus,
};

use crate::error::ApiResult;
use crate::routes::{money_from_pesos, pesos};
use crate::services::payment::{self, IssuedOtp, PaymentRequest};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/otp/request", post(request_otp))
        .route("/otp/verify", post(verify_otp))
        .route("/otp/resend", post(resend_otp))
        .route("/otp/status", get(otp_status))
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct OtpRequestBody {
    pub phone: String,
    pub payment_method: String,
    /// Pesos.
    pub amount: f64,
    pub purpose: String,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub property_total_id: Option<String>,
    #[serde(default)]
    pub quarter: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub is_annual: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OtpIssuedResponse {
    pub success: bool,
    pub payment_id: String,
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_otp: Option<String>,
}

impl From<IssuedOtp> for OtpIssuedResponse {
    fn from(issued: IssuedOtp) -> Self {
        OtpIssuedResponse {
            success: true,
            payment_id: issued.payment_id,
            expires_at: issued.expires_at,
            test_otp: issued.test_otp,
        }
    }
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct OtpVerifyBody {
    pub payment_id: String,
    pub otp_code: String,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OtpVerifyResponse {
    pub success: bool,
    pub receipt_number: String,
    pub message: String,
    pub sync_status: SyncStatus,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct OtpResendBody {
    pub payment_id: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpStatusQuery {
    pub payment_id: String,
}

/// Payment state of the linked property for the linked year.
#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RptStatus {
    pub property_total_id: String,
    pub year: i32,
    pub paid_quarters: usize,
    pub total_quarters: usize,
    pub fully_paid: bool,
    /// Pesos still owed.
    pub total_due: f64,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OtpStatusResponse {
    pub success: bool,
    pub payment_id: String,
    pub payment_status: PaymentStatus,
    pub receipt_number: Option<String>,
    pub sync_status: SyncStatus,
    /// Failed ledger syncs so far.
    pub sync_attempts: u32,
    pub rpt_status: Option<RptStatus>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn request_otp(
    State(state): State<AppState>,
    Json(body): Json<OtpRequestBody>,
) -> ApiResult<Json<OtpIssuedResponse>> {
    let quarter = body
        .quarter
        .as_deref()
        .filter(|q| !q.trim().is_empty())
        .map(str::parse::<Quarter>)
        .transpose()?;
    let linkage = PaymentLinkage::from_parts(
        body.tax_id,
        body.property_total_id,
        quarter,
        body.year,
        body.is_annual.unwrap_or(false),
    )?;

    let request = PaymentRequest {
        phone: body.phone,
        payment_method: body.payment_method,
        amount: money_from_pesos("amount", body.amount)?,
        purpose: body.purpose,
        linkage,
    };

    let issued = payment::request_otp(&state, request).await?;
    Ok(Json(issued.into()))
}

async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<OtpVerifyBody>,
) -> ApiResult<Json<OtpVerifyResponse>> {
    let verified = payment::verify_otp(&state, &body.payment_id, &body.otp_code).await?;

    Ok(Json(OtpVerifyResponse {
        success: true,
        message: format!("Payment successful. Receipt {}", verified.receipt_number),
        receipt_number: verified.receipt_number,
        sync_status: verified.sync_status,
    }))
}

async fn resend_otp(
    State(state): State<AppState>,
    Json(body): Json<OtpResendBody>,
) -> ApiResult<Json<OtpIssuedResponse>> {
    let issued = payment::resend_otp(&state, &body.payment_id).await?;
    Ok(Json(issued.into()))
}

async fn otp_status(
    State(state): State<AppState>,
    Query(query): Query<OtpStatusQuery>,
) -> ApiResult<Json<OtpStatusResponse>> {
    let payment_id = query.payment_id.trim();
    validate_payment_id(payment_id)?;

    let payment = state
        .db
        .payments()
        .get(payment_id)
        .await?
        .ok_or(CoreError::PaymentNotFound)?;

    let rpt_status = match &payment.linkage {
        PaymentLinkage::PropertyQuarter {
            property_total_id,
            year,
            ..
        }
        | PaymentLinkage::PropertyAnnual {
            property_total_id,
            year,
        } => {
            let statement = state
                .db
                .ledger()
                .statement(LedgerKind::Property, property_total_id, *year)
                .await?;
            Some(RptStatus {
                property_total_id: property_total_id.clone(),
                year: *year,
                paid_quarters: statement
                    .lines
                    .iter()
                    .filter(|line| line.payment_status == QuarterStatus::Paid)
                    .count(),
                total_quarters: statement.lines.len(),
                fully_paid: statement.fully_paid,
                total_due: pesos(statement.total_due),
            })
        }
        _ => None,
    };

    Ok(Json(OtpStatusResponse {
        success: true,
        payment_id: payment.payment_id,
        payment_status: payment.payment_status,
        receipt_number: payment.receipt_number,
        sync_status: payment.sync_status,
        sync_attempts: payment.sync_attempts,
        rpt_status,
    }))
}
