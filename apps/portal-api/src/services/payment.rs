//! # Payment Gate
//!
//! Request, verify and resend of OTP-gated payments, and the ledger update
//! that follows a successful verification.
//!
//! ## Verify Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load pending payment ──► none? ──► "not found or already processed"   │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  OtpPolicy::check                                                      │
//! │  ├── Locked / Expired ──────────────► reject (nothing written)         │
//! │  ├── Mismatch ──► CAS attempts+1 (lock at max) ──► reject              │
//! │  └── Accepted ──► CAS pending→paid + receipt                           │
//! │                        │                                                │
//! │                        ▼                                                │
//! │               apply ledger update (best effort)                        │
//! │               ├── ok  ──► sync_status = synced                         │
//! │               └── err ──► sync_status = failed, system_error           │
//! │                           (payment stays paid; reconcile retries)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A lost compare-and-swap means another request touched the payment
//! between read and write; the flow re-reads and decides again.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use lgu_core::otp::{generate_receipt_number, OtpChallenge, OtpVerdict};
use lgu_core::validation::{
    validate_otp_code, validate_payment_amount, validate_payment_id, validate_phone,
    validate_required_text, validate_year,
};
use lgu_core::{
    CoreError, Money, PaymentLinkage, PaymentStatus, PaymentTransaction, SyncStatus,
};
use lgu_db::{Database, DbError, DbResult};

use crate::config::PortalConfig;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Re-reads allowed after losing a compare-and-swap.
const MAX_CAS_ROUNDS: usize = 3;

/// A validated payment request.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub phone: String,
    pub payment_method: String,
    pub amount: Money,
    pub purpose: String,
    pub linkage: PaymentLinkage,
}

/// A freshly issued or re-issued OTP.
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub payment_id: String,
    pub expires_at: DateTime<Utc>,
    /// Present only when the configuration allows echoing codes.
    pub test_otp: Option<String>,
}

/// A verified payment.
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    pub payment_id: String,
    pub receipt_number: String,
    pub sync_status: SyncStatus,
}

fn challenge_of(payment: &PaymentTransaction) -> OtpChallenge {
    OtpChallenge {
        code: payment.otp_code.clone(),
        expires_at: payment.otp_expires_at,
        attempts: payment.otp_attempts,
        locked: payment.otp_locked,
    }
}

fn rejection(verdict: OtpVerdict) -> ApiError {
    match verdict.into_result() {
        Err(e) => e.into(),
        Ok(()) => ApiError::internal("accepted OTP handled as a rejection"),
    }
}

fn issued(config: &PortalConfig, payment_id: String, challenge: OtpChallenge) -> IssuedOtp {
    if !config.is_production() {
        debug!(payment_id = %payment_id, otp = %challenge.code, "OTP generated");
    }
    IssuedOtp {
        payment_id,
        expires_at: challenge.expires_at,
        test_otp: config.exposes_test_otp().then_some(challenge.code),
    }
}

/// Creates a pending payment and its first OTP.
pub async fn request_otp(state: &AppState, request: PaymentRequest) -> ApiResult<IssuedOtp> {
    let phone = validate_phone(&request.phone)?;
    let payment_method = validate_required_text("payment_method", &request.payment_method, 50)?;
    let purpose = validate_required_text("purpose", &request.purpose, 255)?;
    validate_payment_amount(request.amount)?;
    match &request.linkage {
        PaymentLinkage::PropertyQuarter { year, .. } | PaymentLinkage::PropertyAnnual { year, .. } => {
            validate_year(*year)?
        }
        _ => {}
    }

    let now = state.now();
    let challenge = state
        .config
        .otp_policy()
        .issue(now, &mut rand::thread_rng());

    let payment = PaymentTransaction {
        payment_id: Uuid::new_v4().to_string(),
        phone,
        payment_method,
        purpose,
        amount: request.amount,
        otp_code: challenge.code.clone(),
        otp_expires_at: challenge.expires_at,
        otp_attempts: 0,
        otp_locked: false,
        payment_status: PaymentStatus::Pending,
        receipt_number: None,
        sync_status: SyncStatus::Pending,
        system_error: None,
        sync_attempts: 0,
        last_sync_attempt_at: None,
        linkage: request.linkage,
        created_at: now,
        updated_at: now,
        paid_at: None,
    };

    state.db.payments().insert(&payment).await?;

    info!(
        payment_id = %payment.payment_id,
        amount = %payment.amount,
        linkage = ?payment.linkage,
        "Payment requested"
    );

    Ok(issued(&state.config, payment.payment_id, challenge))
}

/// Checks a submitted code and, on success, marks the payment paid and
/// applies its ledger update.
pub async fn verify_otp(
    state: &AppState,
    payment_id: &str,
    otp_code: &str,
) -> ApiResult<VerifiedPayment> {
    let payment_id = payment_id.trim();
    validate_payment_id(payment_id)?;
    validate_otp_code(otp_code.trim())?;

    let policy = state.config.otp_policy();
    let payments = state.db.payments();

    for _ in 0..MAX_CAS_ROUNDS {
        let payment = payments
            .get_pending(payment_id)
            .await?
            .ok_or(CoreError::PaymentNotFound)?;

        let now = state.now();
        let verdict = policy.check(&challenge_of(&payment), otp_code, now);

        match verdict {
            OtpVerdict::Locked | OtpVerdict::Expired { .. } => {
                warn!(payment_id = %payment_id, verdict = ?verdict, "OTP rejected");
                return Err(rejection(verdict));
            }
            OtpVerdict::Mismatch {
                attempts, locked, ..
            } => {
                let applied = payments
                    .record_failed_attempt(
                        payment_id,
                        &payment.otp_code,
                        payment.otp_attempts,
                        attempts,
                        locked,
                        now,
                    )
                    .await?;
                if !applied {
                    continue;
                }
                warn!(payment_id = %payment_id, attempts, locked, "Wrong OTP submitted");
                return Err(rejection(verdict));
            }
            OtpVerdict::Accepted => {
                let receipt = generate_receipt_number(now, &mut rand::thread_rng());
                let applied = payments
                    .mark_paid(payment_id, &payment.otp_code, payment.otp_attempts, &receipt, now)
                    .await?;
                if !applied {
                    continue;
                }

                let paid = PaymentTransaction {
                    payment_status: PaymentStatus::Paid,
                    receipt_number: Some(receipt.clone()),
                    paid_at: Some(now),
                    ..payment
                };
                let sync_status = sync_ledger(&state.db, &state.config, &paid, now).await;

                return Ok(VerifiedPayment {
                    payment_id: paid.payment_id,
                    receipt_number: receipt,
                    sync_status,
                });
            }
        }
    }

    Err(DbError::stale("PaymentTransaction", payment_id).into())
}

/// Issues a new code for a pending payment. Attempts carry over.
pub async fn resend_otp(state: &AppState, payment_id: &str) -> ApiResult<IssuedOtp> {
    let payment_id = payment_id.trim();
    validate_payment_id(payment_id)?;

    let payments = state.db.payments();
    let payment = payments
        .get_pending(payment_id)
        .await?
        .ok_or(CoreError::PaymentNotFound)?;

    let now = state.now();
    let challenge = state
        .config
        .otp_policy()
        .resend(&challenge_of(&payment), now, &mut rand::thread_rng())?;

    if !payments
        .replace_otp(payment_id, &challenge.code, challenge.expires_at, now)
        .await?
    {
        // Locked or paid in between
        return Err(CoreError::PaymentNotFound.into());
    }

    info!(payment_id = %payment_id, attempts = challenge.attempts, "OTP resent");
    Ok(issued(&state.config, payment.payment_id, challenge))
}

/// Applies the ledger side effect of a paid payment.
///
/// Settling is idempotent per receipt, so this is safe to repeat.
pub async fn apply_ledger_update(
    db: &Database,
    config: &PortalConfig,
    payment: &PaymentTransaction,
    paid_at: DateTime<Utc>,
) -> DbResult<()> {
    let receipt = payment
        .receipt_number
        .as_deref()
        .ok_or_else(|| DbError::Internal(format!("payment {} has no receipt", payment.payment_id)))?;
    let ledger = db.ledger();

    match &payment.linkage {
        PaymentLinkage::None => {}
        PaymentLinkage::QuarterRow { tax_id } => {
            ledger.settle_quarter(tax_id, receipt, paid_at).await?;
        }
        PaymentLinkage::PropertyQuarter {
            property_total_id,
            quarter,
            year,
        } => {
            ledger
                .settle_property_quarter(property_total_id, *quarter, *year, receipt, paid_at)
                .await?;
        }
        PaymentLinkage::PropertyAnnual {
            property_total_id,
            year,
        } => {
            let settlement = ledger
                .settle_property_annual(
                    property_total_id,
                    *year,
                    receipt,
                    paid_at,
                    config.tax.annual_discount_bps,
                    &config.penalty_policy(),
                )
                .await?;
            if settlement.is_noop() {
                debug!(property_total_id = %property_total_id, year, "Annual payment found every quarter paid");
            }
        }
    }

    Ok(())
}

/// Runs the ledger update and records the outcome on the payment.
///
/// Never fails: a ledger error is stored as `sync_status = failed`.
pub async fn sync_ledger(
    db: &Database,
    config: &PortalConfig,
    payment: &PaymentTransaction,
    now: DateTime<Utc>,
) -> SyncStatus {
    let paid_at = payment.paid_at.unwrap_or(now);
    let payments = db.payments();

    match apply_ledger_update(db, config, payment, paid_at).await {
        Ok(()) => match payments.mark_synced(&payment.payment_id, now).await {
            Ok(()) => SyncStatus::Synced,
            Err(e) => {
                warn!(payment_id = %payment.payment_id, error = %e, "Could not record ledger sync");
                payment.sync_status
            }
        },
        Err(e) => {
            warn!(
                payment_id = %payment.payment_id,
                error = %e,
                "Ledger update failed, payment kept as paid"
            );
            match payments
                .mark_sync_failed(&payment.payment_id, &e.to_string(), now)
                .await
            {
                Ok(attempts) if attempts >= config.reconcile.max_sync_attempts => {
                    error!(
                        payment_id = %payment.payment_id,
                        attempts,
                        "Ledger sync retries exhausted, needs manual reconciliation"
                    );
                }
                Ok(_) => {}
                Err(record_err) => {
                    warn!(payment_id = %payment.payment_id, error = %record_err, "Could not record ledger failure");
                }
            }
            SyncStatus::Failed
        }
    }
}
