//! # OTP Payment Gate
//!
//! The state machine that gates a payment's move from pending to paid.
//!
//! ## Verification Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  submitted code                                                         │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  locked? ──yes──► Locked           (nothing changes)                   │
//! │      │ no                                                               │
//! │      ▼                                                                  │
//! │  now > expires_at? ──yes──► Expired (attempts unchanged)               │
//! │      │ no                                                               │
//! │      ▼                                                                  │
//! │  code matches? ──no──► Mismatch    (attempts + 1, lock at max)         │
//! │      │ yes                                                              │
//! │      ▼                                                                  │
//! │  Accepted ──► receipt, paid, ledger update (best effort)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Codes are compared in constant time.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::error::{CoreError, CoreResult};

/// Digits in an OTP code.
pub const OTP_LENGTH: usize = 6;

/// Default validity window of a code.
pub const DEFAULT_OTP_TTL_MINUTES: i64 = 5;

/// Default number of wrong codes before the payment locks.
pub const DEFAULT_MAX_OTP_ATTEMPTS: u32 = 3;

/// Tunables for the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpPolicy {
    pub ttl_minutes: i64,
    pub max_attempts: u32,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        OtpPolicy {
            ttl_minutes: DEFAULT_OTP_TTL_MINUTES,
            max_attempts: DEFAULT_MAX_OTP_ATTEMPTS,
        }
    }
}

impl OtpPolicy {
    pub fn ttl(&self) -> Duration {
        Duration::minutes(self.ttl_minutes)
    }

    /// A fresh challenge issued at `now`.
    pub fn issue<R: Rng>(&self, now: DateTime<Utc>, rng: &mut R) -> OtpChallenge {
        OtpChallenge {
            code: generate_code(rng),
            expires_at: now + self.ttl(),
            attempts: 0,
            locked: false,
        }
    }

    /// Runs the checks in gate order. Pure: the caller persists the verdict.
    pub fn check(&self, challenge: &OtpChallenge, submitted: &str, now: DateTime<Utc>) -> OtpVerdict {
        if challenge.locked {
            return OtpVerdict::Locked;
        }

        if now > challenge.expires_at {
            return OtpVerdict::Expired {
                expired_at: challenge.expires_at,
            };
        }

        if codes_match(&challenge.code, submitted.trim()) {
            return OtpVerdict::Accepted;
        }

        let attempts = challenge.attempts.saturating_add(1);
        OtpVerdict::Mismatch {
            attempts,
            locked: attempts >= self.max_attempts,
            remaining_attempts: self.max_attempts.saturating_sub(attempts),
        }
    }

    /// New code and expiry for an existing challenge.
    ///
    /// The attempt counter carries over. Locked challenges cannot be resent.
    pub fn resend<R: Rng>(
        &self,
        challenge: &OtpChallenge,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> CoreResult<OtpChallenge> {
        if challenge.locked {
            return Err(CoreError::OtpLocked);
        }

        Ok(OtpChallenge {
            code: generate_code(rng),
            expires_at: now + self.ttl(),
            attempts: challenge.attempts,
            locked: false,
        })
    }
}

/// The OTP fields of a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: u32,
    pub locked: bool,
}

/// Result of checking a submitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpVerdict {
    Accepted,
    Locked,
    Expired {
        expired_at: DateTime<Utc>,
    },
    /// `attempts` is the new counter value to persist.
    Mismatch {
        attempts: u32,
        locked: bool,
        remaining_attempts: u32,
    },
}

impl OtpVerdict {
    /// Maps rejections to their error.
    pub fn into_result(self) -> CoreResult<()> {
        match self {
            OtpVerdict::Accepted => Ok(()),
            OtpVerdict::Locked => Err(CoreError::OtpLocked),
            OtpVerdict::Expired { expired_at } => Err(CoreError::OtpExpired { expired_at }),
            OtpVerdict::Mismatch {
                locked,
                remaining_attempts,
                ..
            } => Err(CoreError::OtpMismatch {
                remaining_attempts,
                locked,
            }),
        }
    }
}

/// Six random digits, zero padded.
pub fn generate_code<R: Rng>(rng: &mut R) -> String {
    format!("{:06}", rng.gen_range(0..1_000_000u32))
}

fn codes_match(expected: &str, submitted: &str) -> bool {
    expected.len() == submitted.len() && bool::from(expected.as_bytes().ct_eq(submitted.as_bytes()))
}

/// Official receipt number: `OR-YYYYMMDD-XXXXXX`.
pub fn generate_receipt_number<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let suffix: String = (0..6)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("OR-{}-{}", now.format("%Y%m%d"), suffix)
}

// =============================================================================
// Unit Tests
// =============================================================================
