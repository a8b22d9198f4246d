//! # Error Types
//!
//! Domain-specific error types for lgu-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  lgu-core errors (this file)                                           │
//! │  ├── CoreError        - Business rule / state violations               │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  lgu-db errors (separate crate)                                        │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  portal-api errors                                                     │
//! │  └── ApiError         - What the dashboard sees (JSON)                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → HTTP response          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Payment is unknown or no longer pending.
    ///
    /// Both cases share one message so callers cannot tell which payment
    /// ids exist.
    #[error("Payment not found or already processed")]
    PaymentNotFound,

    /// Too many wrong codes were entered; the payment can no longer be verified.
    #[error("Payment is locked after too many failed OTP attempts")]
    OtpLocked,

    /// The OTP window has closed.
    #[error("OTP expired at {expired_at}")]
    OtpExpired { expired_at: DateTime<Utc> },

    /// Wrong code entered.
    ///
    /// ## User Workflow
    /// ```text
    /// Enter OTP 123456 (expected 654321)
    ///      │
    ///      ▼
    /// attempts 1 → 2, max 3
    ///      │
    ///      ▼
    /// OtpMismatch { remaining_attempts: 1, locked: false }
    ///      │
    ///      ▼
    /// UI shows: "Invalid OTP. 1 attempt(s) remaining"
    /// ```
    #[error("Invalid OTP, {remaining_attempts} attempt(s) remaining")]
    OtpMismatch { remaining_attempts: u32, locked: bool },

    /// No configuration row answers the lookup and the caller refused a zero rate.
    #[error("No applicable {calculation_type} rate for {key}")]
    NoApplicableRate { calculation_type: String, key: String },

    /// Date arithmetic left the supported calendar range.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when request input doesn't meet requirements.
/// They are raised before anything is persisted.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., bad phone number, bad date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::OtpMismatch {
            remaining_attempts: 1,
            locked: false,
        };
        assert_eq!(err.to_string(), "Invalid OTP, 1 attempt(s) remaining");

        assert_eq!(
            CoreError::PaymentNotFound.to_string(),
            "Payment not found or already processed"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "phone".to_string(),
        };
        assert_eq!(err.to_string(), "phone is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "payment_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
