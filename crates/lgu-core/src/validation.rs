//! # Validation Module
//!
//! Input validation run before anything touches the database.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Dashboard / citizen forms                                    │
//! │  └── Immediate feedback (empty fields, length)                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: HTTP handler (Rust)                                          │
//! │  ├── Type validation (serde deserialization)                           │
//! │  └── THIS MODULE: business input rules                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE keys (one tax record per permit, one row per quarter)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::otp::OTP_LENGTH;
use crate::types::RegistrationStatus;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Oldest tax year the ledger accepts.
pub const MIN_TAX_YEAR: i32 = 2000;

/// Latest tax year the ledger accepts.
pub const MAX_TAX_YEAR: i32 = 2100;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required free-text field and returns it trimmed.
///
/// ## Example
/// ```rust
/// use lgu_core::validation::validate_required_text;
///
/// assert_eq!(validate_required_text("business_name", "  Sari-Sari ", 200).unwrap(), "Sari-Sari");
/// assert!(validate_required_text("business_name", "   ", 200).is_err());
/// ```
pub fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Validates and normalizes a Philippine mobile number.
///
/// ## Rules
/// - Accepts `09XXXXXXXXX`, `639XXXXXXXXX` and `+639XXXXXXXXX`
/// - Spaces and hyphens are ignored
/// - Returns the canonical `09XXXXXXXXX` form
///
/// ## Example
/// ```rust
/// use lgu_core::validation::validate_phone;
///
/// assert_eq!(validate_phone("+63 917 123 4567").unwrap(), "09171234567");
/// assert!(validate_phone("12345").is_err());
/// ```
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let digits: String = phone
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();

    if digits.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    let local = if let Some(rest) = digits.strip_prefix("+63") {
        format!("0{}", rest)
    } else if let Some(rest) = digits.strip_prefix("63") {
        format!("0{}", rest)
    } else {
        digits
    };

    let valid = local.len() == 11
        && local.starts_with("09")
        && local.chars().all(|c| c.is_ascii_digit());

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must be a mobile number like 09171234567".to_string(),
        });
    }

    Ok(local)
}

/// Validates the shape of a submitted OTP code (exactly six digits).
pub fn validate_otp_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "otp_code".to_string(),
        });
    }

    if code.len() != OTP_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "otp_code".to_string(),
            reason: format!("must be {} digits", OTP_LENGTH),
        });
    }

    Ok(())
}

/// Validates a payment id (UUID format).
pub fn validate_payment_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "payment_id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id.trim()).map_err(|_| ValidationError::InvalidFormat {
        field: "payment_id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a payment amount: strictly positive.
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a taxable amount: zero allowed (record stays pending), negative not.
pub fn validate_taxable_amount(amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "taxable_amount".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a tax year.
pub fn validate_year(year: i32) -> ValidationResult<()> {
    if !(MIN_TAX_YEAR..=MAX_TAX_YEAR).contains(&year) {
        return Err(ValidationError::OutOfRange {
            field: "year".to_string(),
            min: MIN_TAX_YEAR as i64,
            max: MAX_TAX_YEAR as i64,
        });
    }

    Ok(())
}

/// Validates a rate in basis points (0% to 100%).
pub fn validate_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

/// Notes sent with a registration status change.
///
/// Required (non-blank) when moving to `needs_correction`; blank notes are
/// dropped for every other status.
pub fn validate_correction_notes(
    status: RegistrationStatus,
    notes: Option<&str>,
) -> ValidationResult<Option<String>> {
    let notes = notes.map(str::trim).filter(|n| !n.is_empty());

    match notes {
        None if status == RegistrationStatus::NeedsCorrection => {
            Err(ValidationError::Required {
                field: "correction_notes".to_string(),
            })
        }
        Some(n) if n.len() > 2000 => Err(ValidationError::TooLong {
            field: "correction_notes".to_string(),
            max: 2000,
        }),
        other => Ok(other.map(str::to_string)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required_text() {
        assert_eq!(
            validate_required_text("full_name", " Juan Dela Cruz ", 100).unwrap(),
            "Juan Dela Cruz"
        );
        assert!(validate_required_text("full_name", "", 100).is_err());
        assert!(validate_required_text("full_name", &"A".repeat(101), 100).is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert_eq!(validate_phone("09171234567").unwrap(), "09171234567");
        assert_eq!(validate_phone("639171234567").unwrap(), "09171234567");
        assert_eq!(validate_phone("+63-917-123-4567").unwrap(), "09171234567");

        assert!(validate_phone("").is_err());
        assert!(validate_phone("0917123456").is_err());
        assert!(validate_phone("08171234567").is_err());
        assert!(validate_phone("0917abc4567").is_err());
    }

    #[test]
    fn test_validate_otp_code() {
        assert!(validate_otp_code("004213").is_ok());
        assert!(validate_otp_code("").is_err());
        assert!(validate_otp_code("12345").is_err());
        assert!(validate_otp_code("12345a").is_err());
    }

    #[test]
    fn test_validate_payment_id() {
        assert!(validate_payment_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_payment_id("").is_err());
        assert!(validate_payment_id("PAY-1").is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_payment_amount(Money::from_cents(1)).is_ok());
        assert!(validate_payment_amount(Money::zero()).is_err());
        assert!(validate_taxable_amount(Money::zero()).is_ok());
        assert!(validate_taxable_amount(Money::from_cents(-1)).is_err());
    }

    #[test]
    fn test_validate_year_and_rate() {
        assert!(validate_year(2026).is_ok());
        assert!(validate_year(1999).is_err());
        assert!(validate_rate_bps(10_000).is_ok());
        assert!(validate_rate_bps(10_001).is_err());
    }

    #[test]
    fn test_validate_correction_notes() {
        assert!(validate_correction_notes(RegistrationStatus::NeedsCorrection, None).is_err());
        assert!(validate_correction_notes(RegistrationStatus::NeedsCorrection, Some("  ")).is_err());
        assert_eq!(
            validate_correction_notes(RegistrationStatus::NeedsCorrection, Some(" Missing TDN "))
                .unwrap()
                .as_deref(),
            Some("Missing TDN")
        );
        assert_eq!(
            validate_correction_notes(RegistrationStatus::Approved, Some("")).unwrap(),
            None
        );
    }
}
