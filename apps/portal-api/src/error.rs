//! # API Error Handling
//!
//! Error type returned by every handler.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Error Propagation                                │
//! │                                                                         │
//! │  lgu-core          lgu-db            portal-api         Client         │
//! │  ─────────         ──────            ──────────         ──────         │
//! │                                                                         │
//! │  CoreError ───────────────────────► ApiError ─────────► JSON body      │
//! │                    DbError ───────►    │                + status code  │
//! │                                        │                                │
//! │                               IntoResponse                              │
//! │                                                                         │
//! │  { "success": false, "code": "OTP_MISMATCH",                           │
//! │    "message": "Invalid OTP, 2 attempt(s) remaining",                   │
//! │    "remaining_attempts": 2 }                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures are logged with their detail and reach the client as a
//! generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use ts_rs::TS;

use lgu_core::{CoreError, ValidationError};
use lgu_db::DbError;

/// Machine-readable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Unknown id, or an entity no longer in the state the request needs (404)
    NotFound,

    /// Input validation failed (422)
    ValidationError,

    /// Wrong OTP entered (400)
    OtpMismatch,

    /// OTP window closed (400)
    OtpExpired,

    /// Too many wrong OTPs (423)
    OtpLocked,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::OtpMismatch | ErrorCode::OtpExpired => StatusCode::BAD_REQUEST,
            ErrorCode::OtpLocked => StatusCode::LOCKED,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body sent to clients.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    /// Only on OTP mismatches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_attempts: Option<u32>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            remaining_attempts: None,
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    #[serde(flatten)]
    error: &'a ApiError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: &self,
        };
        (self.code.status(), Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::StaleState { entity, .. } => ApiError::new(
                ErrorCode::NotFound,
                format!("{} not found or already processed", entity),
            ),
            DbError::UniqueViolation { field, value } => ApiError::validation(format!(
                "{} '{}' already exists",
                field, value
            )),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::CorruptRow { .. } | DbError::Internal(_) | DbError::QueryFailed(_) => {
                tracing::error!(error = %err, "Database operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::ConnectionFailed(_) | DbError::MigrationFailed(_) | DbError::PoolExhausted => {
                tracing::error!(error = %err, "Database unavailable");
                ApiError::new(ErrorCode::DatabaseError, "Database unavailable")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::PaymentNotFound => ApiError::new(ErrorCode::NotFound, err.to_string()),
            CoreError::OtpLocked => ApiError::new(ErrorCode::OtpLocked, err.to_string()),
            CoreError::OtpExpired { .. } => ApiError::new(
                ErrorCode::OtpExpired,
                "OTP has expired, request a new one",
            ),
            CoreError::OtpMismatch {
                remaining_attempts,
                locked,
            } => {
                if locked {
                    ApiError::new(
                        ErrorCode::OtpLocked,
                        "Invalid OTP. Payment is now locked after too many failed attempts",
                    )
                } else {
                    ApiError {
                        code: ErrorCode::OtpMismatch,
                        message: err.to_string(),
                        remaining_attempts: Some(remaining_attempts),
                    }
                }
            }
            CoreError::NoApplicableRate { .. } => ApiError::validation(err.to_string()),
            CoreError::InvalidDate(_) | CoreError::Validation(_) => {
                ApiError::validation(err.to_string())
            }
        }
    }
}

/// Result alias for handlers and services.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::ValidationError.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ErrorCode::OtpLocked.status(), StatusCode::LOCKED);
        assert_eq!(ErrorCode::OtpExpired.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_mismatch_carries_remaining_attempts() {
        let err = ApiError::from(CoreError::OtpMismatch {
            remaining_attempts: 2,
            locked: false,
        });
        assert_eq!(err.code, ErrorCode::OtpMismatch);
        assert_eq!(err.remaining_attempts, Some(2));

        let locked = ApiError::from(CoreError::OtpMismatch {
            remaining_attempts: 0,
            locked: true,
        });
        assert_eq!(locked.code, ErrorCode::OtpLocked);
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = ApiError::from(DbError::QueryFailed("no such column: secret".into()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("secret"));
    }

    #[test]
    fn test_stale_state_is_uniform_not_found() {
        let err = ApiError::from(DbError::stale("QuarterlyTax", "q-1"));
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "QuarterlyTax not found or already processed");
    }
}
