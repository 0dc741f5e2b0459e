//! # Booking Error Type
//!
//! The one error type every [`BookingEngine`](crate::BookingEngine) operation
//! returns.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  engine.record_payment(...)                                             │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Rule violated? ──── CoreError::AmountExceedsBalance ──┐                │
//! │         │                                              │                │
//! │         ▼                                              ▼                │
//! │  Write failed?  ──── DbError::UniqueViolation ───► BookingError         │
//! │         │                                              │                │
//! │         ▼                                              ▼                │
//! │  Commit ──► Ok(Payment)                      code() → ErrorCode          │
//! │                                              to_response() → JSON       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error is raised before commit, so the transaction is dropped and
//! nothing the operation wrote survives.

use serde::Serialize;
use thiserror::Error;

use hotel_core::{CoreError, ValidationError};
use hotel_db::DbError;

use crate::config::ConfigError;

/// Errors returned by the booking core.
#[derive(Debug, Error)]
pub enum BookingError {
    /// A business rule rejected the request.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<ValidationError> for BookingError {
    fn from(err: ValidationError) -> Self {
        BookingError::Core(CoreError::Validation(err))
    }
}

impl From<sqlx::Error> for BookingError {
    fn from(err: sqlx::Error) -> Self {
        BookingError::Db(DbError::from(err))
    }
}

/// Result type for engine operations.
pub type BookingResult<T> = Result<T, BookingError>;

// =============================================================================
// Error Codes
// =============================================================================

/// Machine-readable category of a [`BookingError`].
///
/// ## Caller Expectations
/// - `NOT_FOUND`: terminal for the request
/// - `VALIDATION_ERROR`: fix the input, then retry
/// - `CONFLICT`: the entity is in the wrong state or the room is taken;
///   retry with different inputs, not blindly
/// - `DATABASE_ERROR`: infrastructure failure, the whole operation may be
///   retried from scratch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    Conflict,
    DatabaseError,
    ConfigError,
}

/// Serialized form handed to the API layer.
///
/// ```json
/// {
///   "code": "CONFLICT",
///   "message": "Room 3 is not available for the requested dates (conflicts with 7K2Q9Z1A)"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

impl BookingError {
    /// Classifies the error for the API layer.
    pub fn code(&self) -> ErrorCode {
        match self {
            BookingError::Core(err) => core_code(err),
            BookingError::Db(err) => db_code(err),
            BookingError::Config(_) => ErrorCode::ConfigError,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        if self.code() == ErrorCode::DatabaseError {
            tracing::error!("Database error: {}", self);
        }

        ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        }
    }

    /// True for not-found errors.
    pub fn is_not_found(&self) -> bool {
        self.code() == ErrorCode::NotFound
    }
}

fn core_code(err: &CoreError) -> ErrorCode {
    use CoreError::*;

    match err {
        RoomNotFound(_)
        | RoomTypeNotFound(_)
        | GuestNotFound(_)
        | ReservationNotFound(_)
        | PaymentNotFound(_)
        | InvoiceNotFound(_)
        | InvoiceItemNotFound { .. } => ErrorCode::NotFound,

        InvalidDateRange { .. }
        | CapacityExceeded { .. }
        | AmountExceedsBalance { .. }
        | CurrencyMismatch { .. }
        | Validation(_) => ErrorCode::ValidationError,

        RoomUnavailable { .. }
        | RoomInactive(_)
        | WrongStatus { .. }
        | ReservationClosed { .. }
        | PaymentRequired(_)
        | OutstandingBalance { .. }
        | ReservationNotDeletable { .. }
        | ReservationHasPayments(_)
        | NoShowBeforeArrival { .. }
        | AlreadyRefunded(_)
        | NotCompleted { .. }
        | PaymentNotPending { .. }
        | PaymentNotDeletable { .. }
        | LedgerUnderflow { .. }
        | RoomHasActiveStay { .. }
        | NotDraft { .. }
        | Empty(_)
        | InvalidState { .. } => ErrorCode::Conflict,
    }
}

fn db_code(err: &DbError) -> ErrorCode {
    match err {
        DbError::NotFound { .. } => ErrorCode::NotFound,
        DbError::CheckViolation(_) => ErrorCode::ValidationError,
        DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
            ErrorCode::Conflict
        }
        DbError::ConnectionFailed(_)
        | DbError::MigrationFailed(_)
        | DbError::QueryFailed(_)
        | DbError::PoolExhausted
        | DbError::Internal(_) => ErrorCode::DatabaseError,
    }
}
