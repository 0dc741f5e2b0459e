//! # Error Types
//!
//! Domain-specific error types for hotel-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  hotel-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  hotel-db errors                                                        │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  hotel-booking errors                                                   │
//! │  └── BookingError     - What the API layer sees (with ErrorCode)        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                   │
//! │                          DbError ───┴→ BookingError → API               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant carries the ids or amounts needed to build a user-facing
//! message; none of them are strings assembled by callers.

use chrono::NaiveDate;
use thiserror::Error;

use crate::money::Money;
use crate::types::{Currency, InvoiceStatus, PaymentStatus, ReservationStatus, RoomStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the booking core.
#[derive(Debug, Error)]
pub enum CoreError {
    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------
    #[error("Room not found: {0}")]
    RoomNotFound(i64),

    #[error("Room type not found: {0}")]
    RoomTypeNotFound(i64),

    #[error("Guest not found: {0}")]
    GuestNotFound(i64),

    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    #[error("Payment not found: {0}")]
    PaymentNotFound(i64),

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(i64),

    #[error("Invoice item {item_id} not found on invoice {invoice_id}")]
    InvoiceItemNotFound { invoice_id: i64, item_id: i64 },

    // -------------------------------------------------------------------------
    // Booking
    // -------------------------------------------------------------------------
    /// The stay range is empty, inverted or too long.
    #[error("Invalid date range: {check_in} → {check_out}")]
    InvalidDateRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },

    /// Another active reservation holds at least one of the requested nights.
    ///
    /// ## User Workflow
    /// ```text
    /// Room 101: [Mar 1 ─── Mar 4)
    /// Request:        [Mar 3 ─── Mar 5)
    ///      │
    ///      ▼
    /// RoomUnavailable { room_id: 101, conflicting: "7K2Q9Z1A" }
    /// ```
    #[error("Room {room_id} is not available for the requested dates (conflicts with {conflicting})")]
    RoomUnavailable { room_id: i64, conflicting: String },

    /// The room is deactivated and cannot take new stays.
    #[error("Room {0} is inactive")]
    RoomInactive(i64),

    #[error("Room capacity is {capacity}, requested {requested} guests")]
    CapacityExceeded { capacity: i64, requested: i64 },

    // -------------------------------------------------------------------------
    // Reservation lifecycle
    // -------------------------------------------------------------------------
    /// The reservation's status does not allow the requested transition.
    #[error("Reservation {code} is {current}, cannot {action}")]
    WrongStatus {
        code: String,
        current: ReservationStatus,
        action: &'static str,
    },

    /// Cancelled / checked-out / no-show reservations take no changes or payments.
    #[error("Reservation {code} is closed ({status})")]
    ReservationClosed {
        code: String,
        status: ReservationStatus,
    },

    #[error("Reservation {0} needs at least one payment before check-in")]
    PaymentRequired(String),

    #[error("Reservation {code} has an outstanding balance of {balance}")]
    OutstandingBalance { code: String, balance: Money },

    #[error("Reservation {code} cannot be deleted while {status}")]
    ReservationNotDeletable {
        code: String,
        status: ReservationStatus,
    },

    #[error("Reservation {0} has payments and cannot be deleted")]
    ReservationHasPayments(String),

    #[error("Reservation {code} cannot be marked no-show before its arrival date {check_in}")]
    NoShowBeforeArrival { code: String, check_in: NaiveDate },

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------
    #[error("Payment of {amount} exceeds outstanding balance {balance}")]
    AmountExceedsBalance { amount: Money, balance: Money },

    #[error("Payment currency {payment} does not match {expected}")]
    CurrencyMismatch { expected: Currency, payment: Currency },

    #[error("Payment {0} is already refunded")]
    AlreadyRefunded(String),

    #[error("Payment {code} is {status:?}, expected Completed")]
    NotCompleted { code: String, status: PaymentStatus },

    #[error("Payment {code} is {status:?}, expected Pending")]
    PaymentNotPending { code: String, status: PaymentStatus },

    #[error("Payment {code} is {status:?} and cannot be deleted")]
    PaymentNotDeletable { code: String, status: PaymentStatus },

    /// A reversal would take paid below zero; the stored ledger is corrupt.
    #[error("Reversing {amount} would take paid amount {paid} below zero")]
    LedgerUnderflow { amount: Money, paid: Money },

    // -------------------------------------------------------------------------
    // Rooms
    // -------------------------------------------------------------------------
    #[error("Room {room_id} has a checked-in guest and cannot move from {from:?} to {to:?}")]
    RoomHasActiveStay {
        room_id: i64,
        from: RoomStatus,
        to: RoomStatus,
    },

    // -------------------------------------------------------------------------
    // Invoices
    // -------------------------------------------------------------------------
    #[error("Invoice {number} is {status:?}; only drafts can be changed")]
    NotDraft {
        number: String,
        status: InvoiceStatus,
    },

    #[error("Invoice {0} has no items")]
    Empty(String),

    #[error("Invoice {number} is {status:?}, cannot {action}")]
    InvalidState {
        number: String,
        status: InvoiceStatus,
        action: &'static str,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business rule runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

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
