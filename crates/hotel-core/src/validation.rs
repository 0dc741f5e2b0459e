//! # Validation Module
//!
//! Input validation for the booking core.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: API layer                                                     │
//! │  └── Deserialization, required fields                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Stay ranges, guest counts, amounts, quantities                     │
//! │  └── Runs before any lock is taken or row is read                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Domain rules (pricing, availability, state machines)          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite (NOT NULL, UNIQUE, CHECK, foreign keys)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::DateRange;
use crate::{MAX_ITEM_QUANTITY, MAX_STAY_NIGHTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Stay Validators
// =============================================================================

/// Validates a stay range and returns its number of nights.
///
/// ## Rules
/// - `check_out` must be strictly after `check_in`
/// - At most [`MAX_STAY_NIGHTS`] nights
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use hotel_core::types::DateRange;
/// use hotel_core::validation::validate_stay;
///
/// let d = |day| NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
/// assert_eq!(validate_stay(DateRange::new(d(1), d(4))).unwrap(), 3);
/// assert!(validate_stay(DateRange::new(d(4), d(4))).is_err());
/// ```
pub fn validate_stay(stay: DateRange) -> CoreResult<i64> {
    let nights = stay.nights();
    if nights <= 0 || nights > MAX_STAY_NIGHTS {
        return Err(CoreError::InvalidDateRange {
            check_in: stay.check_in,
            check_out: stay.check_out,
        });
    }
    Ok(nights)
}

/// Validates guest counts: at least one adult, no negative children.
pub fn validate_guests(num_adults: i64, num_children: i64) -> ValidationResult<()> {
    if num_adults < 1 {
        return Err(ValidationError::OutOfRange {
            field: "num_adults".to_string(),
            min: 1,
            max: i64::from(u16::MAX),
        });
    }

    if num_children < 0 {
        return Err(ValidationError::OutOfRange {
            field: "num_children".to_string(),
            min: 0,
            max: i64::from(u16::MAX),
        });
    }

    Ok(())
}

/// Checks the party fits the room type's capacity.
pub fn ensure_capacity(capacity: i64, num_adults: i64, num_children: i64) -> CoreResult<()> {
    let requested = num_adults + num_children;
    if requested > capacity {
        return Err(CoreError::CapacityExceeded {
            capacity,
            requested,
        });
    }
    Ok(())
}

// =============================================================================
// Money Validators
// =============================================================================

/// Validates a payment or settlement amount is strictly positive.
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a unit price on an invoice line (zero allowed for courtesies).
pub fn validate_unit_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "unit_price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates an invoice line quantity.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if !(1..=MAX_ITEM_QUANTITY).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required, bounded free-text field.
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
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

    Ok(())
}

/// Validates a public code made of `prefix` followed by `len` characters of `[A-Z0-9]`.
///
/// ## Example
/// ```rust
/// use hotel_core::validation::validate_code;
///
/// assert!(validate_code("confirmation_code", "7K2Q9Z1A", "", 8).is_ok());
/// assert!(validate_code("payment_code", "PAY-AB12CD34EF", "PAY-", 10).is_ok());
/// assert!(validate_code("confirmation_code", "7k2q9z1a", "", 8).is_err());
/// ```
pub fn validate_code(field: &str, code: &str, prefix: &str, len: usize) -> ValidationResult<()> {
    let body = code.strip_prefix(prefix).ok_or_else(|| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: format!("must start with '{}'", prefix),
    })?;

    let well_formed = body.len() == len
        && body
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());

    if !well_formed {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("expected {} characters of A-Z or 0-9", len),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
