//! # Availability Engine
//!
//! Decides whether a room can take a stay given the reservations it already
//! holds. Stays are half-open night intervals, so a check-out and a
//! check-in on the same date do not collide.
//!
//! ```text
//!   existing   [Mar 1 ───────── Mar 4)
//!   ok                           [Mar 4 ──── Mar 6)     same-day turnover
//!   conflict              [Mar 3 ──── Mar 5)
//! ```
//!
//! Only PENDING, CONFIRMED and CHECKED_IN reservations block nights.
//! The functions here are pure; the engine runs them under the room lock
//! over rows read inside the same transaction that inserts the booking.

use crate::error::{CoreError, CoreResult};
use crate::types::{DateRange, Reservation};
use crate::validation::validate_stay;

/// Returns the first active reservation on `room_id` overlapping `stay`,
/// ignoring `exclude` (the reservation being rescheduled).
pub fn find_conflict<'a>(
    existing: &'a [Reservation],
    room_id: i64,
    stay: DateRange,
    exclude: Option<i64>,
) -> Option<&'a Reservation> {
    existing.iter().find(|r| {
        r.room_id == room_id
            && Some(r.id) != exclude
            && r.status.is_active()
            && r.stay().overlaps(&stay)
    })
}

/// Availability check.
///
/// ## Errors
/// - `InvalidDateRange` if `check_out <= check_in`
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use hotel_core::availability::is_available;
/// use hotel_core::types::DateRange;
///
/// let d = |day| NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
/// assert!(is_available(&[], 1, DateRange::new(d(1), d(4)), None).unwrap());
/// ```
pub fn is_available(
    existing: &[Reservation],
    room_id: i64,
    stay: DateRange,
    exclude: Option<i64>,
) -> CoreResult<bool> {
    validate_stay(stay)?;
    Ok(find_conflict(existing, room_id, stay, exclude).is_none())
}

/// Like [`is_available`], but turns a conflict into `RoomUnavailable`.
pub fn ensure_available(
    existing: &[Reservation],
    room_id: i64,
    stay: DateRange,
    exclude: Option<i64>,
) -> CoreResult<()> {
    validate_stay(stay)?;
    match find_conflict(existing, room_id, stay, exclude) {
        Some(conflict) => Err(CoreError::RoomUnavailable {
            room_id,
            conflicting: conflict.confirmation_code.clone(),
        }),
        None => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
