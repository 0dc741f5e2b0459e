//! # Reservation State Machine
//!
//! Legal lifecycle transitions of a [`Reservation`] and the command types
//! that drive them.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create ──► PENDING ──(first payment)──► CONFIRMED ──(check_in)──┐    │
//! │                 │  │                          │  │                 │    │
//! │                 │  └────(mark_no_show)────────┼──┴──► NO_SHOW      │    │
//! │                 │                             │                    ▼    │
//! │                 └───────(cancel)──────────────┴─────► CANCELLED  CHECKED_IN
//! │                                                           ▲          │  │
//! │                                                           └─(cancel)─┘  │
//! │                                                                      │  │
//! │                                           CHECKED_OUT ◄─(check_out)──┘  │
//! │                                                                         │
//! │   Guards:  check_in  needs paid > 0                                     │
//! │            check_out needs balance == 0                                 │
//! │            no_show   needs as_of >= check_in_date                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! CHECKED_OUT, CANCELLED and NO_SHOW are terminal. Room-status side effects
//! are decided by [`crate::room_state`]; this module only touches the
//! reservation record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ledger;
use crate::money::Money;
use crate::pricing::PriceBreakdown;
use crate::types::{Currency, DateRange, Reservation, ReservationStatus};
use crate::validation::validate_guests;

// =============================================================================
// Commands
// =============================================================================

/// Request to book a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReservation {
    pub guest_id: i64,
    pub room_id: i64,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub num_adults: i64,
    pub num_children: i64,
    pub currency: Currency,
    pub special_requests: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

impl NewReservation {
    pub fn stay(&self) -> DateRange {
        DateRange::new(self.check_in_date, self.check_out_date)
    }
}

/// Moves a reservation to new dates. Re-runs availability (excluding the
/// reservation itself) and re-prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescheduleCommand {
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
}

impl RescheduleCommand {
    pub fn stay(&self) -> DateRange {
        DateRange::new(self.check_in_date, self.check_out_date)
    }
}

/// Changes the party size. Re-checks room capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestCount {
    pub num_adults: i64,
    pub num_children: i64,
}

/// Explicit update of a reservation. Each field is one independent change
/// with its own rule; anything not listed here cannot be patched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservationPatch {
    pub reschedule: Option<RescheduleCommand>,
    pub guests: Option<GuestCount>,
    /// Replaces the special requests.
    pub special_requests: Option<String>,
    /// Appended to the existing notes.
    pub notes: Option<String>,
}

impl ReservationPatch {
    pub fn is_empty(&self) -> bool {
        self.reschedule.is_none()
            && self.guests.is_none()
            && self.special_requests.is_none()
            && self.notes.is_none()
    }
}

// =============================================================================
// Transition Table
// =============================================================================

/// Whether `from → to` is a legal lifecycle transition.
pub fn can_transition(from: ReservationStatus, to: ReservationStatus) -> bool {
    use ReservationStatus::*;

    matches!(
        (from, to),
        (Pending, Confirmed)
            | (Pending, Cancelled)
            | (Pending, NoShow)
            | (Confirmed, CheckedIn)
            | (Confirmed, Cancelled)
            | (Confirmed, NoShow)
            | (CheckedIn, CheckedOut)
            | (CheckedIn, Cancelled)
    )
}

/// Builds a new PENDING reservation from a priced request.
///
/// The caller supplies the id-less record's confirmation code; `id` is 0
/// until persisted.
pub fn draft(
    request: &NewReservation,
    confirmation_code: String,
    quote: &PriceBreakdown,
    now: DateTime<Utc>,
) -> Reservation {
    let mut reservation = Reservation {
        id: 0,
        confirmation_code,
        guest_id: request.guest_id,
        room_id: request.room_id,
        check_in_date: request.check_in_date,
        check_out_date: request.check_out_date,
        actual_check_in: None,
        actual_check_out: None,
        num_adults: request.num_adults,
        num_children: request.num_children,
        status: ReservationStatus::Pending,
        currency: quote.currency,
        price_per_night_cents: 0,
        total_nights: 0,
        subtotal_cents: 0,
        tax_rate_bps: quote.tax_rate.bps(),
        tax_cents: 0,
        total_cents: 0,
        paid_cents: 0,
        balance_cents: 0,
        is_paid: false,
        special_requests: request.special_requests.clone(),
        notes: request.notes.clone(),
        cancellation_reason: None,
        created_by: request.created_by.clone(),
        created_at: now,
        updated_at: now,
    };
    reservation.apply_quote(quote);
    reservation
}

// =============================================================================
// Transitions
// =============================================================================

impl Reservation {
    fn transition(
        &mut self,
        to: ReservationStatus,
        action: &'static str,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        if !can_transition(self.status, to) {
            return Err(CoreError::WrongStatus {
                code: self.confirmation_code.clone(),
                current: self.status,
                action,
            });
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    /// Rejects changes to closed reservations.
    pub fn ensure_modifiable(&self) -> CoreResult<()> {
        if self.status.is_closed() {
            return Err(CoreError::ReservationClosed {
                code: self.confirmation_code.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    /// Writes a fresh price breakdown and re-derives the balance from the
    /// unchanged paid amount.
    pub fn apply_quote(&mut self, quote: &PriceBreakdown) {
        self.currency = quote.currency;
        self.price_per_night_cents = quote.price_per_night.cents();
        self.total_nights = quote.nights;
        self.subtotal_cents = quote.subtotal.cents();
        self.tax_rate_bps = quote.tax_rate.bps();
        self.tax_cents = quote.tax.cents();
        self.total_cents = quote.total.cents();
        ledger::settle(self);
    }

    /// Moves the stay to new dates with a new price.
    ///
    /// Availability must already have been checked by the caller with
    /// `exclude = Some(self.id)`.
    pub fn reschedule(
        &mut self,
        command: RescheduleCommand,
        quote: &PriceBreakdown,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.ensure_modifiable()?;
        self.check_in_date = command.check_in_date;
        self.check_out_date = command.check_out_date;
        self.apply_quote(quote);
        self.updated_at = now;
        Ok(())
    }

    /// Changes the party size after checking it against `capacity`.
    pub fn change_guests(
        &mut self,
        guests: GuestCount,
        capacity: i64,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.ensure_modifiable()?;
        validate_guests(guests.num_adults, guests.num_children)?;
        crate::validation::ensure_capacity(capacity, guests.num_adults, guests.num_children)?;
        self.num_adults = guests.num_adults;
        self.num_children = guests.num_children;
        self.updated_at = now;
        Ok(())
    }

    /// Replaces special requests and appends notes.
    pub fn annotate(
        &mut self,
        special_requests: Option<String>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.ensure_modifiable()?;
        if let Some(requests) = special_requests {
            self.special_requests = Some(requests);
        }
        if let Some(note) = notes {
            append_note(&mut self.notes, &note);
        }
        self.updated_at = now;
        Ok(())
    }

    /// PENDING → CONFIRMED once any money has been received.
    ///
    /// Returns `true` if the status changed.
    pub fn confirm_if_paid(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == ReservationStatus::Pending && self.paid_cents > 0 {
            self.status = ReservationStatus::Confirmed;
            self.updated_at = now;
            return true;
        }
        false
    }

    /// CONFIRMED → CHECKED_IN.
    ///
    /// ## Errors
    /// - `WrongStatus` unless CONFIRMED
    /// - `PaymentRequired` if nothing has been paid
    pub fn check_in(&mut self, notes: Option<&str>, now: DateTime<Utc>) -> CoreResult<()> {
        if self.status == ReservationStatus::Confirmed && self.paid_cents <= 0 {
            return Err(CoreError::PaymentRequired(self.confirmation_code.clone()));
        }
        self.transition(ReservationStatus::CheckedIn, "check in", now)?;
        self.actual_check_in = Some(now);
        if let Some(note) = notes {
            append_note(&mut self.notes, note);
        }
        Ok(())
    }

    /// CHECKED_IN → CHECKED_OUT.
    ///
    /// ## Errors
    /// - `WrongStatus` unless CHECKED_IN
    /// - `OutstandingBalance` if the balance is not zero
    pub fn check_out(&mut self, notes: Option<&str>, now: DateTime<Utc>) -> CoreResult<()> {
        if self.status == ReservationStatus::CheckedIn && self.balance_cents > 0 {
            return Err(CoreError::OutstandingBalance {
                code: self.confirmation_code.clone(),
                balance: Money::from_cents(self.balance_cents),
            });
        }
        self.transition(ReservationStatus::CheckedOut, "check out", now)?;
        self.actual_check_out = Some(now);
        if let Some(note) = notes {
            append_note(&mut self.notes, note);
        }
        Ok(())
    }

    /// PENDING / CONFIRMED / CHECKED_IN → CANCELLED.
    ///
    /// Returns the status the reservation had before, so the caller can
    /// release an occupied room.
    pub fn cancel(
        &mut self,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<ReservationStatus> {
        let previous = self.status;
        self.transition(ReservationStatus::Cancelled, "cancel", now)?;
        self.cancellation_reason = reason;
        Ok(previous)
    }

    /// PENDING / CONFIRMED → NO_SHOW once the arrival date has come.
    pub fn mark_no_show(&mut self, as_of: NaiveDate, now: DateTime<Utc>) -> CoreResult<()> {
        let awaiting_arrival = matches!(
            self.status,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        );
        if awaiting_arrival && as_of < self.check_in_date {
            return Err(CoreError::NoShowBeforeArrival {
                code: self.confirmation_code.clone(),
                check_in: self.check_in_date,
            });
        }
        self.transition(ReservationStatus::NoShow, "mark no-show", now)
    }

    /// Only PENDING and CANCELLED reservations may be deleted.
    pub fn ensure_deletable(&self) -> CoreResult<()> {
        match self.status {
            ReservationStatus::Pending | ReservationStatus::Cancelled => Ok(()),
            status => Err(CoreError::ReservationNotDeletable {
                code: self.confirmation_code.clone(),
                status,
            }),
        }
    }
}

/// Appends a line to an optional notes field.
fn append_note(notes: &mut Option<String>, note: &str) {
    let note = note.trim();
    if note.is_empty() {
        return;
    }
    match notes {
        Some(existing) if !existing.is_empty() => {
            existing.push('\n');
            existing.push_str(note);
        }
        _ => *notes = Some(note.to_string()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
