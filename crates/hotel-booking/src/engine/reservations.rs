//! Reservation lifecycle: availability, booking, changes, check-in/out,
//! cancellation, no-show and deletion.

use chrono::NaiveDate;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use hotel_core::availability::{ensure_available, is_available};
use hotel_core::pricing::{price_stay, PricingConfig};
use hotel_core::reservation::{self, NewReservation, ReservationPatch};
use hotel_core::room_state::RoomEvent;
use hotel_core::validation::{
    ensure_capacity, validate_code, validate_guests, validate_stay, validate_text,
};
use hotel_core::{CoreError, DateRange, Reservation, ReservationStatus, CONFIRMATION_CODE_LEN};
use hotel_db::repository::{PaymentRepository, ReservationRepository};

use super::{
    apply_room_event, fetch_guest, fetch_reservation, fetch_room, fetch_room_type, now, rejected,
    unique_confirmation_code, BookingEngine,
};
use crate::error::BookingResult;

const MAX_NOTE_LEN: usize = 1000;

impl BookingEngine {
    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether `room_id` is free for `[check_in, check_out)`, ignoring
    /// `exclude` (the reservation being rescheduled).
    ///
    /// A snapshot answer: only [`create_reservation`](Self::create_reservation)
    /// and [`update_reservation`](Self::update_reservation) hold the room lock
    /// across check and write.
    pub async fn check_availability(
        &self,
        room_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
        exclude: Option<i64>,
    ) -> BookingResult<bool> {
        let stay = DateRange::new(check_in, check_out);
        validate_stay(stay)?;

        let mut conn = self.db.pool().acquire().await?;
        fetch_room(&mut conn, room_id).await?;
        let blocking = ReservationRepository::find_blocking(&mut conn, room_id, stay).await?;

        Ok(is_available(&blocking, room_id, stay, exclude)?)
    }

    pub async fn get_reservation(&self, id: i64) -> BookingResult<Reservation> {
        Ok(self
            .db
            .reservations()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ReservationNotFound(id.to_string()))?)
    }

    /// Looks a reservation up by its public confirmation code.
    pub async fn get_reservation_by_code(&self, code: &str) -> BookingResult<Reservation> {
        let code = code.trim().to_ascii_uppercase();
        validate_code("confirmation_code", &code, "", CONFIRMATION_CODE_LEN)?;

        let found = self.db.reservations().get_by_code(&code).await?;
        Ok(found.ok_or(CoreError::ReservationNotFound(code))?)
    }

    pub async fn list_reservations_for_room(&self, room_id: i64) -> BookingResult<Vec<Reservation>> {
        Ok(self.db.reservations().list_for_room(room_id).await?)
    }

    // =========================================================================
    // Booking
    // =========================================================================

    /// Books a room. The new reservation is PENDING until money arrives.
    ///
    /// ## Errors
    /// - `InvalidDateRange`, `CapacityExceeded`, `Validation`
    /// - `GuestNotFound`, `RoomNotFound`, `RoomInactive`
    /// - `RoomUnavailable` if an active reservation overlaps the stay
    pub async fn create_reservation(&self, request: NewReservation) -> BookingResult<Reservation> {
        let _room = self.room_locks.lock(request.room_id).await;

        let mut tx = self.begin_write().await?;
        let reservation = create_tx(&mut tx, &request, &self.pricing)
            .await
            .map_err(|e| rejected("create_reservation", e))?;
        tx.commit().await?;

        info!(
            code = %reservation.confirmation_code,
            room_id = reservation.room_id,
            check_in = %reservation.check_in_date,
            check_out = %reservation.check_out_date,
            total = %reservation.currency.format(reservation.total()),
            "Reservation created"
        );
        Ok(reservation)
    }

    /// Applies an explicit patch: new dates, new party size, new special
    /// requests, an extra note. An empty patch returns the reservation as is.
    pub async fn update_reservation(
        &self,
        id: i64,
        patch: ReservationPatch,
    ) -> BookingResult<Reservation> {
        if patch.is_empty() {
            return self.get_reservation(id).await;
        }

        let _lock = self.lock_stay(id).await?;

        let mut tx = self.begin_write().await?;
        let reservation = update_tx(&mut tx, id, patch, &self.pricing)
            .await
            .map_err(|e| rejected("update_reservation", e))?;
        tx.commit().await?;

        info!(
            code = %reservation.confirmation_code,
            check_in = %reservation.check_in_date,
            check_out = %reservation.check_out_date,
            balance = %reservation.currency.format(reservation.balance()),
            "Reservation updated"
        );
        Ok(reservation)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// CONFIRMED → CHECKED_IN; the room becomes OCCUPIED.
    pub async fn check_in(&self, id: i64, notes: Option<String>) -> BookingResult<Reservation> {
        let _lock = self.lock_stay(id).await?;

        let mut tx = self.begin_write().await?;
        let reservation = check_in_tx(&mut tx, id, notes.as_deref())
            .await
            .map_err(|e| rejected("check_in", e))?;
        tx.commit().await?;

        info!(code = %reservation.confirmation_code, room_id = reservation.room_id, "Guest checked in");
        Ok(reservation)
    }

    /// CHECKED_IN → CHECKED_OUT once the balance is settled; the room goes
    /// to CLEANING.
    pub async fn check_out(&self, id: i64, notes: Option<String>) -> BookingResult<Reservation> {
        let _lock = self.lock_stay(id).await?;

        let mut tx = self.begin_write().await?;
        let reservation = check_out_tx(&mut tx, id, notes.as_deref())
            .await
            .map_err(|e| rejected("check_out", e))?;
        tx.commit().await?;

        info!(code = %reservation.confirmation_code, room_id = reservation.room_id, "Guest checked out");
        Ok(reservation)
    }

    /// Cancels a PENDING, CONFIRMED or CHECKED_IN reservation. A guest who
    /// was in the room leaves it in CLEANING.
    pub async fn cancel_reservation(
        &self,
        id: i64,
        reason: Option<String>,
    ) -> BookingResult<Reservation> {
        let _lock = self.lock_stay(id).await?;

        let mut tx = self.begin_write().await?;
        let reservation = cancel_tx(&mut tx, id, reason)
            .await
            .map_err(|e| rejected("cancel_reservation", e))?;
        tx.commit().await?;

        info!(
            code = %reservation.confirmation_code,
            reason = ?reservation.cancellation_reason,
            "Reservation cancelled"
        );
        Ok(reservation)
    }

    /// PENDING / CONFIRMED → NO_SHOW, once `as_of` has reached the arrival
    /// date. Frees the room's dates.
    pub async fn mark_no_show(&self, id: i64, as_of: NaiveDate) -> BookingResult<Reservation> {
        let _lock = self.lock_stay(id).await?;

        let mut tx = self.begin_write().await?;
        let reservation = no_show_tx(&mut tx, id, as_of)
            .await
            .map_err(|e| rejected("mark_no_show", e))?;
        tx.commit().await?;

        info!(code = %reservation.confirmation_code, %as_of, "Reservation marked no-show");
        Ok(reservation)
    }

    /// Hard-deletes a PENDING or CANCELLED reservation with no payments.
    pub async fn delete_reservation(&self, id: i64) -> BookingResult<()> {
        let _lock = self.lock_stay(id).await?;

        let mut tx = self.begin_write().await?;
        let code = delete_tx(&mut tx, id)
            .await
            .map_err(|e| rejected("delete_reservation", e))?;
        tx.commit().await?;

        info!(code = %code, "Reservation deleted");
        Ok(())
    }
}

// =============================================================================
// Transaction Bodies
// =============================================================================

fn validate_note(field: &str, value: Option<&str>) -> BookingResult<()> {
    if let Some(value) = value {
        validate_text(field, value, MAX_NOTE_LEN)?;
    }
    Ok(())
}

async fn create_tx(
    conn: &mut SqliteConnection,
    request: &NewReservation,
    pricing: &PricingConfig,
) -> BookingResult<Reservation> {
    let stay = request.stay();
    validate_stay(stay)?;
    validate_guests(request.num_adults, request.num_children)?;
    validate_note("special_requests", request.special_requests.as_deref())?;
    validate_note("notes", request.notes.as_deref())?;

    fetch_guest(conn, request.guest_id).await?;
    let room = fetch_room(conn, request.room_id).await?;
    if !room.is_active {
        return Err(CoreError::RoomInactive(room.id).into());
    }
    let room_type = fetch_room_type(conn, room.room_type_id).await?;
    ensure_capacity(room_type.capacity, request.num_adults, request.num_children)?;

    let blocking = ReservationRepository::find_blocking(conn, room.id, stay).await?;
    ensure_available(&blocking, room.id, stay, None)?;

    let quote = price_stay(&room_type, request.currency, stay, pricing)?;
    let code = unique_confirmation_code(conn).await?;

    let mut reservation = reservation::draft(request, code, &quote, now());
    reservation.id = ReservationRepository::insert(conn, &reservation).await?;

    Ok(reservation)
}

async fn update_tx(
    conn: &mut SqliteConnection,
    id: i64,
    patch: ReservationPatch,
    pricing: &PricingConfig,
) -> BookingResult<Reservation> {
    let mut reservation = fetch_reservation(conn, id).await?;
    reservation.ensure_modifiable()?;
    validate_note("special_requests", patch.special_requests.as_deref())?;
    validate_note("notes", patch.notes.as_deref())?;

    let now = now();

    if patch.guests.is_some() || patch.reschedule.is_some() {
        let room = fetch_room(conn, reservation.room_id).await?;
        let room_type = fetch_room_type(conn, room.room_type_id).await?;

        if let Some(guests) = patch.guests {
            reservation.change_guests(guests, room_type.capacity, now)?;
        }

        if let Some(command) = patch.reschedule {
            let stay = command.stay();
            validate_stay(stay)?;

            let blocking = ReservationRepository::find_blocking(conn, room.id, stay).await?;
            ensure_available(&blocking, room.id, stay, Some(reservation.id))?;

            let quote = price_stay(&room_type, reservation.currency, stay, pricing)?;
            reservation.reschedule(command, &quote, now)?;
        }
    }

    reservation.annotate(patch.special_requests, patch.notes, now)?;
    ReservationRepository::update(conn, &reservation).await?;

    Ok(reservation)
}

async fn check_in_tx(
    conn: &mut SqliteConnection,
    id: i64,
    notes: Option<&str>,
) -> BookingResult<Reservation> {
    validate_note("notes", notes)?;

    let mut reservation = fetch_reservation(conn, id).await?;
    reservation.check_in(notes, now())?;
    ReservationRepository::update(conn, &reservation).await?;

    let room = fetch_room(conn, reservation.room_id).await?;
    apply_room_event(conn, &room, RoomEvent::GuestCheckedIn).await?;

    Ok(reservation)
}

async fn check_out_tx(
    conn: &mut SqliteConnection,
    id: i64,
    notes: Option<&str>,
) -> BookingResult<Reservation> {
    validate_note("notes", notes)?;

    let mut reservation = fetch_reservation(conn, id).await?;
    reservation.check_out(notes, now())?;
    ReservationRepository::update(conn, &reservation).await?;

    release_room(conn, reservation.room_id, RoomEvent::GuestCheckedOut).await?;

    Ok(reservation)
}

async fn cancel_tx(
    conn: &mut SqliteConnection,
    id: i64,
    reason: Option<String>,
) -> BookingResult<Reservation> {
    validate_note("cancellation_reason", reason.as_deref())?;

    let mut reservation = fetch_reservation(conn, id).await?;
    let previous = reservation.cancel(reason, now())?;
    ReservationRepository::update(conn, &reservation).await?;

    let event = RoomEvent::StayCancelled {
        was_checked_in: previous == ReservationStatus::CheckedIn,
    };
    release_room(conn, reservation.room_id, event).await?;

    Ok(reservation)
}

/// Applies a departure event to the room, unless another guest is still
/// checked in to it (same-day turnover where the next guest arrived first).
///
/// Runs after the departing reservation has been written, so it no longer
/// counts as in house.
async fn release_room(
    conn: &mut SqliteConnection,
    room_id: i64,
    event: RoomEvent,
) -> BookingResult<()> {
    let room = fetch_room(conn, room_id).await?;

    if ReservationRepository::has_checked_in(conn, room.id).await? {
        debug!(room = %room.room_number, ?event, "Another guest in house, room stays occupied");
        return Ok(());
    }

    apply_room_event(conn, &room, event).await?;
    Ok(())
}

async fn no_show_tx(
    conn: &mut SqliteConnection,
    id: i64,
    as_of: NaiveDate,
) -> BookingResult<Reservation> {
    let mut reservation = fetch_reservation(conn, id).await?;
    reservation.mark_no_show(as_of, now())?;
    ReservationRepository::update(conn, &reservation).await?;

    Ok(reservation)
}

async fn delete_tx(conn: &mut SqliteConnection, id: i64) -> BookingResult<String> {
    let reservation = fetch_reservation(conn, id).await?;
    reservation.ensure_deletable()?;

    if PaymentRepository::count_for_reservation(conn, id).await? > 0 {
        return Err(CoreError::ReservationHasPayments(reservation.confirmation_code).into());
    }

    ReservationRepository::delete(conn, id).await?;
    Ok(reservation.confirmation_code)
}
