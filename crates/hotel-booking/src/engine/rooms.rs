//! Room-State Coordinator use-cases: direct status requests, maintenance
//! events and the available-rooms search.

use chrono::NaiveDate;
use sqlx::SqliteConnection;
use tracing::info;

use hotel_core::availability::find_conflict;
use hotel_core::room_state::{guard_manual_change, MaintenanceEvent, RoomEvent};
use hotel_core::validation::validate_stay;
use hotel_core::{CoreError, DateRange, Room, RoomStatus};
use hotel_db::repository::{ReservationRepository, RoomRepository};

use super::{apply_room_event, fetch_room, rejected, BookingEngine};
use crate::error::BookingResult;

impl BookingEngine {
    pub async fn get_room(&self, room_id: i64) -> BookingResult<Room> {
        Ok(self
            .db
            .rooms()
            .get_by_id(room_id)
            .await?
            .ok_or(CoreError::RoomNotFound(room_id))?)
    }

    /// Active AVAILABLE or CLEANING rooms with no active reservation
    /// overlapping `[check_in, check_out)`.
    pub async fn list_available_rooms(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> BookingResult<Vec<Room>> {
        let stay = DateRange::new(check_in, check_out);
        validate_stay(stay)?;

        let mut conn = self.db.pool().acquire().await?;
        let rooms = RoomRepository::find_bookable(&mut conn).await?;
        let blocking = ReservationRepository::find_blocking_in_range(&mut conn, stay).await?;

        Ok(rooms
            .into_iter()
            .filter(|room| find_conflict(&blocking, room.id, stay, None).is_none())
            .collect())
    }

    /// A direct status request (housekeeping, front desk).
    ///
    /// ## Errors
    /// - `RoomHasActiveStay` when moving an OCCUPIED room while a guest is
    ///   checked in to it; check-out and cancellation are the ways out
    pub async fn change_room_status(&self, room_id: i64, status: RoomStatus) -> BookingResult<Room> {
        let _room = self.room_locks.lock(room_id).await;

        let mut tx = self.begin_write().await?;
        let (room, previous) = change_status_tx(&mut tx, room_id, status)
            .await
            .map_err(|e| rejected("change_room_status", e))?;
        tx.commit().await?;

        info!(room = %room.room_number, from = ?previous, to = ?room.status, "Room status changed");
        Ok(room)
    }

    /// Feeds a maintenance ticket event into the room's state.
    ///
    /// EMERGENCY and URGENT reports take the room out of use whatever its
    /// current status.
    pub async fn apply_maintenance_event(
        &self,
        room_id: i64,
        event: MaintenanceEvent,
    ) -> BookingResult<Room> {
        let _room = self.room_locks.lock(room_id).await;

        let mut tx = self.begin_write().await?;
        let (room, previous) = maintenance_tx(&mut tx, room_id, event)
            .await
            .map_err(|e| rejected("apply_maintenance_event", e))?;
        tx.commit().await?;

        if room.status != previous {
            info!(room = %room.room_number, from = ?previous, to = ?room.status, ?event, "Room status changed");
        }
        Ok(room)
    }
}

/// Returns the updated room and its status before the change.
async fn change_status_tx(
    conn: &mut SqliteConnection,
    room_id: i64,
    status: RoomStatus,
) -> BookingResult<(Room, RoomStatus)> {
    let mut room = fetch_room(conn, room_id).await?;
    let previous = room.status;

    let in_house = ReservationRepository::has_checked_in(conn, room_id).await?;
    guard_manual_change(room.id, room.status, status, in_house)?;

    if status != previous {
        RoomRepository::update_status(conn, room.id, status).await?;
        room.status = status;
    }

    Ok((room, previous))
}

async fn maintenance_tx(
    conn: &mut SqliteConnection,
    room_id: i64,
    event: MaintenanceEvent,
) -> BookingResult<(Room, RoomStatus)> {
    let mut room = fetch_room(conn, room_id).await?;
    let previous = room.status;

    if let Some(next) = apply_room_event(conn, &room, RoomEvent::Maintenance(event)).await? {
        room.status = next;
    }

    Ok((room, previous))
}
