//! # Booking Engine
//!
//! One method per use-case. Each method takes its locks, opens a single
//! SQLite transaction, reads the rows it needs inside that transaction,
//! runs the hotel-core rules, writes and commits.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  engine.check_in(reservation_id)                                        │
//! │                                                                         │
//! │  1. lock room ──► lock reservation          (LockRegistry, in order)    │
//! │  2. BEGIN IMMEDIATE                         (SQLite writer lock)        │
//! │  3. read reservation + room                 (inside the transaction)    │
//! │  4. Reservation::check_in()                 (hotel-core, pure)          │
//! │  5. next_status(room, GuestCheckedIn)       (hotel-core, pure)          │
//! │  6. UPDATE reservations; UPDATE rooms                                   │
//! │  7. COMMIT ──► info!                                                    │
//! │                                                                         │
//! │  Any error in 3-6 drops the transaction: neither row changes.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lock Order
//! room → reservation → invoice → invoice numbering. Operations that start
//! from a reservation or payment id read the (immutable) room / reservation
//! id first, take the locks, then re-read everything inside the
//! transaction.
//!
//! Two operations on different rooms or reservations never share a lock.

mod invoices;
mod payments;
mod reservations;
mod rooms;

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqliteConnection, Transaction};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use hotel_core::pricing::PricingConfig;
use hotel_core::room_state::{next_status, RoomEvent};
use hotel_core::{CoreError, Guest, Invoice, Reservation, Room, RoomStatus, RoomType};
use hotel_db::repository::{
    GuestRepository, InvoiceRepository, PaymentRepository, ReservationRepository, RoomRepository,
    RoomTypeRepository,
};
use hotel_db::{Database, DbError};

use crate::config::{HotelConfig, InvoicingSettings};
use crate::error::{BookingError, BookingResult, ErrorCode};
use crate::locks::LockRegistry;

/// Attempts at drawing an unused random code before giving up.
const MAX_CODE_ATTEMPTS: usize = 5;

/// The Booking & Ledger Consistency Core.
///
/// Share it behind an `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct BookingEngine {
    db: Database,
    pricing: PricingConfig,
    invoicing: InvoicingSettings,

    room_locks: LockRegistry,
    reservation_locks: LockRegistry,
    invoice_locks: LockRegistry,
    /// Held while a new invoice number is allocated and inserted.
    invoice_numbering: Mutex<()>,
}

/// Guards for a reservation and the room it occupies.
struct StayLock {
    _room: OwnedMutexGuard<()>,
    _reservation: OwnedMutexGuard<()>,
}

impl BookingEngine {
    pub fn new(db: Database, config: &HotelConfig) -> Self {
        BookingEngine {
            db,
            pricing: config.pricing_config(),
            invoicing: config.invoicing.clone(),
            room_locks: LockRegistry::new(),
            reservation_locks: LockRegistry::new(),
            invoice_locks: LockRegistry::new(),
            invoice_numbering: Mutex::new(()),
        }
    }

    /// Connects to the configured database (running migrations) and builds
    /// an engine on it.
    pub async fn open(config: &HotelConfig) -> BookingResult<Self> {
        config.validate()?;
        let db = Database::new(config.db_config()).await?;

        info!(
            tax_rate_bps = config.pricing.tax_rate_bps,
            eur_per_usd_bps = config.pricing.eur_per_usd_bps,
            "Booking engine ready"
        );

        Ok(Self::new(db, config))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    // =========================================================================
    // Locking
    // =========================================================================

    /// Opens a transaction that holds SQLite's writer lock from the start.
    ///
    /// A deferred `BEGIN` upgrades to a writer on its first write; when two
    /// connections do that at once SQLite fails one with `SQLITE_BUSY`
    /// without consulting `busy_timeout`. `BEGIN IMMEDIATE` waits instead.
    async fn begin_write(&self) -> BookingResult<Transaction<'static, Sqlite>> {
        Ok(self.db.pool().begin_with("BEGIN IMMEDIATE").await?)
    }

    /// Locks the room of `reservation_id`, then the reservation itself.
    async fn lock_stay(&self, reservation_id: i64) -> BookingResult<StayLock> {
        let reservation = self
            .db
            .reservations()
            .get_by_id(reservation_id)
            .await?
            .ok_or_else(|| CoreError::ReservationNotFound(reservation_id.to_string()))?;

        let room = self.room_locks.lock(reservation.room_id).await;
        let reservation = self.reservation_locks.lock(reservation_id).await;

        Ok(StayLock {
            _room: room,
            _reservation: reservation,
        })
    }
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// Logs an operation that did not go through and hands the error back.
fn rejected(action: &'static str, err: BookingError) -> BookingError {
    match err.code() {
        ErrorCode::DatabaseError | ErrorCode::ConfigError => {
            error!(action, error = %err, "Operation failed")
        }
        code => warn!(action, ?code, error = %err, "Operation rejected"),
    }
    err
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

async fn fetch_room(conn: &mut SqliteConnection, id: i64) -> BookingResult<Room> {
    Ok(RoomRepository::find(conn, id)
        .await?
        .ok_or(CoreError::RoomNotFound(id))?)
}

async fn fetch_room_type(conn: &mut SqliteConnection, id: i64) -> BookingResult<RoomType> {
    Ok(RoomTypeRepository::find(conn, id)
        .await?
        .ok_or(CoreError::RoomTypeNotFound(id))?)
}

async fn fetch_guest(conn: &mut SqliteConnection, id: i64) -> BookingResult<Guest> {
    Ok(GuestRepository::find(conn, id)
        .await?
        .ok_or(CoreError::GuestNotFound(id))?)
}

async fn fetch_reservation(conn: &mut SqliteConnection, id: i64) -> BookingResult<Reservation> {
    Ok(ReservationRepository::find(conn, id)
        .await?
        .ok_or_else(|| CoreError::ReservationNotFound(id.to_string()))?)
}

async fn fetch_invoice(conn: &mut SqliteConnection, id: i64) -> BookingResult<Invoice> {
    Ok(InvoiceRepository::find(conn, id)
        .await?
        .ok_or(CoreError::InvoiceNotFound(id))?)
}

/// Moves `room` along `event`, if the event changes its status.
async fn apply_room_event(
    conn: &mut SqliteConnection,
    room: &Room,
    event: RoomEvent,
) -> BookingResult<Option<RoomStatus>> {
    let Some(next) = next_status(room.status, event) else {
        debug!(room = %room.room_number, ?event, "Room status unchanged");
        return Ok(None);
    };

    RoomRepository::update_status(conn, room.id, next).await?;
    debug!(room = %room.room_number, from = ?room.status, to = ?next, ?event, "Room status staged");
    Ok(Some(next))
}

/// A confirmation code no reservation uses yet.
///
/// Codes are UNIQUE in the schema too; checking first avoids failing the
/// whole transaction on a collision.
async fn unique_confirmation_code(conn: &mut SqliteConnection) -> BookingResult<String> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = ReservationRepository::generate_confirmation_code();
        if !ReservationRepository::code_exists(conn, &code).await? {
            return Ok(code);
        }
        debug!(code = %code, "Confirmation code taken, drawing another");
    }

    Err(DbError::duplicate("confirmation_code", "exhausted attempts").into())
}

async fn unique_payment_code(conn: &mut SqliteConnection) -> BookingResult<String> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = PaymentRepository::generate_payment_code();
        if !PaymentRepository::code_exists(conn, &code).await? {
            return Ok(code);
        }
        debug!(code = %code, "Payment code taken, drawing another");
    }

    Err(DbError::duplicate("payment_code", "exhausted attempts").into())
}
