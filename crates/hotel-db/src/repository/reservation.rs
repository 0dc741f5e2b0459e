//! # Reservation Repository
//!
//! Persistence for reservations, including the overlap queries the booking
//! engine runs inside its transactions.
//!
//! ## Overlap Query
//! ```text
//! blocking(room, [in, out)) :=
//!     status IN (pending, confirmed, checked_in)
//!     AND check_in_date  < out
//!     AND check_out_date > in
//! ```
//! Dates are stored as `YYYY-MM-DD` text, so string comparison is date
//! comparison.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::random_code;
use hotel_core::{DateRange, Reservation, CONFIRMATION_CODE_LEN};

/// Repository for reservation operations.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Reservation>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Reservation>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_by_code(&mut conn, code).await
    }

    /// All reservations of a room, oldest stay first.
    pub async fn list_for_room(&self, room_id: i64) -> DbResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE room_id = ?1 ORDER BY check_in_date, id",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reservations)
    }

    // -------------------------------------------------------------------------
    // Connection-level operations (usable inside a transaction)
    // -------------------------------------------------------------------------

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Reservation>> {
        let reservation =
            sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(reservation)
    }

    pub async fn find_by_code(
        conn: &mut SqliteConnection,
        code: &str,
    ) -> DbResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE confirmation_code = ?1",
        )
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(reservation)
    }

    pub async fn code_exists(conn: &mut SqliteConnection, code: &str) -> DbResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reservations WHERE confirmation_code = ?1")
                .bind(code)
                .fetch_one(&mut *conn)
                .await?;

        Ok(count > 0)
    }

    /// Active reservations of `room_id` whose nights overlap `stay`.
    pub async fn find_blocking(
        conn: &mut SqliteConnection,
        room_id: i64,
        stay: DateRange,
    ) -> DbResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE room_id = ?1
              AND status IN ('pending', 'confirmed', 'checked_in')
              AND check_in_date < ?3
              AND check_out_date > ?2
            ORDER BY check_in_date
            "#,
        )
        .bind(room_id)
        .bind(stay.check_in)
        .bind(stay.check_out)
        .fetch_all(&mut *conn)
        .await?;

        Ok(reservations)
    }

    /// Active reservations of any room whose nights overlap `stay`.
    pub async fn find_blocking_in_range(
        conn: &mut SqliteConnection,
        stay: DateRange,
    ) -> DbResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE status IN ('pending', 'confirmed', 'checked_in')
              AND check_in_date < ?2
              AND check_out_date > ?1
            "#,
        )
        .bind(stay.check_in)
        .bind(stay.check_out)
        .fetch_all(&mut *conn)
        .await?;

        Ok(reservations)
    }

    /// Whether a guest is currently checked in to `room_id`.
    pub async fn has_checked_in(conn: &mut SqliteConnection, room_id: i64) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations WHERE room_id = ?1 AND status = 'checked_in'",
        )
        .bind(room_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count > 0)
    }

    pub async fn insert(conn: &mut SqliteConnection, r: &Reservation) -> DbResult<i64> {
        debug!(code = %r.confirmation_code, room_id = r.room_id, "Inserting reservation");

        let result = sqlx::query(
            r#"
            INSERT INTO reservations (
                confirmation_code, guest_id, room_id,
                check_in_date, check_out_date, actual_check_in, actual_check_out,
                num_adults, num_children, status, currency,
                price_per_night_cents, total_nights, subtotal_cents,
                tax_rate_bps, tax_cents, total_cents,
                paid_cents, balance_cents, is_paid,
                special_requests, notes, cancellation_reason, created_by,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26
            )
            "#,
        )
        .bind(&r.confirmation_code)
        .bind(r.guest_id)
        .bind(r.room_id)
        .bind(r.check_in_date)
        .bind(r.check_out_date)
        .bind(r.actual_check_in)
        .bind(r.actual_check_out)
        .bind(r.num_adults)
        .bind(r.num_children)
        .bind(r.status)
        .bind(r.currency)
        .bind(r.price_per_night_cents)
        .bind(r.total_nights)
        .bind(r.subtotal_cents)
        .bind(r.tax_rate_bps)
        .bind(r.tax_cents)
        .bind(r.total_cents)
        .bind(r.paid_cents)
        .bind(r.balance_cents)
        .bind(r.is_paid)
        .bind(&r.special_requests)
        .bind(&r.notes)
        .bind(&r.cancellation_reason)
        .bind(&r.created_by)
        .bind(r.created_at)
        .bind(r.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Writes every mutable column of `r` back to its row.
    pub async fn update(conn: &mut SqliteConnection, r: &Reservation) -> DbResult<()> {
        debug!(code = %r.confirmation_code, status = %r.status, "Updating reservation");

        let result = sqlx::query(
            r#"
            UPDATE reservations SET
                check_in_date = ?2,
                check_out_date = ?3,
                actual_check_in = ?4,
                actual_check_out = ?5,
                num_adults = ?6,
                num_children = ?7,
                status = ?8,
                price_per_night_cents = ?9,
                total_nights = ?10,
                subtotal_cents = ?11,
                tax_rate_bps = ?12,
                tax_cents = ?13,
                total_cents = ?14,
                paid_cents = ?15,
                balance_cents = ?16,
                is_paid = ?17,
                special_requests = ?18,
                notes = ?19,
                cancellation_reason = ?20,
                updated_at = ?21
            WHERE id = ?1
            "#,
        )
        .bind(r.id)
        .bind(r.check_in_date)
        .bind(r.check_out_date)
        .bind(r.actual_check_in)
        .bind(r.actual_check_out)
        .bind(r.num_adults)
        .bind(r.num_children)
        .bind(r.status)
        .bind(r.price_per_night_cents)
        .bind(r.total_nights)
        .bind(r.subtotal_cents)
        .bind(r.tax_rate_bps)
        .bind(r.tax_cents)
        .bind(r.total_cents)
        .bind(r.paid_cents)
        .bind(r.balance_cents)
        .bind(r.is_paid)
        .bind(&r.special_requests)
        .bind(&r.notes)
        .bind(&r.cancellation_reason)
        .bind(r.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Reservation", &r.confirmation_code));
        }

        Ok(())
    }

    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
        debug!(id, "Deleting reservation");

        let result = sqlx::query("DELETE FROM reservations WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Reservation", id));
        }

        Ok(())
    }

    /// Generates a fresh confirmation code. Uniqueness is checked by the
    /// caller with [`Self::code_exists`].
    pub fn generate_confirmation_code() -> String {
        random_code(CONFIRMATION_CODE_LEN)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
