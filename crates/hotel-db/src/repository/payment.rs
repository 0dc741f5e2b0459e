//! # Payment Repository

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::random_code;
use hotel_core::{Payment, PAYMENT_CODE_LEN};

/// Repository for payment operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Payment>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    pub async fn list_for_reservation(&self, reservation_id: i64) -> DbResult<Vec<Payment>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_for_reservation(&mut conn, reservation_id).await
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(payment)
    }

    /// Payments of a reservation in the order they were made.
    pub async fn find_for_reservation(
        conn: &mut SqliteConnection,
        reservation_id: i64,
    ) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE reservation_id = ?1 ORDER BY payment_date, id",
        )
        .bind(reservation_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(payments)
    }

    pub async fn count_for_reservation(
        conn: &mut SqliteConnection,
        reservation_id: i64,
    ) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE reservation_id = ?1")
            .bind(reservation_id)
            .fetch_one(&mut *conn)
            .await?;

        Ok(count)
    }

    pub async fn code_exists(conn: &mut SqliteConnection, code: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE payment_code = ?1")
            .bind(code)
            .fetch_one(&mut *conn)
            .await?;

        Ok(count > 0)
    }

    pub async fn insert(conn: &mut SqliteConnection, p: &Payment) -> DbResult<i64> {
        debug!(code = %p.payment_code, amount = p.amount_cents, "Inserting payment");

        let result = sqlx::query(
            r#"
            INSERT INTO payments (
                payment_code, reservation_id, amount_cents, currency, method, status,
                reference_number, bank_name, notes, payment_date, refunded_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&p.payment_code)
        .bind(p.reservation_id)
        .bind(p.amount_cents)
        .bind(p.currency)
        .bind(p.method)
        .bind(p.status)
        .bind(&p.reference_number)
        .bind(&p.bank_name)
        .bind(&p.notes)
        .bind(p.payment_date)
        .bind(p.refunded_at)
        .bind(p.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Persists a status change (settle, fail, refund).
    pub async fn update_status(conn: &mut SqliteConnection, p: &Payment) -> DbResult<()> {
        debug!(code = %p.payment_code, status = ?p.status, "Updating payment status");

        let result = sqlx::query("UPDATE payments SET status = ?2, refunded_at = ?3 WHERE id = ?1")
            .bind(p.id)
            .bind(p.status)
            .bind(p.refunded_at)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Payment", p.id));
        }

        Ok(())
    }

    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM payments WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Payment", id));
        }

        Ok(())
    }

    /// `PAY-` followed by ten uppercase hex characters.
    pub fn generate_payment_code() -> String {
        format!("PAY-{}", random_code(PAYMENT_CODE_LEN))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
