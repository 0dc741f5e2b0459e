//! Payment Ledger use-cases.
//!
//! Every operation that reads and rewrites `paid` / `balance` holds the
//! reservation's lock for the whole read-modify-write, so two payments
//! cannot both pass a stale balance check and two refunds of the same
//! payment cannot both succeed.

use sqlx::SqliteConnection;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info};

use hotel_core::ledger::{self, PaymentRemoval, PaymentRequest};
use hotel_core::validation::validate_text;
use hotel_core::{CoreError, Payment, PaymentStatus};
use hotel_db::repository::{PaymentRepository, ReservationRepository};

use super::{fetch_reservation, now, rejected, unique_payment_code, BookingEngine};
use crate::error::BookingResult;

const MAX_REFERENCE_LEN: usize = 100;

impl BookingEngine {
    /// Records money received against a reservation.
    ///
    /// The first payment of a PENDING reservation confirms it.
    ///
    /// ## Errors
    /// - `ReservationClosed` for cancelled, checked-out or no-show stays
    /// - `AmountExceedsBalance`, `CurrencyMismatch`, `Validation`
    pub async fn record_payment(
        &self,
        reservation_id: i64,
        request: PaymentRequest,
    ) -> BookingResult<Payment> {
        let _reservation = self.reservation_locks.lock(reservation_id).await;

        let mut tx = self.begin_write().await?;
        let (payment, confirmed) = record_tx(&mut tx, reservation_id, &request)
            .await
            .map_err(|e| rejected("record_payment", e))?;
        tx.commit().await?;

        info!(
            code = %payment.payment_code,
            reservation_id,
            amount = %payment.currency.format(payment.amount()),
            method = ?payment.method,
            "Payment recorded"
        );
        if confirmed {
            info!(reservation_id, "Reservation confirmed by first payment");
        }
        Ok(payment)
    }

    /// Registers a payment that has not cleared yet (e.g. a bank transfer
    /// awaiting confirmation). It has no effect on the balance until
    /// [`settle_payment`](Self::settle_payment).
    pub async fn record_pending_payment(
        &self,
        reservation_id: i64,
        request: PaymentRequest,
    ) -> BookingResult<Payment> {
        let _reservation = self.reservation_locks.lock(reservation_id).await;

        let mut tx = self.begin_write().await?;
        let payment = record_pending_tx(&mut tx, reservation_id, &request)
            .await
            .map_err(|e| rejected("record_pending_payment", e))?;
        tx.commit().await?;

        info!(
            code = %payment.payment_code,
            reservation_id,
            amount = %payment.currency.format(payment.amount()),
            "Pending payment registered"
        );
        Ok(payment)
    }

    /// PENDING → COMPLETED, applying the amount to the reservation exactly
    /// as [`record_payment`](Self::record_payment) would.
    pub async fn settle_payment(&self, payment_id: i64) -> BookingResult<Payment> {
        let _reservation = self.lock_payment(payment_id).await?;

        let mut tx = self.begin_write().await?;
        let (payment, confirmed) = settle_tx(&mut tx, payment_id)
            .await
            .map_err(|e| rejected("settle_payment", e))?;
        tx.commit().await?;

        info!(code = %payment.payment_code, "Pending payment settled");
        if confirmed {
            info!(reservation_id = payment.reservation_id, "Reservation confirmed by first payment");
        }
        Ok(payment)
    }

    /// PENDING → FAILED. The ledger is untouched.
    pub async fn fail_payment(&self, payment_id: i64) -> BookingResult<Payment> {
        let _reservation = self.lock_payment(payment_id).await?;

        let mut tx = self.begin_write().await?;
        let payment = fail_tx(&mut tx, payment_id)
            .await
            .map_err(|e| rejected("fail_payment", e))?;
        tx.commit().await?;

        info!(code = %payment.payment_code, "Payment marked failed");
        Ok(payment)
    }

    /// COMPLETED → REFUNDED, reversing the amount on the reservation.
    ///
    /// Allowed on closed reservations too: money can go back after
    /// check-out or cancellation.
    pub async fn refund_payment(&self, payment_id: i64) -> BookingResult<Payment> {
        let _reservation = self.lock_payment(payment_id).await?;

        let mut tx = self.begin_write().await?;
        let payment = refund_tx(&mut tx, payment_id)
            .await
            .map_err(|e| rejected("refund_payment", e))?;
        tx.commit().await?;

        info!(
            code = %payment.payment_code,
            amount = %payment.currency.format(payment.amount()),
            "Payment refunded"
        );
        Ok(payment)
    }

    /// Deletes a payment. PENDING and FAILED rows go directly; a COMPLETED
    /// payment is reversed like a refund first. REFUNDED payments stay.
    pub async fn delete_payment(&self, payment_id: i64) -> BookingResult<()> {
        let _reservation = self.lock_payment(payment_id).await?;

        let mut tx = self.begin_write().await?;
        let (code, plan) = delete_tx(&mut tx, payment_id)
            .await
            .map_err(|e| rejected("delete_payment", e))?;
        tx.commit().await?;

        info!(code = %code, ?plan, "Payment deleted");
        Ok(())
    }

    pub async fn get_payment(&self, payment_id: i64) -> BookingResult<Payment> {
        Ok(self
            .db
            .payments()
            .get_by_id(payment_id)
            .await?
            .ok_or(CoreError::PaymentNotFound(payment_id))?)
    }

    /// Payments of a reservation in the order they were made.
    pub async fn list_payments(&self, reservation_id: i64) -> BookingResult<Vec<Payment>> {
        Ok(self.db.payments().list_for_reservation(reservation_id).await?)
    }

    /// Locks the reservation a payment belongs to.
    async fn lock_payment(&self, payment_id: i64) -> BookingResult<OwnedMutexGuard<()>> {
        let payment = self.get_payment(payment_id).await?;
        Ok(self.reservation_locks.lock(payment.reservation_id).await)
    }
}

// =============================================================================
// Transaction Bodies
// =============================================================================

fn validate_request(request: &PaymentRequest) -> BookingResult<()> {
    for (field, value) in [
        ("reference_number", &request.reference_number),
        ("bank_name", &request.bank_name),
    ] {
        if let Some(value) = value {
            validate_text(field, value, MAX_REFERENCE_LEN)?;
        }
    }
    Ok(())
}

async fn fetch_payment(conn: &mut SqliteConnection, id: i64) -> BookingResult<Payment> {
    Ok(PaymentRepository::find(conn, id)
        .await?
        .ok_or(CoreError::PaymentNotFound(id))?)
}

/// Returns the new payment and whether the reservation got confirmed.
async fn record_tx(
    conn: &mut SqliteConnection,
    reservation_id: i64,
    request: &PaymentRequest,
) -> BookingResult<(Payment, bool)> {
    validate_request(request)?;

    let mut reservation = fetch_reservation(conn, reservation_id).await?;
    ledger::ensure_accepts_payment(&reservation, request.amount, request.currency)?;

    let now = now();
    ledger::apply_payment(&mut reservation, request.amount)?;
    let confirmed = reservation.confirm_if_paid(now);
    reservation.updated_at = now;
    ReservationRepository::update(conn, &reservation).await?;

    let code = unique_payment_code(conn).await?;
    let mut payment =
        ledger::new_payment(reservation.id, code, request, PaymentStatus::Completed, now);
    payment.id = PaymentRepository::insert(conn, &payment).await?;

    debug!(
        code = %payment.payment_code,
        paid = %reservation.paid(),
        balance = %reservation.balance(),
        is_paid = reservation.is_paid,
        "Ledger updated"
    );
    Ok((payment, confirmed))
}

async fn record_pending_tx(
    conn: &mut SqliteConnection,
    reservation_id: i64,
    request: &PaymentRequest,
) -> BookingResult<Payment> {
    validate_request(request)?;

    let reservation = fetch_reservation(conn, reservation_id).await?;
    ledger::ensure_accepts_payment(&reservation, request.amount, request.currency)?;

    let code = unique_payment_code(conn).await?;
    let mut payment =
        ledger::new_payment(reservation.id, code, request, PaymentStatus::Pending, now());
    payment.id = PaymentRepository::insert(conn, &payment).await?;

    Ok(payment)
}

async fn settle_tx(conn: &mut SqliteConnection, payment_id: i64) -> BookingResult<(Payment, bool)> {
    let mut payment = fetch_payment(conn, payment_id).await?;
    ledger::ensure_pending(&payment)?;

    let mut reservation = fetch_reservation(conn, payment.reservation_id).await?;
    ledger::ensure_accepts_payment(&reservation, payment.amount(), payment.currency)?;

    let now = now();
    ledger::apply_payment(&mut reservation, payment.amount())?;
    let confirmed = reservation.confirm_if_paid(now);
    reservation.updated_at = now;
    ReservationRepository::update(conn, &reservation).await?;

    payment.status = PaymentStatus::Completed;
    PaymentRepository::update_status(conn, &payment).await?;

    Ok((payment, confirmed))
}

async fn fail_tx(conn: &mut SqliteConnection, payment_id: i64) -> BookingResult<Payment> {
    let mut payment = fetch_payment(conn, payment_id).await?;
    ledger::ensure_pending(&payment)?;

    payment.status = PaymentStatus::Failed;
    PaymentRepository::update_status(conn, &payment).await?;

    Ok(payment)
}

async fn refund_tx(conn: &mut SqliteConnection, payment_id: i64) -> BookingResult<Payment> {
    let mut payment = fetch_payment(conn, payment_id).await?;
    let mut reservation = fetch_reservation(conn, payment.reservation_id).await?;

    let now = now();
    ledger::mark_refunded(&mut payment, now)?;
    ledger::reverse_payment(&mut reservation, payment.amount())?;
    reservation.updated_at = now;

    ReservationRepository::update(conn, &reservation).await?;
    PaymentRepository::update_status(conn, &payment).await?;

    Ok(payment)
}

async fn delete_tx(
    conn: &mut SqliteConnection,
    payment_id: i64,
) -> BookingResult<(String, PaymentRemoval)> {
    let payment = fetch_payment(conn, payment_id).await?;
    let plan = ledger::removal_plan(&payment)?;

    if plan == PaymentRemoval::ReverseThenDelete {
        let mut reservation = fetch_reservation(conn, payment.reservation_id).await?;
        ledger::reverse_payment(&mut reservation, payment.amount())?;
        reservation.updated_at = now();
        ReservationRepository::update(conn, &reservation).await?;
    }

    PaymentRepository::delete(conn, payment.id).await?;
    Ok((payment.payment_code, plan))
}
