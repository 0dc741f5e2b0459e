//! # Payment Ledger
//!
//! Arithmetic and guards that keep a reservation's money fields coherent.
//!
//! ## Ledger Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  paid    = Σ amount of COMPLETED payments                               │
//! │  balance = max(0, total - paid)                                         │
//! │  is_paid = (balance == 0)                                               │
//! │                                                                         │
//! │  record:  amount ≤ balance ──► paid += amount ──► settle                │
//! │  refund:  COMPLETED only   ──► paid -= amount ──► settle                │
//! │  delete:  COMPLETED        ──► same reversal as refund, then remove     │
//! │           PENDING / FAILED ──► remove (no ledger effect)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every write to `paid_cents` goes through [`apply_payment`] or
//! [`reverse_payment`], and both finish with [`settle`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Currency, Payment, PaymentMethod, PaymentStatus, Reservation};
use crate::validation::validate_amount;

// =============================================================================
// Requests
// =============================================================================

/// A payment to record against a reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Money,
    pub currency: Currency,
    pub method: PaymentMethod,
    pub reference_number: Option<String>,
    pub bank_name: Option<String>,
    pub notes: Option<String>,
    /// When the money changed hands; defaults to now.
    pub payment_date: Option<DateTime<Utc>>,
}

/// Builds an unsaved payment row.
pub fn new_payment(
    reservation_id: i64,
    payment_code: String,
    request: &PaymentRequest,
    status: PaymentStatus,
    now: DateTime<Utc>,
) -> Payment {
    Payment {
        id: 0,
        payment_code,
        reservation_id,
        amount_cents: request.amount.cents(),
        currency: request.currency,
        method: request.method,
        status,
        reference_number: request.reference_number.clone(),
        bank_name: request.bank_name.clone(),
        notes: request.notes.clone(),
        payment_date: request.payment_date.unwrap_or(now),
        refunded_at: None,
        created_at: now,
    }
}

// =============================================================================
// Reservation Side
// =============================================================================

/// Re-derives `balance` and `is_paid` from `total` and `paid`.
pub fn settle(reservation: &mut Reservation) {
    let balance = (reservation.total() - reservation.paid()).clamp_zero();
    reservation.balance_cents = balance.cents();
    reservation.is_paid = balance.is_zero();
}

/// Checks a reservation can take a payment of `amount` in `currency`.
///
/// ## Errors
/// - `Validation` when `amount <= 0`
/// - `ReservationClosed` for cancelled, checked-out or no-show reservations
/// - `CurrencyMismatch` when the payment is not in the reservation's currency
/// - `AmountExceedsBalance` when `amount > balance`
pub fn ensure_accepts_payment(
    reservation: &Reservation,
    amount: Money,
    currency: Currency,
) -> CoreResult<()> {
    validate_amount("amount", amount)?;
    reservation.ensure_modifiable()?;

    if currency != reservation.currency {
        return Err(CoreError::CurrencyMismatch {
            expected: reservation.currency,
            payment: currency,
        });
    }

    if amount > reservation.balance() {
        return Err(CoreError::AmountExceedsBalance {
            amount,
            balance: reservation.balance(),
        });
    }

    Ok(())
}

/// Adds a completed payment to the reservation's paid amount.
///
/// ## Example
/// ```rust
/// # use hotel_core::ledger::apply_payment;
/// # use hotel_core::money::Money;
/// # fn demo(reservation: &mut hotel_core::Reservation) -> hotel_core::CoreResult<()> {
/// apply_payment(reservation, Money::from_cents(13_920))?;
/// assert!(reservation.is_paid);
/// # Ok(())
/// # }
/// ```
pub fn apply_payment(reservation: &mut Reservation, amount: Money) -> CoreResult<()> {
    validate_amount("amount", amount)?;
    if amount > reservation.balance() {
        return Err(CoreError::AmountExceedsBalance {
            amount,
            balance: reservation.balance(),
        });
    }

    reservation.paid_cents += amount.cents();
    settle(reservation);
    Ok(())
}

/// Removes a previously completed payment from the paid amount.
pub fn reverse_payment(reservation: &mut Reservation, amount: Money) -> CoreResult<()> {
    if amount > reservation.paid() {
        return Err(CoreError::LedgerUnderflow {
            amount,
            paid: reservation.paid(),
        });
    }

    reservation.paid_cents -= amount.cents();
    settle(reservation);
    Ok(())
}

// =============================================================================
// Payment Side
// =============================================================================

/// Only completed payments can be refunded, and only once.
pub fn ensure_refundable(payment: &Payment) -> CoreResult<()> {
    match payment.status {
        PaymentStatus::Completed => Ok(()),
        PaymentStatus::Refunded => Err(CoreError::AlreadyRefunded(payment.payment_code.clone())),
        status => Err(CoreError::NotCompleted {
            code: payment.payment_code.clone(),
            status,
        }),
    }
}

/// Settling or failing a payment requires it to still be pending.
pub fn ensure_pending(payment: &Payment) -> CoreResult<()> {
    if payment.status != PaymentStatus::Pending {
        return Err(CoreError::PaymentNotPending {
            code: payment.payment_code.clone(),
            status: payment.status,
        });
    }
    Ok(())
}

/// Marks a completed payment refunded.
pub fn mark_refunded(payment: &mut Payment, now: DateTime<Utc>) -> CoreResult<()> {
    ensure_refundable(payment)?;
    payment.status = PaymentStatus::Refunded;
    payment.refunded_at = Some(now);
    Ok(())
}

/// What deleting a payment entails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentRemoval {
    /// PENDING / FAILED: never counted, delete the row.
    Discard,
    /// COMPLETED: reverse it like a refund first, then delete.
    ReverseThenDelete,
}

/// Decides how a payment may be deleted.
pub fn removal_plan(payment: &Payment) -> CoreResult<PaymentRemoval> {
    match payment.status {
        PaymentStatus::Pending | PaymentStatus::Failed => Ok(PaymentRemoval::Discard),
        PaymentStatus::Completed => Ok(PaymentRemoval::ReverseThenDelete),
        PaymentStatus::Refunded => Err(CoreError::PaymentNotDeletable {
            code: payment.payment_code.clone(),
            status: payment.status,
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reservation::tests::sample_reservation;
    use crate::types::ReservationStatus;

    fn assert_consistent(r: &Reservation) {
        assert_eq!(r.balance_cents, (r.total_cents - r.paid_cents).max(0));
        assert_eq!(r.is_paid, r.balance_cents == 0);
    }

    fn request(cents: i64) -> PaymentRequest {
        PaymentRequest {
            amount: Money::from_cents(cents),
            currency: Currency::Usd,
            method: PaymentMethod::CashUsd,
            reference_number: None,
            bank_name: None,
            notes: None,
            payment_date: None,
        }
    }

    #[test]
    fn test_partial_then_full_payment() {
        let mut r = sample_reservation();
        apply_payment(&mut r, Money::from_cents(5_000)).unwrap();
        assert_eq!(r.paid_cents, 5_000);
        assert_eq!(r.balance_cents, 8_920);
        assert!(!r.is_paid);
        assert_consistent(&r);

        apply_payment(&mut r, Money::from_cents(8_920)).unwrap();
        assert_eq!(r.balance_cents, 0);
        assert!(r.is_paid);
        assert_consistent(&r);
    }

    #[test]
    fn test_overpayment_rejected() {
        let mut r = sample_reservation();
        let err = apply_payment(&mut r, Money::from_cents(13_921)).unwrap_err();
        assert!(matches!(err, CoreError::AmountExceedsBalance { .. }));
        assert_eq!(r.paid_cents, 0);
    }

    #[test]
    fn test_reverse_restores_balance() {
        let mut r = sample_reservation();
        apply_payment(&mut r, Money::from_cents(13_920)).unwrap();
        reverse_payment(&mut r, Money::from_cents(3_920)).unwrap();
        assert_eq!(r.paid_cents, 10_000);
        assert_eq!(r.balance_cents, 3_920);
        assert!(!r.is_paid);
        assert_consistent(&r);
    }

    #[test]
    fn test_reverse_underflow() {
        let mut r = sample_reservation();
        assert!(matches!(
            reverse_payment(&mut r, Money::from_cents(1)),
            Err(CoreError::LedgerUnderflow { .. })
        ));
    }

    #[test]
    fn test_closed_reservation_rejects_payment() {
        let mut r = sample_reservation();
        r.status = ReservationStatus::Cancelled;
        assert!(matches!(
            ensure_accepts_payment(&r, Money::from_cents(100), Currency::Usd),
            Err(CoreError::ReservationClosed { .. })
        ));
    }

    #[test]
    fn test_currency_mismatch_rejected() {
        let r = sample_reservation();
        assert!(matches!(
            ensure_accepts_payment(&r, Money::from_cents(100), Currency::Eur),
            Err(CoreError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let r = sample_reservation();
        assert!(matches!(
            ensure_accepts_payment(&r, Money::zero(), Currency::Usd),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_refund_rules() {
        let now = Utc::now();
        let mut p = new_payment(1, "PAY-0000000001".into(), &request(100), PaymentStatus::Completed, now);
        mark_refunded(&mut p, now).unwrap();
        assert_eq!(p.status, PaymentStatus::Refunded);
        assert!(p.refunded_at.is_some());

        assert!(matches!(
            mark_refunded(&mut p, now),
            Err(CoreError::AlreadyRefunded(_))
        ));

        let pending = new_payment(1, "PAY-0000000002".into(), &request(100), PaymentStatus::Pending, now);
        assert!(matches!(
            ensure_refundable(&pending),
            Err(CoreError::NotCompleted { .. })
        ));
    }

    #[test]
    fn test_removal_plan() {
        let now = Utc::now();
        let mut p = new_payment(1, "PAY-0000000001".into(), &request(100), PaymentStatus::Pending, now);
        assert_eq!(removal_plan(&p).unwrap(), PaymentRemoval::Discard);
        p.status = PaymentStatus::Failed;
        assert_eq!(removal_plan(&p).unwrap(), PaymentRemoval::Discard);
        p.status = PaymentStatus::Completed;
        assert_eq!(removal_plan(&p).unwrap(), PaymentRemoval::ReverseThenDelete);
        p.status = PaymentStatus::Refunded;
        assert!(removal_plan(&p).is_err());
    }

    #[test]
    fn test_payment_date_defaults_to_now() {
        let now = Utc::now();
        let p = new_payment(1, "PAY-0000000001".into(), &request(100), PaymentStatus::Completed, now);
        assert_eq!(p.payment_date, now);
    }
}
