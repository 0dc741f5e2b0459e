//! # Invoice Ledger
//!
//! Fiscal invoices: numbering, line items, totals and the invoice lifecycle.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  DRAFT ──(issue: ≥1 item)──► ISSUED ──(payments: balance ≤ 0)──► PAID   │
//! │    │  add/remove items         │                                  │     │
//! │    │  delete                   │                                  │     │
//! │    ├──(cancel: nothing paid)───┴──► CANCELLED                     │     │
//! │    │                                                              │     │
//! │    └──────────────(void: from anything but VOID)──────────────────┴──► VOID
//! │                                                                         │
//! │  Generated from a reservation with payments included, an invoice may    │
//! │  go straight from DRAFT to PAID.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Totals
//! `subtotal = Σ item.subtotal`, `tax = round(subtotal × rate)`,
//! `total = subtotal + tax`, `balance = total - paid`. Unlike a
//! reservation the invoice balance is not clamped: an overpaid invoice shows
//! a negative balance.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    Currency, DocumentType, Guest, Invoice, InvoiceItem, InvoiceStatus, Payment, PaymentStatus,
    Reservation, Room, RoomType, TaxRate,
};
use crate::validation::{validate_amount, validate_quantity, validate_text, validate_unit_price};

/// Maximum length of an item description.
const MAX_DESCRIPTION_LEN: usize = 500;

// =============================================================================
// Requests
// =============================================================================

/// Fiscal identity printed on the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub document_type: DocumentType,
    pub document_number: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl CustomerDetails {
    /// Uses the guest's own identity document and contact data.
    pub fn from_guest(guest: &Guest) -> Self {
        CustomerDetails {
            document_type: guest.document_type,
            document_number: guest.document_number.clone(),
            name: guest.full_name(),
            address: guest.address.clone(),
            phone: guest.phone.clone(),
            email: guest.email.clone(),
        }
    }
}

/// A line to add to an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoiceItem {
    pub description: String,
    pub quantity: i64,
    pub unit_price: Money,
}

/// Request for an ad hoc invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoice {
    pub guest_id: i64,
    pub reservation_id: Option<i64>,
    /// Falls back to the guest's own details when absent.
    pub customer: Option<CustomerDetails>,
    pub currency: Currency,
    /// Falls back to the configured tax rate when absent.
    pub tax_rate: Option<TaxRate>,
    pub items: Vec<NewInvoiceItem>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

// =============================================================================
// Numbering
// =============================================================================

/// The per-day part of an invoice number: `FAC-20250301-`.
pub fn number_prefix(prefix: &str, date: NaiveDate) -> String {
    format!("{}-{}-", prefix, date.format("%Y%m%d"))
}

/// Formats a full invoice number.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use hotel_core::invoice::format_number;
///
/// let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
/// assert_eq!(format_number("FAC", date, 7), "FAC-20250301-0007");
/// ```
pub fn format_number(prefix: &str, date: NaiveDate, sequence: u32) -> String {
    format!("{}{:04}", number_prefix(prefix, date), sequence)
}

/// Next daily sequence given the highest number already used today.
pub fn next_sequence(last_today: Option<&str>) -> u32 {
    last_today
        .and_then(|number| number.rsplit('-').next())
        .and_then(|seq| seq.parse::<u32>().ok())
        .map_or(1, |seq| seq + 1)
}

// =============================================================================
// Construction
// =============================================================================

/// Validates a line and computes its subtotal.
pub fn line_item(invoice_id: i64, item: &NewInvoiceItem) -> CoreResult<InvoiceItem> {
    validate_text("description", &item.description, MAX_DESCRIPTION_LEN)?;
    validate_quantity(item.quantity)?;
    validate_unit_price(item.unit_price)?;

    Ok(InvoiceItem {
        id: 0,
        invoice_id,
        description: item.description.trim().to_string(),
        quantity: item.quantity,
        unit_price_cents: item.unit_price.cents(),
        subtotal_cents: item.unit_price.multiply_quantity(item.quantity).cents(),
    })
}

/// Builds an empty DRAFT invoice header.
#[allow(clippy::too_many_arguments)]
pub fn draft(
    invoice_number: String,
    guest_id: i64,
    reservation_id: Option<i64>,
    customer: CustomerDetails,
    currency: Currency,
    tax_rate: TaxRate,
    due_date: Option<NaiveDate>,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Invoice {
    Invoice {
        id: 0,
        invoice_number,
        reservation_id,
        guest_id,
        document_type: customer.document_type,
        document_number: customer.document_number,
        customer_name: customer.name,
        customer_address: customer.address,
        customer_phone: customer.phone,
        customer_email: customer.email,
        currency,
        subtotal_cents: 0,
        tax_rate_bps: tax_rate.bps(),
        tax_cents: 0,
        total_cents: 0,
        paid_cents: 0,
        balance_cents: 0,
        status: InvoiceStatus::Draft,
        issue_date: None,
        due_date,
        notes,
        created_at: now,
        updated_at: now,
    }
}

/// The single lodging line of a reservation invoice.
///
/// ```text
/// Lodging - Standard (Room 101) - 3 night(s) (2025-03-01 to 2025-03-04)
///   qty 3 × 40.00 = 120.00
/// ```
pub fn lodging_item(reservation: &Reservation, room: &Room, room_type: &RoomType) -> NewInvoiceItem {
    NewInvoiceItem {
        description: format!(
            "Lodging - {} (Room {}) - {} night(s) ({} to {})",
            room_type.name,
            room.room_number,
            reservation.total_nights,
            reservation.check_in_date,
            reservation.check_out_date
        ),
        quantity: reservation.total_nights,
        unit_price: reservation.price_per_night(),
    }
}

/// Sum of completed payments in the invoice currency.
pub fn settled_amount(payments: &[Payment], currency: Currency) -> Money {
    payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Completed && p.currency == currency)
        .map(Payment::amount)
        .sum()
}

// =============================================================================
// Lifecycle
// =============================================================================

impl Invoice {
    /// Recomputes subtotal, tax, total and balance from the items.
    pub fn calculate_totals(&mut self, items: &[InvoiceItem]) {
        let subtotal: Money = items.iter().map(InvoiceItem::subtotal).sum();
        let tax = subtotal.calculate_tax(self.tax_rate());
        let total = subtotal + tax;

        self.subtotal_cents = subtotal.cents();
        self.tax_cents = tax.cents();
        self.total_cents = total.cents();
        self.balance_cents = (total - self.paid()).cents();
    }

    /// Items and header fields may only change while DRAFT.
    pub fn ensure_draft(&self) -> CoreResult<()> {
        if self.status != InvoiceStatus::Draft {
            return Err(CoreError::NotDraft {
                number: self.invoice_number.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> CoreError {
        CoreError::InvalidState {
            number: self.invoice_number.clone(),
            status: self.status,
            action,
        }
    }

    /// DRAFT → ISSUED. Requires at least one item.
    pub fn issue(&mut self, item_count: usize, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_draft()?;
        if item_count == 0 {
            return Err(CoreError::Empty(self.invoice_number.clone()));
        }
        self.status = InvoiceStatus::Issued;
        self.issue_date = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Any status but VOID → VOID.
    pub fn void(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if self.status == InvoiceStatus::Void {
            return Err(self.invalid("void"));
        }
        self.status = InvoiceStatus::Void;
        self.updated_at = now;
        Ok(())
    }

    /// DRAFT / ISSUED with nothing paid → CANCELLED.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        let cancellable = matches!(self.status, InvoiceStatus::Draft | InvoiceStatus::Issued);
        if !cancellable || self.paid_cents != 0 {
            return Err(self.invalid("cancel"));
        }
        self.status = InvoiceStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    /// Only drafts may be deleted.
    pub fn ensure_deletable(&self) -> CoreResult<()> {
        self.ensure_draft()
    }

    /// Records money received against the invoice; PAID once the balance
    /// reaches zero.
    ///
    /// ## Errors
    /// - `InvalidState` on DRAFT, VOID or CANCELLED invoices
    /// - `Validation` for a non-positive amount
    pub fn register_payment(&mut self, amount: Money, now: DateTime<Utc>) -> CoreResult<()> {
        if matches!(
            self.status,
            InvoiceStatus::Draft | InvoiceStatus::Void | InvoiceStatus::Cancelled
        ) {
            return Err(self.invalid("register a payment"));
        }
        validate_amount("amount", amount)?;

        self.paid_cents += amount.cents();
        self.balance_cents = (self.total() - self.paid()).cents();
        self.mark_paid_if_settled(now);
        self.updated_at = now;
        Ok(())
    }

    /// Imports money already received (e.g. reservation payments) into a
    /// freshly built invoice.
    pub fn import_paid(&mut self, paid: Money, now: DateTime<Utc>) {
        self.paid_cents = paid.cents();
        self.balance_cents = (self.total() - self.paid()).cents();
        self.mark_paid_if_settled(now);
    }

    fn mark_paid_if_settled(&mut self, now: DateTime<Utc>) {
        if self.total_cents > 0 && self.balance_cents <= 0 {
            self.status = InvoiceStatus::Paid;
            if self.issue_date.is_none() {
                self.issue_date = Some(now);
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reservation::tests::sample_reservation;
    use crate::types::{PaymentMethod, RoomStatus};

    fn customer() -> CustomerDetails {
        CustomerDetails {
            document_type: DocumentType::National,
            document_number: "12345678".into(),
            name: "Ana Pérez".into(),
            address: None,
            phone: None,
            email: None,
        }
    }

    fn empty_invoice() -> Invoice {
        draft(
            "FAC-20250301-0001".into(),
            1,
            None,
            customer(),
            Currency::Usd,
            TaxRate::from_bps(1600),
            None,
            None,
            Utc::now(),
        )
    }

    fn item(qty: i64, cents: i64) -> InvoiceItem {
        line_item(
            1,
            &NewInvoiceItem {
                description: "Minibar".into(),
                quantity: qty,
                unit_price: Money::from_cents(cents),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_numbering() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(number_prefix("FAC", date), "FAC-20250301-");
        assert_eq!(next_sequence(None), 1);
        assert_eq!(next_sequence(Some("FAC-20250301-0041")), 42);
        assert_eq!(format_number("FAC", date, next_sequence(Some("FAC-20250301-0041"))), "FAC-20250301-0042");
    }

    #[test]
    fn test_line_item_subtotal() {
        let line = item(3, 4_000);
        assert_eq!(line.subtotal_cents, 12_000);
    }

    #[test]
    fn test_line_item_validation() {
        let bad = NewInvoiceItem {
            description: "  ".into(),
            quantity: 1,
            unit_price: Money::from_cents(100),
        };
        assert!(line_item(1, &bad).is_err());

        let bad = NewInvoiceItem {
            description: "Laundry".into(),
            quantity: 0,
            unit_price: Money::from_cents(100),
        };
        assert!(line_item(1, &bad).is_err());
    }

    #[test]
    fn test_calculate_totals() {
        let mut invoice = empty_invoice();
        invoice.calculate_totals(&[item(3, 4_000), item(1, 500)]);
        assert_eq!(invoice.subtotal_cents, 12_500);
        assert_eq!(invoice.tax_cents, 2_000);
        assert_eq!(invoice.total_cents, 14_500);
        assert_eq!(invoice.balance_cents, 14_500);
    }

    #[test]
    fn test_issue_requires_items_and_draft() {
        let mut invoice = empty_invoice();
        assert!(matches!(invoice.issue(0, Utc::now()), Err(CoreError::Empty(_))));

        invoice.issue(1, Utc::now()).unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Issued);
        assert!(invoice.issue_date.is_some());

        assert!(matches!(invoice.issue(1, Utc::now()), Err(CoreError::NotDraft { .. })));
    }

    #[test]
    fn test_payment_rules() {
        let mut invoice = empty_invoice();
        invoice.calculate_totals(&[item(1, 10_000)]);

        assert!(matches!(
            invoice.register_payment(Money::from_cents(100), Utc::now()),
            Err(CoreError::InvalidState { .. })
        ));

        invoice.issue(1, Utc::now()).unwrap();
        invoice.register_payment(Money::from_cents(6_000), Utc::now()).unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Issued);
        assert_eq!(invoice.balance_cents, 5_600);

        invoice.register_payment(Money::from_cents(5_600), Utc::now()).unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.balance_cents, 0);
    }

    #[test]
    fn test_void_rules() {
        let mut invoice = empty_invoice();
        invoice.void(Utc::now()).unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Void);
        assert!(invoice.void(Utc::now()).is_err());
        assert!(invoice
            .register_payment(Money::from_cents(1), Utc::now())
            .is_err());
    }

    #[test]
    fn test_cancel_requires_nothing_paid() {
        let mut invoice = empty_invoice();
        invoice.calculate_totals(&[item(1, 10_000)]);
        invoice.issue(1, Utc::now()).unwrap();
        invoice.register_payment(Money::from_cents(100), Utc::now()).unwrap();
        assert!(invoice.cancel(Utc::now()).is_err());

        let mut fresh = empty_invoice();
        fresh.cancel(Utc::now()).unwrap();
        assert_eq!(fresh.status, InvoiceStatus::Cancelled);
    }

    #[test]
    fn test_lodging_item_from_reservation() {
        let reservation = sample_reservation();
        let room = Room {
            id: 101,
            room_number: "101".into(),
            floor: 1,
            room_type_id: 1,
            status: RoomStatus::Available,
            notes: None,
            is_active: true,
        };
        let room_type = RoomType::new("Standard", 2, 150_000, 4_000, None);

        let line = lodging_item(&reservation, &room, &room_type);
        assert_eq!(line.quantity, 3);
        assert_eq!(line.unit_price.cents(), 4_000);
        assert_eq!(
            line.description,
            "Lodging - Standard (Room 101) - 3 night(s) (2025-03-01 to 2025-03-04)"
        );
    }

    #[test]
    fn test_settled_amount_filters_status_and_currency() {
        let now = Utc::now();
        let payment = |cents, currency, status| Payment {
            id: 0,
            payment_code: "PAY-0000000000".into(),
            reservation_id: 1,
            amount_cents: cents,
            currency,
            method: PaymentMethod::Transfer,
            status,
            reference_number: None,
            bank_name: None,
            notes: None,
            payment_date: now,
            refunded_at: None,
            created_at: now,
        };
        let payments = vec![
            payment(10_000, Currency::Usd, PaymentStatus::Completed),
            payment(3_920, Currency::Usd, PaymentStatus::Completed),
            payment(500, Currency::Usd, PaymentStatus::Refunded),
            payment(700, Currency::Eur, PaymentStatus::Completed),
        ];
        assert_eq!(settled_amount(&payments, Currency::Usd).cents(), 13_920);
    }

    #[test]
    fn test_import_paid_marks_paid() {
        let mut invoice = empty_invoice();
        invoice.calculate_totals(&[item(3, 4_000)]);
        invoice.import_paid(Money::from_cents(13_920), Utc::now());
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.balance_cents, 0);
        assert!(invoice.issue_date.is_some());
    }
}
