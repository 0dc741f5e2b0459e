//! Invoice Ledger use-cases.
//!
//! ## Numbering
//! ```text
//! FAC-20250301-0001
//! │   │        └── daily sequence, last of the day + 1
//! │   └── creation date (UTC)
//! └── configurable prefix
//! ```
//! Allocation reads the highest number of the day and inserts the next one
//! while holding `invoice_numbering`, so two invoices created at once never
//! compute the same number.

use chrono::{Days, NaiveDate};
use sqlx::SqliteConnection;
use tracing::info;

use hotel_core::invoice::{
    self, format_number, lodging_item, next_sequence, number_prefix, settled_amount,
    CustomerDetails, NewInvoice, NewInvoiceItem,
};
use hotel_core::pricing::PricingConfig;
use hotel_core::validation::validate_text;
use hotel_core::{
    CoreError, CoreResult, Invoice, InvoiceItem, InvoiceWithItems, Money, ValidationError,
};
use hotel_db::repository::{InvoiceRepository, PaymentRepository};

use super::{
    fetch_guest, fetch_invoice, fetch_reservation, fetch_room, fetch_room_type, now, rejected,
    BookingEngine,
};
use crate::error::BookingResult;

const MAX_CUSTOMER_FIELD_LEN: usize = 200;

impl BookingEngine {
    /// Creates an ad hoc DRAFT invoice.
    ///
    /// Customer details default to the guest's own; the tax rate defaults to
    /// the configured one.
    pub async fn create_invoice(&self, request: NewInvoice) -> BookingResult<InvoiceWithItems> {
        let items = request
            .items
            .iter()
            .map(|item| invoice::line_item(0, item))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| rejected("create_invoice", e.into()))?;

        let _numbering = self.invoice_numbering.lock().await;

        let mut tx = self.begin_write().await?;
        let created = create_tx(&mut tx, request, items, &self.pricing, &self.invoicing.number_prefix)
            .await
            .map_err(|e| rejected("create_invoice", e))?;
        tx.commit().await?;

        info!(
            number = %created.invoice.invoice_number,
            items = created.items.len(),
            total = %created.invoice.currency.format(created.invoice.total()),
            "Invoice created"
        );
        Ok(created)
    }

    /// Bills a reservation: one lodging line at the reservation's nightly
    /// rate, currency and tax rate, due `invoicing.due_days` from today.
    ///
    /// With `include_payments`, completed payments in the reservation's
    /// currency are carried over; a fully paid stay yields a PAID invoice.
    pub async fn generate_invoice_from_reservation(
        &self,
        reservation_id: i64,
        include_payments: bool,
    ) -> BookingResult<InvoiceWithItems> {
        let _reservation = self.reservation_locks.lock(reservation_id).await;
        let _numbering = self.invoice_numbering.lock().await;

        let mut tx = self.begin_write().await?;
        let created = generate_tx(
            &mut tx,
            reservation_id,
            include_payments,
            &self.invoicing.number_prefix,
            self.invoicing.due_days,
        )
        .await
        .map_err(|e| rejected("generate_invoice_from_reservation", e))?;
        tx.commit().await?;

        info!(
            number = %created.invoice.invoice_number,
            reservation_id,
            total = %created.invoice.currency.format(created.invoice.total()),
            status = ?created.invoice.status,
            "Invoice generated from reservation"
        );
        Ok(created)
    }

    pub async fn get_invoice(&self, invoice_id: i64) -> BookingResult<InvoiceWithItems> {
        Ok(self
            .db
            .invoices()
            .get_by_id(invoice_id)
            .await?
            .ok_or(CoreError::InvoiceNotFound(invoice_id))?)
    }

    pub async fn list_invoices_for_reservation(
        &self,
        reservation_id: i64,
    ) -> BookingResult<Vec<Invoice>> {
        Ok(self.db.invoices().list_for_reservation(reservation_id).await?)
    }

    // =========================================================================
    // Items (DRAFT only)
    // =========================================================================

    pub async fn add_invoice_item(
        &self,
        invoice_id: i64,
        item: NewInvoiceItem,
    ) -> BookingResult<InvoiceWithItems> {
        let _invoice = self.invoice_locks.lock(invoice_id).await;

        let mut tx = self.begin_write().await?;
        let updated = add_item_tx(&mut tx, invoice_id, &item)
            .await
            .map_err(|e| rejected("add_invoice_item", e))?;
        tx.commit().await?;

        info!(number = %updated.invoice.invoice_number, items = updated.items.len(), "Invoice item added");
        Ok(updated)
    }

    pub async fn remove_invoice_item(
        &self,
        invoice_id: i64,
        item_id: i64,
    ) -> BookingResult<InvoiceWithItems> {
        let _invoice = self.invoice_locks.lock(invoice_id).await;

        let mut tx = self.begin_write().await?;
        let updated = remove_item_tx(&mut tx, invoice_id, item_id)
            .await
            .map_err(|e| rejected("remove_invoice_item", e))?;
        tx.commit().await?;

        info!(number = %updated.invoice.invoice_number, item_id, "Invoice item removed");
        Ok(updated)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// DRAFT → ISSUED. Requires at least one item.
    pub async fn issue_invoice(&self, invoice_id: i64) -> BookingResult<Invoice> {
        self.transition_invoice(invoice_id, "issue_invoice", |invoice, items| {
            invoice.issue(items.len(), now())
        })
        .await
    }

    /// Any status but VOID → VOID.
    pub async fn void_invoice(&self, invoice_id: i64) -> BookingResult<Invoice> {
        self.transition_invoice(invoice_id, "void_invoice", |invoice, _| invoice.void(now()))
            .await
    }

    /// DRAFT / ISSUED with nothing paid → CANCELLED.
    pub async fn cancel_invoice(&self, invoice_id: i64) -> BookingResult<Invoice> {
        self.transition_invoice(invoice_id, "cancel_invoice", |invoice, _| invoice.cancel(now()))
            .await
    }

    /// Records money received against an ISSUED invoice; PAID once the
    /// balance reaches zero.
    pub async fn register_invoice_payment(
        &self,
        invoice_id: i64,
        amount: Money,
    ) -> BookingResult<Invoice> {
        self.transition_invoice(invoice_id, "register_invoice_payment", |invoice, _| {
            invoice.register_payment(amount, now())
        })
        .await
    }

    /// Deletes a DRAFT invoice and its items.
    pub async fn delete_invoice(&self, invoice_id: i64) -> BookingResult<()> {
        let _invoice = self.invoice_locks.lock(invoice_id).await;

        let mut tx = self.begin_write().await?;
        let number = delete_tx(&mut tx, invoice_id)
            .await
            .map_err(|e| rejected("delete_invoice", e))?;
        tx.commit().await?;

        info!(number = %number, "Invoice deleted");
        Ok(())
    }

    /// Runs one header transition under the invoice lock.
    async fn transition_invoice<F>(
        &self,
        invoice_id: i64,
        action: &'static str,
        apply: F,
    ) -> BookingResult<Invoice>
    where
        F: FnOnce(&mut Invoice, &[InvoiceItem]) -> CoreResult<()>,
    {
        let _invoice = self.invoice_locks.lock(invoice_id).await;

        let mut tx = self.begin_write().await?;
        let invoice = transition_tx(&mut tx, invoice_id, apply)
            .await
            .map_err(|e| rejected(action, e))?;
        tx.commit().await?;

        info!(
            number = %invoice.invoice_number,
            status = ?invoice.status,
            balance = %invoice.currency.format(invoice.balance()),
            action,
            "Invoice updated"
        );
        Ok(invoice)
    }
}

// =============================================================================
// Transaction Bodies
// =============================================================================

/// Next free number for `date`. Caller holds `invoice_numbering`.
async fn allocate_number(
    conn: &mut SqliteConnection,
    prefix: &str,
    date: NaiveDate,
) -> BookingResult<String> {
    let today = number_prefix(prefix, date);
    let last = InvoiceRepository::last_number_with_prefix(conn, &today).await?;
    Ok(format_number(prefix, date, next_sequence(last.as_deref())))
}

fn validate_customer(customer: &CustomerDetails) -> BookingResult<()> {
    validate_text("document_number", &customer.document_number, 20)?;
    validate_text("customer_name", &customer.name, MAX_CUSTOMER_FIELD_LEN)?;
    if let Some(address) = &customer.address {
        validate_text("customer_address", address, MAX_CUSTOMER_FIELD_LEN)?;
    }
    Ok(())
}

/// Inserts `items` under `invoice` and brings the header totals in line.
async fn insert_items(
    conn: &mut SqliteConnection,
    invoice: &mut Invoice,
    mut items: Vec<InvoiceItem>,
) -> BookingResult<Vec<InvoiceItem>> {
    for item in &mut items {
        item.invoice_id = invoice.id;
        item.id = InvoiceRepository::insert_item(conn, item).await?;
    }
    invoice.calculate_totals(&items);
    Ok(items)
}

async fn create_tx(
    conn: &mut SqliteConnection,
    request: NewInvoice,
    items: Vec<InvoiceItem>,
    pricing: &PricingConfig,
    prefix: &str,
) -> BookingResult<InvoiceWithItems> {
    let guest = fetch_guest(conn, request.guest_id).await?;
    if let Some(reservation_id) = request.reservation_id {
        fetch_reservation(conn, reservation_id).await?;
    }

    let customer = match request.customer {
        Some(customer) => {
            validate_customer(&customer)?;
            customer
        }
        None => CustomerDetails::from_guest(&guest),
    };

    let tax_rate = request.tax_rate.unwrap_or(pricing.tax_rate);
    if tax_rate.bps() > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate_bps".to_string(),
            min: 0,
            max: 10_000,
        }
        .into());
    }

    let now = now();
    let number = allocate_number(conn, prefix, now.date_naive()).await?;

    let mut invoice = invoice::draft(
        number,
        guest.id,
        request.reservation_id,
        customer,
        request.currency,
        tax_rate,
        request.due_date,
        request.notes,
        now,
    );
    invoice.id = InvoiceRepository::insert(conn, &invoice).await?;

    let items = insert_items(conn, &mut invoice, items).await?;
    InvoiceRepository::update(conn, &invoice).await?;

    Ok(InvoiceWithItems { invoice, items })
}

async fn generate_tx(
    conn: &mut SqliteConnection,
    reservation_id: i64,
    include_payments: bool,
    prefix: &str,
    due_days: u32,
) -> BookingResult<InvoiceWithItems> {
    let reservation = fetch_reservation(conn, reservation_id).await?;
    let room = fetch_room(conn, reservation.room_id).await?;
    let room_type = fetch_room_type(conn, room.room_type_id).await?;
    let guest = fetch_guest(conn, reservation.guest_id).await?;

    let lodging = invoice::line_item(0, &lodging_item(&reservation, &room, &room_type))?;

    let now = now();
    let today = now.date_naive();
    let due_date = today.checked_add_days(Days::new(u64::from(due_days)));
    let number = allocate_number(conn, prefix, today).await?;

    let mut invoice = invoice::draft(
        number,
        guest.id,
        Some(reservation.id),
        CustomerDetails::from_guest(&guest),
        reservation.currency,
        reservation.tax_rate(),
        due_date,
        None,
        now,
    );
    invoice.id = InvoiceRepository::insert(conn, &invoice).await?;

    let items = insert_items(conn, &mut invoice, vec![lodging]).await?;

    if include_payments {
        let payments = PaymentRepository::find_for_reservation(conn, reservation.id).await?;
        let paid = settled_amount(&payments, reservation.currency);
        if paid.is_positive() {
            invoice.import_paid(paid, now);
        }
    }

    InvoiceRepository::update(conn, &invoice).await?;
    Ok(InvoiceWithItems { invoice, items })
}

async fn add_item_tx(
    conn: &mut SqliteConnection,
    invoice_id: i64,
    item: &NewInvoiceItem,
) -> BookingResult<InvoiceWithItems> {
    let invoice = fetch_invoice(conn, invoice_id).await?;
    invoice.ensure_draft()?;

    let mut line = invoice::line_item(invoice.id, item)?;
    line.id = InvoiceRepository::insert_item(conn, &line).await?;

    recalculate(conn, invoice).await
}

async fn remove_item_tx(
    conn: &mut SqliteConnection,
    invoice_id: i64,
    item_id: i64,
) -> BookingResult<InvoiceWithItems> {
    let invoice = fetch_invoice(conn, invoice_id).await?;
    invoice.ensure_draft()?;

    if !InvoiceRepository::delete_item(conn, invoice.id, item_id).await? {
        return Err(CoreError::InvoiceItemNotFound { invoice_id, item_id }.into());
    }

    recalculate(conn, invoice).await
}

/// Reloads the items and rewrites the header totals.
async fn recalculate(
    conn: &mut SqliteConnection,
    mut invoice: Invoice,
) -> BookingResult<InvoiceWithItems> {
    let items = InvoiceRepository::find_items(conn, invoice.id).await?;
    invoice.calculate_totals(&items);
    invoice.updated_at = now();
    InvoiceRepository::update(conn, &invoice).await?;

    Ok(InvoiceWithItems { invoice, items })
}

async fn transition_tx<F>(
    conn: &mut SqliteConnection,
    invoice_id: i64,
    apply: F,
) -> BookingResult<Invoice>
where
    F: FnOnce(&mut Invoice, &[InvoiceItem]) -> CoreResult<()>,
{
    let mut invoice = fetch_invoice(conn, invoice_id).await?;
    let items = InvoiceRepository::find_items(conn, invoice.id).await?;

    apply(&mut invoice, &items)?;
    InvoiceRepository::update(conn, &invoice).await?;

    Ok(invoice)
}

async fn delete_tx(conn: &mut SqliteConnection, invoice_id: i64) -> BookingResult<String> {
    let invoice = fetch_invoice(conn, invoice_id).await?;
    invoice.ensure_deletable()?;

    InvoiceRepository::delete(conn, invoice.id).await?;
    Ok(invoice.invoice_number)
}
