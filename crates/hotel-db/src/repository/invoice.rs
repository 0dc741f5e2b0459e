//! # Invoice Repository
//!
//! Invoice headers and their line items.
//!
//! Items are deleted with their invoice (`ON DELETE CASCADE`). Invoice
//! numbers are allocated by the booking engine from
//! [`InvoiceRepository::last_number_with_prefix`] while it holds the
//! numbering lock, and the UNIQUE index backs that up.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use hotel_core::{Invoice, InvoiceItem, InvoiceWithItems};

/// Repository for invoice operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Gets an invoice with its items.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<InvoiceWithItems>> {
        let mut conn = self.pool.acquire().await?;

        let Some(invoice) = Self::find(&mut conn, id).await? else {
            return Ok(None);
        };
        let items = Self::find_items(&mut conn, id).await?;

        Ok(Some(InvoiceWithItems { invoice, items }))
    }

    pub async fn list_for_reservation(&self, reservation_id: i64) -> DbResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE reservation_id = ?1 ORDER BY invoice_number",
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    // -------------------------------------------------------------------------
    // Header
    // -------------------------------------------------------------------------

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(invoice)
    }

    /// Highest invoice number starting with `prefix`, e.g. `FAC-20250301-`.
    ///
    /// The sequence is zero-padded, so lexical order is numeric order.
    pub async fn last_number_with_prefix(
        conn: &mut SqliteConnection,
        prefix: &str,
    ) -> DbResult<Option<String>> {
        let number: Option<String> = sqlx::query_scalar(
            r#"
            SELECT invoice_number FROM invoices
            WHERE invoice_number LIKE ?1 || '%'
            ORDER BY invoice_number DESC
            LIMIT 1
            "#,
        )
        .bind(prefix)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(number)
    }

    pub async fn insert(conn: &mut SqliteConnection, inv: &Invoice) -> DbResult<i64> {
        debug!(number = %inv.invoice_number, "Inserting invoice");

        let result = sqlx::query(
            r#"
            INSERT INTO invoices (
                invoice_number, reservation_id, guest_id,
                document_type, document_number, customer_name,
                customer_address, customer_phone, customer_email,
                currency, subtotal_cents, tax_rate_bps, tax_cents, total_cents,
                paid_cents, balance_cents, status, issue_date, due_date, notes,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22
            )
            "#,
        )
        .bind(&inv.invoice_number)
        .bind(inv.reservation_id)
        .bind(inv.guest_id)
        .bind(inv.document_type)
        .bind(&inv.document_number)
        .bind(&inv.customer_name)
        .bind(&inv.customer_address)
        .bind(&inv.customer_phone)
        .bind(&inv.customer_email)
        .bind(inv.currency)
        .bind(inv.subtotal_cents)
        .bind(inv.tax_rate_bps)
        .bind(inv.tax_cents)
        .bind(inv.total_cents)
        .bind(inv.paid_cents)
        .bind(inv.balance_cents)
        .bind(inv.status)
        .bind(inv.issue_date)
        .bind(inv.due_date)
        .bind(&inv.notes)
        .bind(inv.created_at)
        .bind(inv.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, &inv.invoice_number)
            }
            other => other,
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Writes totals, status and dates back to the header row.
    pub async fn update(conn: &mut SqliteConnection, inv: &Invoice) -> DbResult<()> {
        debug!(number = %inv.invoice_number, status = ?inv.status, "Updating invoice");

        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                subtotal_cents = ?2,
                tax_cents = ?3,
                total_cents = ?4,
                paid_cents = ?5,
                balance_cents = ?6,
                status = ?7,
                issue_date = ?8,
                due_date = ?9,
                notes = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(inv.id)
        .bind(inv.subtotal_cents)
        .bind(inv.tax_cents)
        .bind(inv.total_cents)
        .bind(inv.paid_cents)
        .bind(inv.balance_cents)
        .bind(inv.status)
        .bind(inv.issue_date)
        .bind(inv.due_date)
        .bind(&inv.notes)
        .bind(inv.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", inv.id));
        }

        Ok(())
    }

    /// Deletes an invoice and, by cascade, its items.
    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id));
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------------

    pub async fn find_items(
        conn: &mut SqliteConnection,
        invoice_id: i64,
    ) -> DbResult<Vec<InvoiceItem>> {
        let items = sqlx::query_as::<_, InvoiceItem>(
            "SELECT * FROM invoice_items WHERE invoice_id = ?1 ORDER BY id",
        )
        .bind(invoice_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    pub async fn insert_item(conn: &mut SqliteConnection, item: &InvoiceItem) -> DbResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO invoice_items (
                invoice_id, description, quantity, unit_price_cents, subtotal_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(item.invoice_id)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.subtotal_cents)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Deletes one item of `invoice_id`. Returns `false` if no such item.
    pub async fn delete_item(
        conn: &mut SqliteConnection,
        invoice_id: i64,
        item_id: i64,
    ) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM invoice_items WHERE id = ?1 AND invoice_id = ?2")
            .bind(item_id)
            .bind(invoice_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
